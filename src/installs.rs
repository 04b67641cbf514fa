//! Install request queue persisted as a JSON array.
//!
//! The bot only ever appends `pending` entries; a separate worker process
//! consumes the file and moves statuses forward. Re-reading the document on
//! every operation is what makes those out-of-process updates show up in
//! `/status` without any signalling between the two.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::catalog;
use crate::storage::{FileStorage, Storage};

/// Lifecycle of an install request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl InstallStatus {
    /// Pending and running requests are the ones `/status` reports on.
    pub fn is_active(self) -> bool {
        matches!(self, InstallStatus::Pending | InstallStatus::Running)
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallStatus::Pending => "PENDING",
            InstallStatus::Running => "RUNNING",
            InstallStatus::Success => "SUCCESS",
            InstallStatus::Failed => "FAILED",
        };
        write!(f, "{label}")
    }
}

/// One queued install. The OS name is denormalized in so the worker and the
/// reply formatting never have to consult the catalog again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub install_id: String,
    pub user_id: i64,
    pub username: String,
    pub ip: String,
    pub port: u16,
    pub os_id: String,
    pub os_name: String,
    pub status: InstallStatus,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds; only the worker moves this past `created_at`.
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// The requested os_id is not in the catalog.
    UnknownOs(String),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::UnknownOs(os_id) => write!(f, "unknown os_id '{os_id}'"),
        }
    }
}

impl std::error::Error for InstallError {}

/// Install queue store. Same discipline as the account store: load the full
/// document, change it, write it back, all under one lock.
pub struct InstallStore {
    storage: Mutex<Arc<dyn Storage>>,
}

impl InstallStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }

    /// File-backed store at `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(Arc::new(FileStorage::new(path)))
    }

    /// Validate the OS id against the catalog and append a pending request.
    /// Nothing is written when the id is unknown.
    pub async fn create(
        &self,
        user_id: i64,
        username: &str,
        ip: &str,
        port: u16,
        os_id: &str,
    ) -> Result<InstallRequest, InstallError> {
        let os = catalog::find(os_id).ok_or_else(|| InstallError::UnknownOs(os_id.to_string()))?;

        let storage = self.storage.lock().await;
        let mut installs = read_document(storage.as_ref());
        let now = chrono::Utc::now().timestamp();

        let request = InstallRequest {
            install_id: next_install_id(&installs, user_id, now),
            user_id,
            username: username.to_string(),
            ip: ip.to_string(),
            port,
            os_id: os.id.to_string(),
            os_name: os.name.to_string(),
            status: InstallStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        installs.push(request.clone());
        write_document(storage.as_ref(), &installs);
        info!(
            "Queued install {} ({} on {}:{})",
            request.install_id, request.os_name, request.ip, request.port
        );
        Ok(request)
    }

    /// The user's pending and running requests, in file order.
    pub async fn list_active(&self, user_id: i64) -> Vec<InstallRequest> {
        let storage = self.storage.lock().await;
        read_document(storage.as_ref())
            .into_iter()
            .filter(|install| install.user_id == user_id && install.status.is_active())
            .collect()
    }

    /// Every request the user ever filed, most recent first. Requests from
    /// the same second keep their insertion order.
    pub async fn list_all(&self, user_id: i64) -> Vec<InstallRequest> {
        let storage = self.storage.lock().await;
        let mut installs: Vec<InstallRequest> = read_document(storage.as_ref())
            .into_iter()
            .filter(|install| install.user_id == user_id)
            .collect();
        installs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        installs
    }
}

/// Ids are derived from the current second and the user id; a numeric
/// suffix keeps rapid repeated requests distinct.
fn next_install_id(installs: &[InstallRequest], user_id: i64, now: i64) -> String {
    let base = format!("INST-{now}-{user_id}");
    if !installs.iter().any(|install| install.install_id == base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !installs.iter().any(|install| install.install_id == candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn read_document(storage: &dyn Storage) -> Vec<InstallRequest> {
    match storage.load() {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(installs) => installs,
            Err(e) => {
                warn!("Failed to parse install queue, starting empty: {e}");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Failed to read install queue, starting empty: {e}");
            Vec::new()
        }
    }
}

fn write_document(storage: &dyn Storage, installs: &[InstallRequest]) {
    match serde_json::to_string_pretty(installs) {
        Ok(json) => {
            if let Err(e) = storage.save(&json) {
                error!("Failed to save install queue: {e}");
            }
        }
        Err(e) => error!("Failed to serialize install queue: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn memory_store() -> (InstallStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (InstallStore::new(storage.clone()), storage)
    }

    fn request(install_id: &str, user_id: i64, status: InstallStatus, created_at: i64) -> InstallRequest {
        InstallRequest {
            install_id: install_id.to_string(),
            user_id,
            username: "alice".to_string(),
            ip: "10.0.0.5".to_string(),
            port: 3389,
            os_id: "win-10-pro".to_string(),
            os_name: "Windows 10 Pro".to_string(),
            status,
            created_at,
            updated_at: created_at,
        }
    }

    fn seed(storage: &MemoryStorage, installs: &[InstallRequest]) {
        storage
            .save(&serde_json::to_string_pretty(installs).unwrap())
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_appends_pending_request() {
        let (store, _) = memory_store();

        let created = store
            .create(1001, "alice", "10.0.0.5", 3389, "win-10-pro")
            .await
            .unwrap();
        assert_eq!(created.status, InstallStatus::Pending);
        assert_eq!(created.os_name, "Windows 10 Pro");
        assert_eq!(created.created_at, created.updated_at);
        assert!(created.install_id.starts_with("INST-"));

        assert_eq!(store.list_active(1001).await, vec![created.clone()]);
        assert_eq!(store.list_all(1001).await, vec![created]);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_os() {
        let (store, storage) = memory_store();

        let result = store.create(1001, "alice", "10.0.0.5", 3389, "debian-12").await;
        assert_eq!(result, Err(InstallError::UnknownOs("debian-12".to_string())));

        // Nothing was written.
        assert!(storage.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_back_to_back_creates_get_distinct_ids() {
        let (store, _) = memory_store();

        let first = store
            .create(1001, "alice", "10.0.0.5", 3389, "win-10-pro")
            .await
            .unwrap();
        let second = store
            .create(1001, "alice", "10.0.0.5", 3389, "win-11-pro")
            .await
            .unwrap();
        assert_ne!(first.install_id, second.install_id);
        assert_eq!(store.list_all(1001).await.len(), 2);
    }

    #[test]
    fn test_next_install_id_suffixes_on_collision() {
        let mut installs = Vec::new();
        assert_eq!(next_install_id(&installs, 1001, 1700000000), "INST-1700000000-1001");

        installs.push(request("INST-1700000000-1001", 1001, InstallStatus::Pending, 1700000000));
        assert_eq!(
            next_install_id(&installs, 1001, 1700000000),
            "INST-1700000000-1001-2"
        );

        installs.push(request("INST-1700000000-1001-2", 1001, InstallStatus::Pending, 1700000000));
        assert_eq!(
            next_install_id(&installs, 1001, 1700000000),
            "INST-1700000000-1001-3"
        );
    }

    #[tokio::test]
    async fn test_list_active_filters_status_and_user() {
        let (store, storage) = memory_store();
        seed(
            &storage,
            &[
                request("INST-100-1001", 1001, InstallStatus::Pending, 100),
                request("INST-200-1001", 1001, InstallStatus::Running, 200),
                request("INST-300-1001", 1001, InstallStatus::Success, 300),
                request("INST-400-1001", 1001, InstallStatus::Failed, 400),
                request("INST-500-2002", 2002, InstallStatus::Pending, 500),
            ],
        );

        let active = store.list_active(1001).await;
        let ids: Vec<&str> = active.iter().map(|i| i.install_id.as_str()).collect();
        assert_eq!(ids, vec!["INST-100-1001", "INST-200-1001"]);
    }

    #[tokio::test]
    async fn test_list_all_sorts_most_recent_first() {
        let (store, storage) = memory_store();
        seed(
            &storage,
            &[
                request("INST-100-1001", 1001, InstallStatus::Success, 100),
                request("INST-300-1001", 1001, InstallStatus::Pending, 300),
                request("INST-200-1001", 1001, InstallStatus::Failed, 200),
                request("INST-300-1001-2", 1001, InstallStatus::Pending, 300),
            ],
        );

        let all = store.list_all(1001).await;
        let ids: Vec<&str> = all.iter().map(|i| i.install_id.as_str()).collect();
        // Ties on created_at stay in file order.
        assert_eq!(
            ids,
            vec!["INST-300-1001", "INST-300-1001-2", "INST-200-1001", "INST-100-1001"]
        );
    }

    #[tokio::test]
    async fn test_worker_status_updates_are_visible() {
        let (store, storage) = memory_store();
        let created = store
            .create(1001, "alice", "10.0.0.5", 3389, "win-10-pro")
            .await
            .unwrap();
        assert_eq!(store.list_active(1001).await.len(), 1);

        // Simulate the worker finishing the job between two chat events.
        let mut finished = created.clone();
        finished.status = InstallStatus::Success;
        finished.updated_at = created.created_at + 60;
        seed(&storage, &[finished.clone()]);

        assert!(store.list_active(1001).await.is_empty());
        assert_eq!(store.list_all(1001).await, vec![finished]);
    }

    #[tokio::test]
    async fn test_corrupt_document_falls_back_to_empty() {
        let (store, storage) = memory_store();
        storage.save("[ not json").unwrap();

        assert!(store.list_all(1001).await.is_empty());

        // Next create replaces the garbage with a fresh array.
        store
            .create(1001, "alice", "10.0.0.5", 3389, "win-10-pro")
            .await
            .unwrap();
        assert_eq!(store.list_all(1001).await.len(), 1);
    }

    #[tokio::test]
    async fn test_document_shape_matches_worker_contract() {
        let (store, storage) = memory_store();
        store
            .create(1001, "alice", "10.0.0.5", 3389, "win-serv-2022")
            .await
            .unwrap();

        let raw = storage.load().unwrap().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();

        let entry = &doc.as_array().unwrap()[0];
        assert_eq!(entry["user_id"], 1001);
        assert_eq!(entry["username"], "alice");
        assert_eq!(entry["ip"], "10.0.0.5");
        assert_eq!(entry["port"], 3389);
        assert_eq!(entry["os_id"], "win-serv-2022");
        assert_eq!(entry["os_name"], "Windows Server 2022");
        assert_eq!(entry["status"], "pending");
        assert!(entry["created_at"].is_i64());
        assert!(entry["updated_at"].is_i64());
    }
}
