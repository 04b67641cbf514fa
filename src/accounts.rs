//! Account registry persisted as a JSON object keyed by stringified user id.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::storage::{FileStorage, Storage};

/// A registered account. The on-disk document maps stringified platform
/// user ids to these records; fields are written once at registration and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    /// Unix seconds.
    pub created_at: i64,
}

/// Result of a `/login` attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// No account existed for this id; one was created.
    Registered { username: String },
    /// Account existed and the password matched. Carries the stored
    /// username, which does not change after registration.
    LoggedIn { username: String },
    /// Account existed but the password did not match.
    WrongPassword,
    /// The requested username already belongs to a different id.
    UsernameTaken,
}

/// Unsalted SHA-256 hex digest. This is the digest format the queue worker
/// expects to find in `users.json`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Account store. Every operation re-reads the whole document, mutates it,
/// and rewrites it in full; the mutex serializes racing chat events so two
/// updates cannot lose each other in-process.
pub struct AccountStore {
    storage: Mutex<Arc<dyn Storage>>,
}

impl AccountStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage: Mutex::new(storage),
        }
    }

    /// File-backed store at `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(Arc::new(FileStorage::new(path)))
    }

    /// Register a new account, or check the password of an existing one.
    ///
    /// Usernames are unique across ids (linear scan at write time). An
    /// existing record is never rewritten here, whatever username or
    /// password the caller supplied.
    pub async fn register_or_authenticate(
        &self,
        user_id: i64,
        username: &str,
        password: &str,
    ) -> LoginOutcome {
        let password_hash = hash_password(password);
        let storage = self.storage.lock().await;
        let mut accounts = read_document(storage.as_ref());

        let key = user_id.to_string();

        if accounts
            .iter()
            .any(|(id, account)| account.username == username && *id != key)
        {
            return LoginOutcome::UsernameTaken;
        }

        match accounts.get(&key) {
            Some(existing) => {
                if existing.password_hash == password_hash {
                    LoginOutcome::LoggedIn {
                        username: existing.username.clone(),
                    }
                } else {
                    LoginOutcome::WrongPassword
                }
            }
            None => {
                accounts.insert(
                    key,
                    Account {
                        username: username.to_string(),
                        password_hash,
                        created_at: chrono::Utc::now().timestamp(),
                    },
                );
                write_document(storage.as_ref(), &accounts);
                info!("Registered account '{}' for user {}", username, user_id);
                LoginOutcome::Registered {
                    username: username.to_string(),
                }
            }
        }
    }

    /// Fetch the account for `user_id`, if registered.
    pub async fn get(&self, user_id: i64) -> Option<Account> {
        let storage = self.storage.lock().await;
        read_document(storage.as_ref())
            .get(&user_id.to_string())
            .cloned()
    }

    /// Remove the account for `user_id`. Returns whether one existed.
    pub async fn delete(&self, user_id: i64) -> bool {
        let storage = self.storage.lock().await;
        let mut accounts = read_document(storage.as_ref());
        let removed = accounts.remove(&user_id.to_string()).is_some();
        if removed {
            write_document(storage.as_ref(), &accounts);
            info!("Deleted account for user {}", user_id);
        }
        removed
    }
}

fn read_document(storage: &dyn Storage) -> BTreeMap<String, Account> {
    match storage.load() {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("Failed to parse account store, starting empty: {e}");
                BTreeMap::new()
            }
        },
        Ok(None) => BTreeMap::new(),
        Err(e) => {
            warn!("Failed to read account store, starting empty: {e}");
            BTreeMap::new()
        }
    }
}

fn write_document(storage: &dyn Storage, accounts: &BTreeMap<String, Account>) {
    match serde_json::to_string_pretty(accounts) {
        Ok(json) => {
            if let Err(e) = storage.save(&json) {
                error!("Failed to save account store: {e}");
            }
        }
        Err(e) => error!("Failed to serialize account store: {e}"),
    }
}
