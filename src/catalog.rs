//! Static catalog of installable OS images.

/// An installable OS image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsImage {
    /// Identifier used in `/install` commands and persisted requests.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Short note shown in the catalog listing.
    pub note: &'static str,
}

/// The images this bot accepts install requests for. Read-only.
pub const OS_CATALOG: &[OsImage] = &[
    OsImage {
        id: "win-10-pro",
        name: "Windows 10 Pro",
        note: "common RDP choice, fairly light",
    },
    OsImage {
        id: "win-11-pro",
        name: "Windows 11 Pro",
        note: "modern UI, somewhat heavy",
    },
    OsImage {
        id: "win-serv-2019",
        name: "Windows Server 2019",
        note: "stable server workhorse",
    },
    OsImage {
        id: "win-serv-2022",
        name: "Windows Server 2022",
        note: "latest, enterprise grade",
    },
];

/// Look up an image by exact id.
pub fn find(os_id: &str) -> Option<&'static OsImage> {
    OS_CATALOG.iter().find(|os| os.id == os_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_id() {
        let os = find("win-10-pro").unwrap();
        assert_eq!(os.name, "Windows 10 Pro");
    }

    #[test]
    fn test_find_unknown_id() {
        assert!(find("debian-12").is_none());
        assert!(find("").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in OS_CATALOG.iter().enumerate() {
            for b in &OS_CATALOG[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }
}
