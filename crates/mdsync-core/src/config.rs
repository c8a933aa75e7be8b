//! Account configuration types.

use std::collections::BTreeSet;
use std::path::PathBuf;

use mdsync_imap::Security;
use serde::{Deserialize, Serialize};

/// One account, as read from an `[accounts.<name>]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Root of the local maildir.
    pub maildir: Option<PathBuf>,
    /// IMAP server hostname.
    pub server: String,
    /// Server port; 0 selects the default for the security mode.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Password, used when no `password_cmd` is set.
    pub password: Option<String>,
    /// Shell command whose output is the password.
    pub password_cmd: Option<String>,
    /// Connect with TLS from the start.
    pub use_tls: bool,
    /// Upgrade a plaintext connection with STARTTLS.
    pub use_starttls: bool,
    /// Which folders take part in the sync.
    pub folders: FolderSelection,
}

impl AccountConfig {
    /// Returns the connection security the two switches select.
    #[must_use]
    pub const fn security(&self) -> Security {
        Security::from_flags(self.use_tls, self.use_starttls)
    }

    /// Returns the port to connect to.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.port == 0 {
            self.security().default_port()
        } else {
            self.port
        }
    }
}

/// Folder include/exclude lists.
///
/// An empty `include` admits every folder. `exclude` always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderSelection {
    /// If non-empty, the only folders that are synchronized.
    pub include: BTreeSet<String>,
    /// Folders that are never synchronized.
    pub exclude: BTreeSet<String>,
}

impl FolderSelection {
    /// Returns true if the folder takes part in the sync.
    #[must_use]
    pub fn admits(&self, folder: &str) -> bool {
        if self.exclude.contains(folder) {
            return false;
        }
        self.include.is_empty() || self.include.contains(folder)
    }

    /// Returns true if the folder was named in `include`.
    #[must_use]
    pub fn explicitly_includes(&self, folder: &str) -> bool {
        self.include.contains(folder)
    }

    /// Returns the included folders that are not in `available`.
    #[must_use]
    pub fn missing<'a>(&'a self, available: &[String]) -> Vec<&'a str> {
        self.include
            .iter()
            .filter(|name| !available.contains(name))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn selection(include: &[&str], exclude: &[&str]) -> FolderSelection {
        FolderSelection {
            include: include.iter().map(ToString::to_string).collect(),
            exclude: exclude.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_empty_selection_admits_everything() {
        let sel = FolderSelection::default();
        assert!(sel.admits("INBOX"));
        assert!(sel.admits("Archive/2024"));
    }

    #[test]
    fn test_include_restricts() {
        let sel = selection(&["INBOX"], &[]);
        assert!(sel.admits("INBOX"));
        assert!(!sel.admits("Sent"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let sel = selection(&["INBOX", "Spam"], &["Spam"]);
        assert!(sel.admits("INBOX"));
        assert!(!sel.admits("Spam"));
    }

    #[test]
    fn test_missing_includes() {
        let sel = selection(&["INBOX", "Lists"], &[]);
        let available = vec!["INBOX".to_string(), "Sent".to_string()];
        assert_eq!(sel.missing(&available), vec!["Lists"]);
    }

    #[test]
    fn test_port_defaults() {
        let mut account = AccountConfig::default();
        assert_eq!(account.security(), Security::None);
        assert_eq!(account.effective_port(), 143);

        account.use_tls = true;
        account.use_starttls = true;
        assert_eq!(account.security(), Security::Implicit);
        assert_eq!(account.effective_port(), 993);

        account.port = 1993;
        assert_eq!(account.effective_port(), 1993);
    }
}
