//! Error types for the core library.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while synchronizing an account.
#[derive(Debug, Error)]
pub enum Error {
    /// Account configuration is incomplete or names something that does not exist.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server could not be reached or the TLS setup failed.
    #[error("Cannot connect to {host}: {source}")]
    Connection {
        /// Server the connection was made to.
        host: String,
        /// Underlying IMAP error.
        source: mdsync_imap::Error,
    },

    /// The server rejected the credentials.
    #[error("Authentication failed for {username}: {source}")]
    Auth {
        /// Login name.
        username: String,
        /// Underlying IMAP error.
        source: mdsync_imap::Error,
    },

    /// The server answered, but not with what the sync needs.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A required server extension is not advertised.
    #[error("Server does not support {0}")]
    MissingCapability(&'static str),

    /// The folder's UIDVALIDITY changed since the last sync.
    #[error(
        "UIDVALIDITY of folder {folder} changed from {local} to {remote}; a full resync is required"
    )]
    Consistency {
        /// Folder name.
        folder: String,
        /// Validity stored in the local cursor.
        local: u32,
        /// Validity reported by the server.
        remote: u32,
    },

    /// A filesystem operation failed.
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        /// Path the operation was working on.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A cursor file exists but cannot be read as two numbers.
    #[error("Malformed cursor {}: {reason}", path.display())]
    MalformedCursor {
        /// Cursor file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// The external password command failed.
    #[error("Password command failed: {0}")]
    PasswordCommand(String),

    /// IMAP operation failed.
    #[error("IMAP error: {0}")]
    Imap(#[from] mdsync_imap::Error),
}

impl Error {
    /// Returns a closure that wraps an I/O error with the path it concerns.
    pub(crate) fn storage(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Storage { path, source }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

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

    #[test]
    fn test_storage_error_names_path() {
        let err = Error::storage("/tmp/mail/INBOX/cur")(io::Error::from(io::ErrorKind::NotFound));
        let text = err.to_string();
        assert!(text.contains("/tmp/mail/INBOX/cur"));
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[test]
    fn test_consistency_error_message() {
        let err = Error::Consistency {
            folder: "INBOX".to_string(),
            local: 5,
            remote: 7,
        };
        assert_eq!(
            err.to_string(),
            "UIDVALIDITY of folder INBOX changed from 5 to 7; a full resync is required"
        );
    }
}
