//! Error types for the IMAP library.

use std::time::Duration;

use thiserror::Error;

use crate::types::Status;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response could not be parsed.
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns true if the server rejected the command (`NO` or `BAD`).
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::No(_) | Self::Bad(_))
    }

    /// Turns a tagged completion into `Ok` or the matching rejection.
    pub(crate) fn check_completion(status: Status, text: String) -> Result<()> {
        match status {
            Status::Ok | Status::PreAuth => Ok(()),
            Status::No => Err(Self::No(text)),
            Status::Bad => Err(Self::Bad(text)),
            Status::Bye => Err(Self::Bye(text)),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
