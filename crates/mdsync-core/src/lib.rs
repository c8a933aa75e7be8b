//! # mdsync-core
//!
//! Two-way synchronization between an IMAP account and a local maildir.
//!
//! This crate provides:
//! - **Flag translation** between maildir letters and IMAP flags
//! - **Maildir store** with crash-safe delivery and a per-folder pull cursor
//! - **IMAP session** for folder listing, incremental UID fetch and
//!   UIDPLUS uploads
//! - **Synchronizer** running the push pass and then the pull pass for one
//!   account
//!
//! ## Example
//!
//! ```ignore
//! use mdsync_core::{AccountConfig, Maildir, sync_account};
//!
//! # async fn run(account: AccountConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Maildir::open("/home/me/Mail/work").await?;
//! let report = sync_account(&account, &store).await?;
//! println!("{} up, {} down", report.uploaded, report.downloaded);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod flags;
pub mod maildir;
pub mod message;
pub mod remote;
pub mod sync;

pub use config::{AccountConfig, FolderSelection};
pub use error::{Error, Result};
pub use flags::{MaildirFlag, MaildirFlags};
pub use maildir::{Cursor, MARKER, Maildir, Scan};
pub use message::MessageInfo;
pub use remote::{MailRemote, RemoteFolder, RemoteMessage, Session, Uploaded};
pub use sync::{Phase, SyncFailure, SyncReport, sync, sync_account};
