//! # mdsync-imap
//!
//! The IMAP client half of `mdsync`. It implements the subset of RFC 3501 /
//! RFC 9051 a one-way-at-a-time mailbox synchronizer needs, plus the
//! `APPENDUID` response code from UIDPLUS (RFC 4315).
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   IMAP state transitions (`NotAuthenticated` → `Authenticated` → `Selected`)
//! - **Plaintext, implicit TLS and STARTTLS** via rustls
//! - **Streaming UID FETCH**: messages are yielded as they arrive, the
//!   command's completion status is reported after the last one
//! - **APPEND with UIDPLUS**: the assigned `(UIDVALIDITY, UID)` pair is returned
//! - **Sans-I/O parser**: Protocol parsing separated from network I/O
//!
//! ## Quick Start
//!
//! ```ignore
//! use mdsync_imap::{Client, Config, FetchAttribute, FetchItems, Security, UidSet};
//!
//! #[tokio::main]
//! async fn main() -> mdsync_imap::Result<()> {
//!     let config = Config::builder("imap.example.com")
//!         .security(Security::Implicit)
//!         .build();
//!     let client = Client::from_stream(config.connect().await?).await?;
//!     let mut client = client.login("user@example.com", "password").await?;
//!
//!     for folder in client.list("", "*").await? {
//!         println!("Folder: {}", folder.mailbox);
//!     }
//!
//!     let (mut client, status) = client.examine("INBOX").await?;
//!     println!("Messages: {}", status.exists);
//!
//!     if let Some(new) = UidSet::after(0) {
//!         let mut fetch = client
//!             .uid_fetch(&new, FetchItems::Items(vec![FetchAttribute::Uid]))
//!             .await?;
//!         while let Some(message) = fetch.next().await {
//!             println!("UID {:?}", message?.uid);
//!         }
//!     }
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── examine() ───→ Selected
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      Selected       │ ─── close() ───→ Authenticated
//! └─────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod stream_fetch;
pub mod types;

pub use command::{Command, FetchAttribute, FetchItems, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, ImapStream, NotAuthenticated,
    ResponseAccumulator, Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use stream_fetch::{FetchStream, FetchedMessage};
pub use types::{
    AppendUid, Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus,
    ResponseCode, SeqNum, Status, Tag, Uid, UidSet, UidValidity,
};
