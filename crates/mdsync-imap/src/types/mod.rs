//! Core IMAP types.
//!
//! This module defines the fundamental types used throughout the IMAP library,
//! following RFC 9051 (`IMAP4rev2`) and RFC 3501 (`IMAP4rev1`).

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod sequence;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use response_code::{AppendUid, ResponseCode};
pub use sequence::UidSet;
