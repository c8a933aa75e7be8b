//! IMAP command builder.
//!
//! This module provides types and serialization for IMAP commands.

mod serialize;
mod tag_generator;
mod types;

use chrono::{DateTime, FixedOffset};

use crate::types::{Flag, Mailbox, UidSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems};

use serialize::{
    write_astring, write_date_time, write_fetch_items, write_flag_list, write_mailbox,
    write_quoted,
};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    // Authenticated State Commands
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// APPEND command line, up to and including the literal announcement.
    ///
    /// The message bytes are sent separately once the server answers with a
    /// continuation request.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Flags to set on the new message.
        flags: Vec<Flag>,
        /// Internal date to record for the message.
        internal_date: Option<DateTime<FixedOffset>>,
        /// Size of the message literal in bytes.
        size: usize,
    },

    // Selected State Commands
    /// CLOSE command.
    Close,
    /// UID FETCH command.
    UidFetch {
        /// UIDs to fetch.
        uids: UidSet,
        /// Items to fetch.
        items: FetchItems,
    },
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),

            Self::Login { username, password } => {
                // Credentials are always sent as quoted strings.
                buf.extend_from_slice(b"LOGIN ");
                write_quoted(&mut buf, username);
                buf.push(b' ');
                write_quoted(&mut buf, password);
            }

            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_astring(&mut buf, pattern);
            }

            Self::Append {
                mailbox,
                flags,
                internal_date,
                size,
            } => {
                buf.extend_from_slice(b"APPEND ");
                write_mailbox(&mut buf, mailbox);
                buf.push(b' ');
                write_flag_list(&mut buf, flags);
                if let Some(date) = internal_date {
                    buf.push(b' ');
                    write_date_time(&mut buf, date);
                }
                buf.extend_from_slice(format!(" {{{size}}}").as_bytes());
            }

            Self::Close => buf.extend_from_slice(b"CLOSE"),

            Self::UidFetch { uids, items } => {
                buf.extend_from_slice(b"UID FETCH ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command name for logging, never including arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Examine { .. } => "EXAMINE",
            Self::List { .. } => "LIST",
            Self::Append { .. } => "APPEND",
            Self::Close => "CLOSE",
            Self::UidFetch { .. } => "UID FETCH",
        }
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
    use crate::types::Uid;

    use super::*;

    #[test]
    fn test_capability_command() {
        assert_eq!(Command::Capability.serialize("A0000"), b"A0000 CAPABILITY\r\n");
    }

    #[test]
    fn test_login_is_always_quoted() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "p\"ss word".to_string(),
        };
        assert_eq!(
            cmd.serialize("A0001"),
            b"A0001 LOGIN \"user\" \"p\\\"ss word\"\r\n"
        );
    }

    #[test]
    fn test_examine_command() {
        let cmd = Command::Examine {
            mailbox: Mailbox::new("Sent Items"),
        };
        assert_eq!(cmd.serialize("A0002"), b"A0002 EXAMINE \"Sent Items\"\r\n");
    }

    #[test]
    fn test_list_command() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(cmd.serialize("A0001"), b"A0001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn test_uid_fetch_range() {
        let cmd = Command::UidFetch {
            uids: UidSet::after(3).unwrap(),
            items: FetchItems::Items(vec![FetchAttribute::Uid]),
        };
        assert_eq!(
            cmd.serialize("A0003"),
            b"A0003 UID FETCH 4:4294967295 UID\r\n"
        );
    }

    #[test]
    fn test_uid_fetch_body_peek() {
        let cmd = Command::UidFetch {
            uids: UidSet::single(Uid::new(12).unwrap()),
            items: FetchItems::Items(vec![
                FetchAttribute::Uid,
                FetchAttribute::Flags,
                FetchAttribute::full_body_peek(),
            ]),
        };
        assert_eq!(
            cmd.serialize("A0004"),
            b"A0004 UID FETCH 12 (UID FLAGS BODY.PEEK[])\r\n"
        );
    }

    #[test]
    fn test_append_command() {
        let cmd = Command::Append {
            mailbox: Mailbox::new("INBOX"),
            flags: vec![Flag::Seen, Flag::Flagged],
            internal_date: Some(DateTime::parse_from_rfc3339("2026-01-02T03:04:05-05:00").unwrap()),
            size: 310,
        };
        assert_eq!(
            cmd.serialize("A0005"),
            b"A0005 APPEND INBOX (\\Seen \\Flagged) \"02-Jan-2026 03:04:05 -0500\" {310}\r\n"
        );
    }

    #[test]
    fn test_append_without_flags_or_date() {
        let cmd = Command::Append {
            mailbox: Mailbox::new("Drafts"),
            flags: Vec::new(),
            internal_date: None,
            size: 0,
        };
        assert_eq!(cmd.serialize("A0006"), b"A0006 APPEND Drafts () {0}\r\n");
    }

    #[test]
    fn test_name_hides_arguments() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(cmd.name(), "LOGIN");
    }
}
