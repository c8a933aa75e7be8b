//! Type-state markers for IMAP client connection states.
//!
//! `Selected` also carries the mailbox it was opened on, so a selected
//! client can report what it is looking at.

use crate::types::{Mailbox, MailboxStatus};

/// Marker type for the not-authenticated state.
///
/// In this state, only STARTTLS, LOGIN and LOGOUT are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state, mailbox operations (EXAMINE, LIST, APPEND) are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a mailbox opened with EXAMINE.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Mailbox,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Returns the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Returns the status snapshot taken when the mailbox was opened.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
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

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_states_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_accessors() {
        let selected = Selected {
            mailbox: Mailbox::new("INBOX"),
            status: MailboxStatus {
                exists: 3,
                read_only: true,
                ..Default::default()
            },
        };

        assert_eq!(selected.mailbox().as_str(), "INBOX");
        assert_eq!(selected.status().exists, 3);
        assert!(selected.status().read_only);
    }
}
