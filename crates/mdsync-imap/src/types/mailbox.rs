//! Mailbox types.

use super::{Flags, Uid, UidValidity};

/// Mailbox name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailbox status information from SELECT/EXAMINE.
#[derive(Debug, Clone, Default)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Next UID to be assigned.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY value.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined for this mailbox.
    pub flags: Flags,
    /// Whether the server reported the mailbox as read-only.
    pub read_only: bool,
}

/// LIST response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Mailbox name.
    pub mailbox: Mailbox,
}

impl ListResponse {
    /// Returns true if the mailbox can be selected.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self
            .attributes
            .iter()
            .any(|a| matches!(a, MailboxAttribute::NoSelect | MailboxAttribute::NonExistent))
    }
}

/// Mailbox attributes from LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox does not exist (RFC 5258).
    NonExistent,
    /// Mailbox has no children.
    HasNoChildren,
    /// Mailbox has children.
    HasChildren,
    /// Mailbox is marked for attention.
    Marked,
    /// Mailbox is not marked.
    Unmarked,
    /// Unknown attribute.
    Unknown(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\NONEXISTENT" => Self::NonExistent,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            _ => Self::Unknown(s.to_string()),
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
    use super::*;

    #[test]
    fn mailbox_display() {
        let mb = Mailbox::new("Sent");
        assert_eq!(mb.as_str(), "Sent");
        assert_eq!(format!("{mb}"), "Sent");
    }

    #[test]
    fn attribute_parse() {
        assert_eq!(MailboxAttribute::parse("\\Noselect"), MailboxAttribute::NoSelect);
        assert_eq!(MailboxAttribute::parse("\\NoSelect"), MailboxAttribute::NoSelect);
        assert_eq!(
            MailboxAttribute::parse("\\HasChildren"),
            MailboxAttribute::HasChildren
        );
        assert_eq!(
            MailboxAttribute::parse("\\Trash"),
            MailboxAttribute::Unknown("\\Trash".to_string())
        );
    }

    #[test]
    fn noselect_is_not_selectable() {
        let list = ListResponse {
            attributes: vec![MailboxAttribute::NoSelect, MailboxAttribute::HasChildren],
            delimiter: Some('/'),
            mailbox: Mailbox::new("[Gmail]"),
        };
        assert!(!list.is_selectable());

        let list = ListResponse {
            attributes: vec![MailboxAttribute::HasNoChildren],
            delimiter: Some('/'),
            mailbox: Mailbox::new("INBOX"),
        };
        assert!(list.is_selectable());
    }

    #[test]
    fn status_default() {
        let status = MailboxStatus::default();
        assert_eq!(status.exists, 0);
        assert!(status.uid_validity.is_none());
        assert!(status.uid_next.is_none());
        assert!(status.flags.is_empty());
        assert!(!status.read_only);
    }
}
