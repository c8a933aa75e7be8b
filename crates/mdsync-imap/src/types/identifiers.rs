//! Core IMAP identifiers.
//!
//! Types for tags, sequence numbers, UIDs, and UIDVALIDITY.

use std::num::NonZeroU32;

/// IMAP command tag.
///
/// Each command carries a unique tag; the server echoes it on the completion
/// response for that command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    /// Creates a new tag from a string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message sequence number.
///
/// Sequence numbers are positional and change when messages are expunged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(pub NonZeroU32);

impl SeqNum {
    /// Creates a new sequence number.
    ///
    /// Returns `None` if the value is 0.
    #[must_use]
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a message.
///
/// UIDs are strictly ascending within a mailbox and stay stable across
/// sessions for as long as the mailbox's `UIDVALIDITY` does not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl Uid {
    /// The largest UID a server may assign.
    pub const MAX: Self = Self(NonZeroU32::MAX);

    /// Creates a new UID.
    ///
    /// Returns `None` if the value is 0.
    #[must_use]
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UIDVALIDITY value for a mailbox.
///
/// If this value changes, all previously seen UIDs are meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UidValidity(pub NonZeroU32);

impl UidValidity {
    /// Creates a new UIDVALIDITY.
    #[must_use]
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for UidValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
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
    fn zero_is_rejected() {
        assert!(SeqNum::new(0).is_none());
        assert!(Uid::new(0).is_none());
        assert!(UidValidity::new(0).is_none());
    }

    #[test]
    fn values_round_trip() {
        assert_eq!(SeqNum::new(42).unwrap().get(), 42);
        assert_eq!(Uid::new(123).unwrap().get(), 123);
        assert_eq!(UidValidity::new(1_700_000_000).unwrap().get(), 1_700_000_000);
    }

    #[test]
    fn uid_max_is_u32_max() {
        assert_eq!(Uid::MAX.get(), u32::MAX);
        assert_eq!(Uid::MAX.to_string(), "4294967295");
    }

    #[test]
    fn uids_order_numerically() {
        let mut uids = vec![Uid::new(10).unwrap(), Uid::new(2).unwrap(), Uid::new(7).unwrap()];
        uids.sort();
        let values: Vec<u32> = uids.iter().map(|u| u.get()).collect();
        assert_eq!(values, vec![2, 7, 10]);
    }

    #[test]
    fn tag_display() {
        let tag = Tag::new("A0001");
        assert_eq!(tag.as_str(), "A0001");
        assert_eq!(format!("{tag}"), "A0001");
    }
}
