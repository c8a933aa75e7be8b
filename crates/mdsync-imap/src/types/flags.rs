//! Message flags.

/// Message flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Message has been read.
    Seen,
    /// Message has been answered.
    Answered,
    /// Message is flagged for special attention.
    Flagged,
    /// Message is marked for deletion.
    Deleted,
    /// Message is a draft.
    Draft,
    /// Message is recent (first session to see it).
    Recent,
    /// Message has been forwarded (`$Forwarded` keyword, RFC 5550).
    Forwarded,
    /// Any other keyword flag.
    Keyword(String),
}

impl Flag {
    /// Parses a flag string.
    ///
    /// System flags and `$Forwarded` are matched case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "\\SEEN" => Self::Seen,
            "\\ANSWERED" => Self::Answered,
            "\\FLAGGED" => Self::Flagged,
            "\\DELETED" => Self::Deleted,
            "\\DRAFT" => Self::Draft,
            "\\RECENT" => Self::Recent,
            "$FORWARDED" => Self::Forwarded,
            _ => Self::Keyword(s.to_string()),
        }
    }

    /// Returns the flag as an IMAP string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Forwarded => "$Forwarded",
            Self::Keyword(s) => s,
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collection of message flags without duplicates, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    flags: Vec<Flag>,
}

impl Flags {
    /// Creates an empty flags collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flag if it is not already present.
    pub fn insert(&mut self, flag: Flag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    /// Returns true if the flag is present.
    #[must_use]
    pub fn contains(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Returns true if the message has been seen.
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.contains(&Flag::Seen)
    }

    /// Returns an iterator over the flags.
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    /// Returns the number of flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns true if there are no flags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl FromIterator<Flag> for Flags {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        let mut flags = Self::new();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

impl IntoIterator for Flags {
    type Item = Flag;
    type IntoIter = std::vec::IntoIter<Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.into_iter()
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
    fn parse_is_case_insensitive() {
        assert_eq!(Flag::parse("\\Seen"), Flag::Seen);
        assert_eq!(Flag::parse("\\SEEN"), Flag::Seen);
        assert_eq!(Flag::parse("\\answered"), Flag::Answered);
        assert_eq!(Flag::parse("$forwarded"), Flag::Forwarded);
    }

    #[test]
    fn unknown_flags_become_keywords() {
        assert_eq!(
            Flag::parse("$Important"),
            Flag::Keyword("$Important".to_string())
        );
        assert_eq!(Flag::parse("$Important").as_str(), "$Important");
    }

    #[test]
    fn as_str_uses_canonical_spelling() {
        assert_eq!(Flag::Seen.as_str(), "\\Seen");
        assert_eq!(Flag::Answered.as_str(), "\\Answered");
        assert_eq!(Flag::Flagged.as_str(), "\\Flagged");
        assert_eq!(Flag::Deleted.as_str(), "\\Deleted");
        assert_eq!(Flag::Draft.as_str(), "\\Draft");
        assert_eq!(Flag::Forwarded.as_str(), "$Forwarded");
        assert_eq!(format!("{}", Flag::Recent), "\\Recent");
    }

    #[test]
    fn insert_ignores_duplicates() {
        let mut flags = Flags::new();
        flags.insert(Flag::Seen);
        flags.insert(Flag::Seen);
        assert_eq!(flags.len(), 1);
        assert!(flags.is_seen());
    }

    #[test]
    fn collect_preserves_first_occurrence_order() {
        let flags: Flags = [Flag::Draft, Flag::Seen, Flag::Draft].into_iter().collect();
        let collected: Vec<_> = flags.into_iter().collect();
        assert_eq!(collected, vec![Flag::Draft, Flag::Seen]);
    }
}
