//! Translation between maildir flag letters and IMAP flags.
//!
//! Maildir encodes flags as single letters after the `:2,` info marker in a
//! file name. Six of them have an IMAP counterpart; anything else is dropped
//! in either direction.

use std::collections::BTreeSet;
use std::fmt;

use mdsync_imap::{Flag, Flags};

/// A maildir flag letter.
///
/// Variants are declared in ASCII order of their letters so that a
/// `BTreeSet<MaildirFlag>` iterates in the order maildir file names use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaildirFlag {
    /// `D`: the message is a draft.
    Draft,
    /// `F`: flagged for urgent/special attention.
    Flagged,
    /// `P`: passed (resent, forwarded or bounced).
    Passed,
    /// `R`: replied to.
    Replied,
    /// `S`: seen.
    Seen,
    /// `T`: trashed.
    Trashed,
}

/// A set of maildir flags, ordered by letter.
pub type MaildirFlags = BTreeSet<MaildirFlag>;

const TABLE: [(MaildirFlag, Flag); 6] = [
    (MaildirFlag::Passed, Flag::Forwarded),
    (MaildirFlag::Replied, Flag::Answered),
    (MaildirFlag::Seen, Flag::Seen),
    (MaildirFlag::Trashed, Flag::Deleted),
    (MaildirFlag::Draft, Flag::Draft),
    (MaildirFlag::Flagged, Flag::Flagged),
];

impl MaildirFlag {
    /// Returns the flag's letter.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Draft => 'D',
            Self::Flagged => 'F',
            Self::Passed => 'P',
            Self::Replied => 'R',
            Self::Seen => 'S',
            Self::Trashed => 'T',
        }
    }

    /// Parses a flag letter.
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'D' => Some(Self::Draft),
            'F' => Some(Self::Flagged),
            'P' => Some(Self::Passed),
            'R' => Some(Self::Replied),
            'S' => Some(Self::Seen),
            'T' => Some(Self::Trashed),
            _ => None,
        }
    }
}

impl fmt::Display for MaildirFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Translates maildir flags to the IMAP flags sent with APPEND.
#[must_use]
pub fn to_remote(flags: &MaildirFlags) -> Vec<Flag> {
    TABLE
        .iter()
        .filter(|(local, _)| flags.contains(local))
        .map(|(_, remote)| remote.clone())
        .collect()
}

/// Translates the IMAP flags of a fetched message to maildir flags.
///
/// Keywords and system flags without a maildir letter (`\Recent`) are dropped.
#[must_use]
pub fn to_local(flags: &Flags) -> MaildirFlags {
    flags
        .iter()
        .filter_map(|flag| {
            TABLE
                .iter()
                .find(|(_, remote)| remote == flag)
                .map(|(local, _)| *local)
        })
        .collect()
}

/// Parses flag letters, stopping at the first character that is not one.
#[must_use]
pub fn parse_letters(letters: &str) -> MaildirFlags {
    letters
        .chars()
        .map_while(MaildirFlag::from_letter)
        .collect()
}

/// Concatenates the letters of a flag set in maildir order.
#[must_use]
pub fn letters(flags: &MaildirFlags) -> String {
    flags.iter().map(|flag| flag.letter()).collect()
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

    const ALL: [MaildirFlag; 6] = [
        MaildirFlag::Draft,
        MaildirFlag::Flagged,
        MaildirFlag::Passed,
        MaildirFlag::Replied,
        MaildirFlag::Seen,
        MaildirFlag::Trashed,
    ];

    #[test]
    fn test_letters_round_trip() {
        for flag in ALL {
            assert_eq!(MaildirFlag::from_letter(flag.letter()), Some(flag));
        }
        assert_eq!(MaildirFlag::from_letter('a'), None);
    }

    #[test]
    fn test_every_subset_survives_remote_and_back() {
        for mask in 0u32..64 {
            let flags: MaildirFlags = ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, f)| *f)
                .collect();

            let remote: Flags = to_remote(&flags).into_iter().collect();
            assert_eq!(to_local(&remote), flags, "mask {mask:06b}");
        }
    }

    #[test]
    fn test_to_remote_names() {
        let flags = parse_letters("PRS");
        let remote = to_remote(&flags);
        assert_eq!(remote, vec![Flag::Forwarded, Flag::Answered, Flag::Seen]);
    }

    #[test]
    fn test_to_local_drops_unknown() {
        let remote: Flags = [
            Flag::Seen,
            Flag::Recent,
            Flag::Keyword("$Junk".to_string()),
            Flag::Flagged,
        ]
        .into_iter()
        .collect();

        assert_eq!(letters(&to_local(&remote)), "FS");
    }

    #[test]
    fn test_parse_letters_stops_at_unknown() {
        assert_eq!(letters(&parse_letters("SFx,T")), "FS");
        assert!(parse_letters("").is_empty());
        assert!(parse_letters("a").is_empty());
    }

    #[test]
    fn test_letters_sorted() {
        let flags: MaildirFlags = [MaildirFlag::Trashed, MaildirFlag::Draft, MaildirFlag::Seen]
            .into_iter()
            .collect();
        assert_eq!(letters(&flags), "DST");
    }
}
