//! UID sets for `UID FETCH`.

use super::Uid;

/// UID-based sequence set.
///
/// No open-ended `n:*` form is offered. When no message has a UID of at least
/// `n`, servers answer `n:*` with the highest existing message, so "everything
/// above n" is spelled `n+1:4294967295` (see [`UidSet::after`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidSet {
    /// Single UID.
    Single(Uid),
    /// Range of UIDs (inclusive).
    Range(Uid, Uid),
    /// Multiple UID specifications.
    Set(Vec<Self>),
}

impl UidSet {
    /// Creates a UID set from a single UID.
    #[must_use]
    pub const fn single(uid: Uid) -> Self {
        Self::Single(uid)
    }

    /// Creates a UID set from a range.
    #[must_use]
    pub const fn range(start: Uid, end: Uid) -> Self {
        Self::Range(start, end)
    }

    /// Creates a range from raw values.
    ///
    /// Returns `None` if either bound is 0.
    #[must_use]
    pub fn from_range(start: u32, end: u32) -> Option<Self> {
        Some(Self::Range(Uid::new(start)?, Uid::new(end)?))
    }

    /// Creates the set of every UID strictly greater than `since`.
    ///
    /// Returns `None` if `since` is already the largest possible UID.
    #[must_use]
    pub fn after(since: u32) -> Option<Self> {
        let start = Uid::new(since.checked_add(1)?)?;
        Some(Self::Range(start, Uid::MAX))
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
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
    fn display_single_and_range() {
        assert_eq!(UidSet::single(Uid::new(7).unwrap()).to_string(), "7");
        assert_eq!(UidSet::from_range(1, 10).unwrap().to_string(), "1:10");
    }

    #[test]
    fn display_set() {
        let set = UidSet::Set(vec![
            UidSet::single(Uid::new(1).unwrap()),
            UidSet::from_range(5, 9).unwrap(),
        ]);
        assert_eq!(set.to_string(), "1,5:9");
    }

    #[test]
    fn from_range_rejects_zero() {
        assert!(UidSet::from_range(0, 10).is_none());
        assert!(UidSet::from_range(1, 0).is_none());
    }

    #[test]
    fn after_uses_explicit_upper_bound() {
        assert_eq!(UidSet::after(0).unwrap().to_string(), "1:4294967295");
        assert_eq!(UidSet::after(41).unwrap().to_string(), "42:4294967295");
    }

    #[test]
    fn after_max_is_empty() {
        assert!(UidSet::after(u32::MAX).is_none());
    }
}
