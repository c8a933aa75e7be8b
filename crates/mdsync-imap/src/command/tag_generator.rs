//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

/// Tag generator for IMAP commands.
///
/// Generates sequential tags in the format "A0000", "A0001", etc. The counter
/// wraps instead of overflowing; tags only need to be unique among commands
/// that are in flight at the same time.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Generates the next tag.
    pub fn next(&mut self) -> String {
        let n = self.counter;
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, n)
    }

    /// Returns the number of tags handed out so far.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
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
    fn test_tag_generation() {
        let mut generator = TagGenerator::default();
        assert_eq!(generator.next(), "A0000");
        assert_eq!(generator.next(), "A0001");
        assert_eq!(generator.next(), "A0002");
        assert_eq!(generator.current(), 3);
    }

    #[test]
    fn test_custom_prefix_and_padding() {
        let mut generator = TagGenerator::new('X');
        for _ in 0..100 {
            let _ = generator.next();
        }
        assert_eq!(generator.next(), "X0100");
    }

    #[test]
    fn test_wraps_without_panicking() {
        let mut generator = TagGenerator {
            counter: u32::MAX,
            prefix: 'A',
        };
        assert_eq!(generator.next(), "A4294967295");
        assert_eq!(generator.next(), "A0000");
    }
}
