//! Maildir file names.
//!
//! Files written by mdsync are named
//! `<unix time>.P<pid>Q<seq>S<marker>.<host>,U=<uid>:2,<flags>`. The marker
//! identifies them so the push scan leaves them alone.

use crate::flags::{self, MaildirFlags};

/// Token embedded in the name of every file mdsync has written or renamed.
pub const MARKER: &str = "7f4f3b23-ad6c-434d-9fa9-dbfa7a51397e";

/// Separator between the unique part of a name and its info section.
const INFO: &str = ":2,";

/// Fields that make one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName<'a> {
    /// Seconds since the epoch.
    pub timestamp: i64,
    /// Process id of the writer.
    pub pid: u32,
    /// Per-store sequence number.
    pub seq: u64,
    /// Hostname, already made safe for a file name.
    pub host: &'a str,
    /// Server UID.
    pub uid: u32,
    /// Flags for the info section.
    pub flags: &'a MaildirFlags,
}

impl std::fmt::Display for FileName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.P{}Q{}S{MARKER}.{},U={}{INFO}{}",
            self.timestamp,
            self.pid,
            self.seq,
            self.host,
            self.uid,
            flags::letters(self.flags)
        )
    }
}

/// Escapes the characters maildir reserves in the host part.
#[must_use]
pub fn sanitize_host(host: &str) -> String {
    host.replace('/', "\\057").replace(':', "\\072")
}

/// Returns true if the name carries the mdsync marker.
#[must_use]
pub fn has_marker(name: &str) -> bool {
    name.contains(MARKER)
}

/// Returns true for names the store must not treat as messages.
#[must_use]
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Parses the flag letters of the info section.
///
/// A name without an info section has no flags.
#[must_use]
pub fn parse_flags(name: &str) -> MaildirFlags {
    name.rfind(INFO)
        .map(|at| flags::parse_letters(&name[at + INFO.len()..]))
        .unwrap_or_default()
}

/// Extracts the UID of a name this tool produced.
#[must_use]
pub fn parse_uid(name: &str) -> Option<u32> {
    if !has_marker(name) {
        return None;
    }
    let unique = name.rfind(INFO).map_or(name, |at| &name[..at]);
    let (_, uid) = unique.rsplit_once(",U=")?;
    uid.parse().ok()
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
    fn test_format() {
        let flags = flags::parse_letters("SR");
        let name = FileName {
            timestamp: 1_700_000_000,
            pid: 4242,
            seq: 1,
            host: "mail.local",
            uid: 7,
            flags: &flags,
        }
        .to_string();

        assert_eq!(
            name,
            "1700000000.P4242Q1S7f4f3b23-ad6c-434d-9fa9-dbfa7a51397e.mail.local,U=7:2,RS"
        );
        assert!(has_marker(&name));
        assert_eq!(parse_uid(&name), Some(7));
        assert_eq!(parse_flags(&name), flags);
    }

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize_host("a/b:c"), "a\\057b\\072c");
        assert_eq!(sanitize_host("plain"), "plain");
    }

    #[test]
    fn test_foreign_names() {
        let name = "1699999999.M1P2.otherhost:2,FS";
        assert!(!has_marker(name));
        assert_eq!(parse_uid(name), None);
        assert_eq!(flags::letters(&parse_flags(name)), "FS");
        assert!(parse_flags("1699999999.M1P2.otherhost").is_empty());
    }

    #[test]
    fn test_flag_parse_stops_at_unknown_letter() {
        assert_eq!(flags::letters(&parse_flags("x:2,Sa,T")), "S");
    }

    #[test]
    fn test_hidden() {
        assert!(is_hidden(".cursor"));
        assert!(!is_hidden("INBOX"));
    }
}
