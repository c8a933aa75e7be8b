//! Command serialization helpers.

use chrono::{DateTime, FixedOffset};

use crate::types::{Flag, Mailbox};

use super::types::{FetchAttribute, FetchItems};

/// Writes an astring (atom or quoted string).
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Writes a quoted string, escaping `"` and `\`.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Writes a mailbox name.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) {
    write_astring(buf, mailbox.as_str());
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b == 0x7F
}

/// Writes a parenthesized flag list.
pub fn write_flag_list(buf: &mut Vec<u8>, flags: &[Flag]) {
    buf.push(b'(');
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes an IMAP `date-time` (`"17-Oct-2026 09:05:00 +0200"`).
pub fn write_date_time(buf: &mut Vec<u8>, date: &DateTime<FixedOffset>) {
    buf.push(b'"');
    buf.extend_from_slice(date.format("%d-%b-%Y %H:%M:%S %z").to_string().as_bytes());
    buf.push(b'"');
}

/// Writes FETCH items.
pub fn write_fetch_items(buf: &mut Vec<u8>, items: &FetchItems) {
    match items {
        FetchItems::Fast => buf.extend_from_slice(b"FAST"),
        FetchItems::Items(attrs) => {
            if let [attr] = attrs.as_slice() {
                write_fetch_attribute(buf, attr);
            } else {
                buf.push(b'(');
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    write_fetch_attribute(buf, attr);
                }
                buf.push(b')');
            }
        }
    }
}

/// Writes a single FETCH attribute.
pub fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
        FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::Body { section, peek } => {
            if *peek {
                buf.extend_from_slice(b"BODY.PEEK[");
            } else {
                buf.extend_from_slice(b"BODY[");
            }
            if let Some(s) = section {
                buf.extend_from_slice(s.as_bytes());
            }
            buf.push(b']');
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

    fn astring(s: &str) -> String {
        let mut buf = Vec::new();
        write_astring(&mut buf, s);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn astring_atom_is_bare() {
        assert_eq!(astring("INBOX"), "INBOX");
        assert_eq!(astring("user@example.com"), "user@example.com");
    }

    #[test]
    fn astring_quotes_specials() {
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("Sent Items"), "\"Sent Items\"");
        assert_eq!(astring("a\"b"), "\"a\\\"b\"");
        assert_eq!(astring("back\\slash"), "\"back\\\\slash\"");
        assert_eq!(astring("[Gmail]/All"), "\"[Gmail]/All\"");
    }

    #[test]
    fn date_time_format() {
        let date = DateTime::parse_from_rfc3339("2026-10-07T09:05:03+02:00").unwrap();
        let mut buf = Vec::new();
        write_date_time(&mut buf, &date);
        assert_eq!(buf, b"\"07-Oct-2026 09:05:03 +0200\"");
    }

    #[test]
    fn flag_list() {
        let mut buf = Vec::new();
        write_flag_list(&mut buf, &[Flag::Seen, Flag::Forwarded]);
        assert_eq!(buf, b"(\\Seen $Forwarded)");

        let mut buf = Vec::new();
        write_flag_list(&mut buf, &[]);
        assert_eq!(buf, b"()");
    }

    #[test]
    fn body_peek_attribute() {
        let mut buf = Vec::new();
        write_fetch_attribute(&mut buf, &FetchAttribute::full_body_peek());
        assert_eq!(buf, b"BODY.PEEK[]");
    }
}
