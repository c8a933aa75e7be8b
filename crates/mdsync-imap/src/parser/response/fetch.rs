//! FETCH response parsing.

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;

use super::helpers::parse_flag_list;
use super::types::FetchItem;

/// Parses the parenthesized item list of a FETCH response.
///
/// Items this crate never requests (ENVELOPE, BODYSTRUCTURE, MODSEQ, ...)
/// are skipped token by token so a server volunteering them does not break
/// the fetch.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name,
            token => return Err(lexer.error(&format!("expected fetch item, got {token:?}"))),
        };

        match name.to_ascii_uppercase().as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                let n = lexer.read_number()?;
                let uid = Uid::new(n).ok_or_else(|| lexer.error("invalid UID 0"))?;
                items.push(FetchItem::Uid(uid));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                items.push(FetchItem::InternalDate(lexer.read_astring()?));
            }
            "BODY" | "BINARY" | "RFC822" => {
                let section = if lexer.peek() == Some(b'[') {
                    parse_section(lexer)?
                } else {
                    None
                };
                skip_origin(lexer);
                lexer.expect_space()?;
                let data = match lexer.next_token()? {
                    Token::Literal(data) => Some(data.to_vec()),
                    Token::QuotedString(s) => Some(s.into_owned().into_bytes()),
                    Token::Nil => None,
                    token => {
                        return Err(lexer.error(&format!("expected body data, got {token:?}")));
                    }
                };
                items.push(FetchItem::Body { section, data });
            }
            _ => {
                // `NAME[...]` forms carry a section before their value.
                if lexer.peek() == Some(b'[') {
                    parse_section(lexer)?;
                    skip_origin(lexer);
                }
                lexer.expect_space()?;
                lexer.skip_value()?;
            }
        }
    }

    Ok(items)
}

/// Parses `[section]`, returning `None` for the empty section.
fn parse_section(lexer: &mut Lexer<'_>) -> Result<Option<String>> {
    lexer.expect(Token::LBracket)?;
    let remaining = lexer.remaining();
    let len = remaining
        .iter()
        .position(|&b| b == b']')
        .ok_or_else(|| lexer.error("unterminated body section"))?;
    let section = String::from_utf8_lossy(&remaining[..len]).into_owned();
    lexer.skip(len);
    lexer.expect(Token::RBracket)?;
    Ok((!section.is_empty()).then_some(section))
}

/// Skips a partial-fetch origin such as `<0>`.
fn skip_origin(lexer: &mut Lexer<'_>) {
    if lexer.peek() == Some(b'<') {
        while let Some(b) = lexer.advance() {
            if b == b'>' {
                break;
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
    use crate::types::Flag;

    use super::*;

    #[test]
    fn test_uid_flags_and_body_literal() {
        let mut lexer = Lexer::new(b"(UID 7 FLAGS (\\Seen $Forwarded) BODY[] {11}\r\nHello World)");
        let items = parse_fetch_response(&mut lexer).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0], FetchItem::Uid(Uid::new(7).unwrap()));
        let FetchItem::Flags(flags) = &items[1] else {
            panic!("Expected flags");
        };
        assert!(flags.contains(&Flag::Forwarded));
        assert_eq!(
            items[2],
            FetchItem::Body {
                section: None,
                data: Some(b"Hello World".to_vec()),
            }
        );
    }

    #[test]
    fn test_body_section_and_origin() {
        let mut lexer = Lexer::new(b"(BODY[HEADER.FIELDS (SUBJECT)]<0> \"x\")");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: Some("HEADER.FIELDS (SUBJECT)".to_string()),
                data: Some(b"x".to_vec()),
            }]
        );
    }

    #[test]
    fn test_nil_body() {
        let mut lexer = Lexer::new(b"(BODY[] NIL UID 3)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(
            items[0],
            FetchItem::Body {
                section: None,
                data: None
            }
        );
        assert_eq!(items[1], FetchItem::Uid(Uid::new(3).unwrap()));
    }

    #[test]
    fn test_unknown_items_are_skipped() {
        let mut lexer = Lexer::new(
            b"(MODSEQ (12345) ENVELOPE (NIL \"Hi\" ((NIL NIL \"a\" \"b.c\")) NIL NIL NIL NIL NIL NIL NIL) UID 9)",
        );
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items, vec![FetchItem::Uid(Uid::new(9).unwrap())]);
    }

    #[test]
    fn test_internal_date_and_size() {
        let mut lexer = Lexer::new(b"(INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" RFC822.SIZE 4286)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(
            items,
            vec![
                FetchItem::InternalDate("17-Jul-1996 02:44:25 -0700".to_string()),
                FetchItem::Rfc822Size(4286),
            ]
        );
    }

    #[test]
    fn test_uid_zero_is_error() {
        let mut lexer = Lexer::new(b"(UID 0)");
        assert!(parse_fetch_response(&mut lexer).is_err());
    }
}
