//! IMAP response parser.
//!
//! Parses server responses according to RFC 9051 grammar.

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use types::{FetchItem, UntaggedResponse};

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};

use helpers::{
    parse_capability_data, parse_flag_list, parse_list_response, parse_response_code,
    parse_search_response,
};

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Optional text/data.
        text: Option<String>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response, literals included.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            token => Err(lexer.error(&format!("expected *, + or tag, got {token:?}"))),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let untagged = match lexer.next_token()? {
            Token::Atom(keyword) => match keyword.to_ascii_uppercase().as_str() {
                "OK" | "NO" | "BAD" | "PREAUTH" | "BYE" => {
                    let status = Self::status_from_keyword(lexer, keyword)?;
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Condition { status, code, text }
                }
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(parse_flag_list(lexer)?)
                }
                "LIST" => {
                    lexer.expect_space()?;
                    UntaggedResponse::List(parse_list_response(lexer)?)
                }
                "SEARCH" => UntaggedResponse::Search(parse_search_response(lexer)?),
                _ => {
                    lexer.read_text_until_crlf();
                    UntaggedResponse::Other(keyword.to_string())
                }
            },
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;

                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => UntaggedResponse::Exists(n),
                    "RECENT" => UntaggedResponse::Recent(n),
                    "EXPUNGE" => UntaggedResponse::Expunge(Self::seq_num(lexer, n)?),
                    "FETCH" => {
                        let seq = Self::seq_num(lexer, n)?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        UntaggedResponse::Fetch { seq, items }
                    }
                    _ => {
                        lexer.read_text_until_crlf();
                        UntaggedResponse::Other(keyword.to_string())
                    }
                }
            }
            token => {
                return Err(lexer.error(&format!("unexpected token in untagged response: {token:?}")));
            }
        };

        Ok(Response::Untagged(untagged))
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let text = lexer.read_text_until_crlf();

        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn seq_num(lexer: &Lexer<'_>, n: u32) -> Result<SeqNum> {
        SeqNum::new(n).ok_or_else(|| lexer.error("invalid sequence number 0"))
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let keyword = lexer.read_atom_string()?;
        Self::status_from_keyword(lexer, keyword)
    }

    fn status_from_keyword(lexer: &Lexer<'_>, keyword: &str) -> Result<Status> {
        match keyword.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(&format!("invalid status: {keyword}"))),
        }
    }

    /// Parses `[SP] [code] text CRLF`. Some servers omit the text entirely.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };

        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }

        Ok((code, lexer.read_text_until_crlf()))
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
    use crate::types::{AppendUid, Capability, Flag, MailboxAttribute, Uid, UidValidity};

    use super::*;

    #[test]
    fn test_parse_greeting() {
        let response = ResponseParser::parse(b"* OK IMAP4rev1 server ready\r\n").unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Condition { status, code, text }) => {
                assert_eq!(status, Status::Ok);
                assert!(code.is_none());
                assert_eq!(text, "IMAP4rev1 server ready");
            }
            other => panic!("Expected untagged OK, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_greeting_with_capabilities() {
        let response =
            ResponseParser::parse(b"* OK [CAPABILITY IMAP4rev1 UIDPLUS STARTTLS] ready\r\n")
                .unwrap();

        let Response::Untagged(untagged) = response else {
            panic!("Expected untagged");
        };
        match untagged.code() {
            Some(ResponseCode::Capability(caps)) => {
                assert!(caps.contains(&Capability::UidPlus));
                assert!(caps.contains(&Capability::StartTls));
            }
            other => panic!("Expected CAPABILITY code, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tagged_ok() {
        let response = ResponseParser::parse(b"A001 OK LOGIN completed\r\n").unwrap();

        match response {
            Response::Tagged {
                tag,
                status,
                code,
                text,
            } => {
                assert_eq!(tag.as_str(), "A001");
                assert_eq!(status, Status::Ok);
                assert!(code.is_none());
                assert_eq!(text, "LOGIN completed");
            }
            other => panic!("Expected tagged response, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_tagged_without_text() {
        let response = ResponseParser::parse(b"A002 OK\r\n").unwrap();
        assert!(matches!(
            response,
            Response::Tagged { status: Status::Ok, ref text, .. } if text.is_empty()
        ));
    }

    #[test]
    fn test_parse_tagged_appenduid() {
        let response =
            ResponseParser::parse(b"A003 OK [APPENDUID 38505 3955] APPEND completed\r\n").unwrap();

        let Response::Tagged { code, .. } = response else {
            panic!("Expected tagged response");
        };
        assert_eq!(
            code,
            Some(ResponseCode::AppendUid(AppendUid {
                uid_validity: UidValidity::new(38505).unwrap(),
                uid: Uid::new(3955).unwrap(),
            }))
        );
    }

    #[test]
    fn test_parse_bye() {
        let response = ResponseParser::parse(b"* BYE Autologout; idle too long\r\n").unwrap();
        let Response::Untagged(untagged) = response else {
            panic!("Expected untagged");
        };
        assert!(untagged.is_bye());
    }

    #[test]
    fn test_parse_capability() {
        let response = ResponseParser::parse(b"* CAPABILITY IMAP4rev1 UIDPLUS IDLE\r\n").unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Capability(caps)) => {
                assert!(caps.contains(&Capability::Imap4Rev1));
                assert!(caps.contains(&Capability::UidPlus));
                assert!(caps.contains(&Capability::Unknown("IDLE".to_string())));
            }
            other => panic!("Expected capability response, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_exists_and_recent() {
        assert_eq!(
            ResponseParser::parse(b"* 23 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(23))
        );
        assert_eq!(
            ResponseParser::parse(b"* 0 RECENT\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Recent(0))
        );
    }

    #[test]
    fn test_parse_flags() {
        let response =
            ResponseParser::parse(b"* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n")
                .unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Flags(flags)) => {
                assert_eq!(flags.len(), 5);
                assert!(flags.contains(&Flag::Draft));
            }
            other => panic!("Expected FLAGS, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_list() {
        let response = ResponseParser::parse(b"* LIST (\\HasChildren) \"/\" \"INBOX\"\r\n").unwrap();

        match response {
            Response::Untagged(UntaggedResponse::List(list)) => {
                assert!(list.attributes.contains(&MailboxAttribute::HasChildren));
                assert_eq!(list.delimiter, Some('/'));
                assert_eq!(list.mailbox.as_str(), "INBOX");
            }
            other => panic!("Expected LIST, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation {
                text: Some("Ready for literal".to_string())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn test_parse_uidvalidity_code() {
        let response = ResponseParser::parse(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n").unwrap();

        let Response::Untagged(untagged) = response else {
            panic!("Expected untagged");
        };
        assert_eq!(
            untagged.code(),
            Some(&ResponseCode::UidValidity(UidValidity::new(3_857_529_045).unwrap()))
        );
    }

    #[test]
    fn test_parse_fetch_with_literal() {
        let input = b"* 2 FETCH (UID 44 FLAGS (\\Seen) BODY[] {5}\r\nhello)\r\n";
        let response = ResponseParser::parse(input).unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Fetch { seq, items }) => {
                assert_eq!(seq.get(), 2);
                assert!(items.contains(&FetchItem::Uid(Uid::new(44).unwrap())));
                assert!(items.iter().any(|i| matches!(
                    i,
                    FetchItem::Body { data: Some(d), .. } if d == b"hello"
                )));
            }
            other => panic!("Expected FETCH, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(
            ResponseParser::parse(b"* SEARCH 1 2 3 5 8 13\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(vec![1, 2, 3, 5, 8, 13]))
        );
    }

    #[test]
    fn test_unknown_untagged_is_tolerated() {
        assert_eq!(
            ResponseParser::parse(b"* ENABLED CONDSTORE\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Other("ENABLED".to_string()))
        );
        assert_eq!(
            ResponseParser::parse(b"* 3 VANISHED 1:2\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Other("VANISHED".to_string()))
        );
    }

    #[test]
    fn test_invalid_start_is_error() {
        assert!(ResponseParser::parse(b"(oops)\r\n").is_err());
    }
}
