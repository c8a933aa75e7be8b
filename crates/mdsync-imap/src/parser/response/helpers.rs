//! Parser helper functions.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{
    AppendUid, Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, ResponseCode, Uid,
    UidValidity,
};
use crate::Result;

/// Reads a non-zero UID.
fn read_uid(lexer: &mut Lexer<'_>) -> Result<Uid> {
    let n = lexer.read_number()?;
    Uid::new(n).ok_or_else(|| lexer.error("invalid UID 0"))
}

/// Reads a non-zero UIDVALIDITY.
fn read_uid_validity(lexer: &mut Lexer<'_>) -> Result<UidValidity> {
    let n = lexer.read_number()?;
    UidValidity::new(n).ok_or_else(|| lexer.error("invalid UIDVALIDITY 0"))
}

/// Parses a bracketed response code.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => {
            lexer.expect_space()?;
            ResponseCode::UidNext(read_uid(lexer)?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            ResponseCode::UidValidity(read_uid_validity(lexer)?)
        }
        "APPENDUID" => {
            lexer.expect_space()?;
            let uid_validity = read_uid_validity(lexer)?;
            lexer.expect_space()?;
            let uid = read_uid(lexer)?;
            ResponseCode::AppendUid(AppendUid { uid_validity, uid })
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.into_iter().collect())
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Codes may carry arguments we do not interpret.
    while lexer.peek().is_some_and(|b| b != b']' && b != b'\r') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses space-separated capability atoms.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses a parenthesized list of atoms, handing each to `item`.
fn parse_atom_list<'a>(lexer: &mut Lexer<'a>, mut item: impl FnMut(&'a str)) -> Result<()> {
    lexer.expect(Token::LParen)?;
    loop {
        match lexer.next_token()? {
            Token::RParen => return Ok(()),
            Token::Space => {}
            Token::Atom(s) => item(s),
            token => return Err(lexer.error(&format!("unexpected token in list: {token:?}"))),
        }
    }
}

/// Parses a flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    let mut flags = Flags::new();
    parse_atom_list(lexer, |s| flags.insert(Flag::parse(s)))?;
    Ok(flags)
}

/// Parses the body of a LIST response.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    let mut attributes = Vec::new();
    parse_atom_list(lexer, |s| attributes.push(MailboxAttribute::parse(s)))?;

    lexer.expect_space()?;
    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => return Err(lexer.error(&format!("expected delimiter, got {token:?}"))),
    };

    lexer.expect_space()?;
    let name = lexer.read_astring()?;

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::new(name),
    })
}

/// Parses the numbers of a SEARCH response.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut nums = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Number(n) = lexer.next_token()? {
            nums.push(n);
        }
    }

    Ok(nums)
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
    fn test_appenduid_code() {
        let mut lexer = Lexer::new(b"[APPENDUID 38505 3955]");
        let code = parse_response_code(&mut lexer).unwrap();
        assert_eq!(
            code,
            ResponseCode::AppendUid(AppendUid {
                uid_validity: UidValidity::new(38505).unwrap(),
                uid: Uid::new(3955).unwrap(),
            })
        );
    }

    #[test]
    fn test_appenduid_zero_is_error() {
        let mut lexer = Lexer::new(b"[APPENDUID 0 3955]");
        assert!(parse_response_code(&mut lexer).is_err());
    }

    #[test]
    fn test_unknown_code_skips_arguments() {
        let mut lexer = Lexer::new(b"[HIGHESTMODSEQ 715194045007] rest");
        let code = parse_response_code(&mut lexer).unwrap();
        assert_eq!(code, ResponseCode::Unknown("HIGHESTMODSEQ".to_string()));
        assert_eq!(lexer.remaining(), b" rest");
    }

    #[test]
    fn test_permanent_flags_code() {
        let mut lexer = Lexer::new(b"[PERMANENTFLAGS (\\Seen \\Deleted \\*)]");
        assert_eq!(
            parse_response_code(&mut lexer).unwrap(),
            ResponseCode::PermanentFlags(vec![
                Flag::Seen,
                Flag::Deleted,
                Flag::Keyword("\\*".to_string())
            ])
        );
    }

    #[test]
    fn test_list_with_nil_delimiter() {
        let mut lexer = Lexer::new(b"(\\Noselect) NIL \"Archive\"");
        let list = parse_list_response(&mut lexer).unwrap();
        assert_eq!(list.delimiter, None);
        assert!(!list.is_selectable());
        assert_eq!(list.mailbox.as_str(), "Archive");
    }

    #[test]
    fn test_list_with_literal_name() {
        let mut lexer = Lexer::new(b"() \".\" {9}\r\nSent Mail");
        let list = parse_list_response(&mut lexer).unwrap();
        assert_eq!(list.delimiter, Some('.'));
        assert_eq!(list.mailbox.as_str(), "Sent Mail");
    }
}
