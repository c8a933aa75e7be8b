//! IMAP lexer for tokenizing server responses.
//!
//! The lexer works on one complete response as assembled by
//! [`FramedStream`](crate::connection::FramedStream), literals included, and
//! never copies literal data.

#![allow(clippy::missing_errors_doc)]

mod token;

use std::borrow::Cow;

pub use token::Token;

use crate::{Error, Result};

/// IMAP lexer state.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips n bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            // `\*` in PERMANENTFLAGS: any keyword may be created.
            b'\\' if self.peek_at(1) == Some(b'*') => {
                self.pos += 2;
                Ok(Token::Atom("\\*"))
            }
            b'\r' if self.peek_at(1) == Some(b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'\r' => Err(self.error("expected LF after CR")),
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) => self.read_atom(),
            _ => Err(self.error(&format!("unexpected character: {byte:#04x}"))),
        }
    }

    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        let mut unescaped: Option<Vec<u8>> = None;

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = match self.advance() {
                        Some(c @ (b'"' | b'\\')) => c,
                        Some(c) => return Err(self.error(&format!("invalid escape: \\{c}"))),
                        None => return Err(self.error("unexpected EOF in quoted string")),
                    };
                    let buf = unescaped
                        .get_or_insert_with(|| self.input[start..self.pos - 2].to_vec());
                    buf.push(escaped);
                }
                Some(c) => {
                    if let Some(buf) = unescaped.as_mut() {
                        buf.push(c);
                    }
                }
                None => return Err(self.error("unexpected EOF in quoted string")),
            }
        }

        let value = match unescaped {
            Some(bytes) => Cow::Owned(
                String::from_utf8(bytes).map_err(|_| self.error("invalid UTF-8 in quoted string"))?,
            ),
            None => Cow::Borrowed(
                std::str::from_utf8(&self.input[start..self.pos - 1])
                    .map_err(|_| self.error("invalid UTF-8 in quoted string"))?,
            ),
        };
        Ok(Token::QuotedString(value))
    }

    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        // Non-synchronizing literal marker from LITERAL+.
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        if self.advance() != Some(b'}') {
            return Err(self.error("expected } after literal size"));
        }
        if self.advance() != Some(b'\r') || self.advance() != Some(b'\n') {
            return Err(self.error("expected CRLF after literal size"));
        }

        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("invalid literal size"))?;
        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("incomplete literal data"))?;

        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }
        let s = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8 in atom"))?;

        if s.bytes().all(|b| b.is_ascii_digit()) {
            let n = s.parse().map_err(|_| self.error("number too large"))?;
            Ok(Token::Number(n))
        } else if s.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(s))
        }
    }

    /// Creates a parse error at the current position.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Expects and consumes a specific token kind.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}, got {token:?}")))
        }
    }

    /// Expects and consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring (atom, number, quoted string or literal).
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) => Ok(s.into_owned()),
            Token::Literal(data) => std::str::from_utf8(data)
                .map(ToString::to_string)
                .map_err(|_| self.error("invalid UTF-8 in literal")),
            token => Err(self.error(&format!("expected astring, got {token:?}"))),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("expected atom, got {token:?}"))),
        }
    }

    /// Skips one value: an atom, number, string, literal, NIL, or a
    /// parenthesized list of values (nesting allowed).
    pub fn skip_value(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::LParen => depth += 1,
                Token::RParen if depth > 0 => depth -= 1,
                Token::RParen | Token::Crlf | Token::Eof => {
                    return Err(self.error("unexpected end of value"));
                }
                _ => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Reads the rest of the line as text and consumes the CRLF.
    pub fn read_text_until_crlf(&mut self) -> String {
        let remaining = self.remaining();
        let end = remaining
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(remaining.len());
        self.skip(end + 2);
        String::from_utf8_lossy(&remaining[..end]).into_owned()
    }
}

/// Returns true if the byte is a valid atom character.
///
/// This includes `\` so flags like `\Seen` lex as a single atom, even though
/// RFC 9051 lists `\` among the quoted-specials. `[` and `]` are excluded so
/// `BODY[]` and response codes split into separate tokens.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 |         // !
        0x23..=0x27 |  // # $ % & '
        0x2B..=0x5A |  // + , - . / 0-9 : ; < = > ? @ A-Z
        0x5C |         // \
        0x5E..=0x7A |  // ^ _ ` a-z
        0x7C |         // |
        0x7E           // ~
    ) && b != b'%'
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
    fn test_tagged_response() {
        let mut lexer = Lexer::new(b"A001 OK LOGIN completed\r\n");

        assert_eq!(lexer.next_token().unwrap(), Token::Atom("A001"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("OK"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("LOGIN"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("completed"));
        assert_eq!(lexer.next_token().unwrap(), Token::Crlf);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new(b"123 4294967295 4294967296");

        assert_eq!(lexer.next_token().unwrap(), Token::Number(123));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Number(u32::MAX));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_quoted_string_borrows_without_escapes() {
        let mut lexer = Lexer::new(b"\"hello world\"");
        match lexer.next_token().unwrap() {
            Token::QuotedString(Cow::Borrowed(s)) => assert_eq!(s, "hello world"),
            other => panic!("Expected borrowed string, got {other:?}"),
        }
    }

    #[test]
    fn test_quoted_string_escaped() {
        let mut lexer = Lexer::new(b"\"say \\\"hi\\\" \\\\o/\"");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::QuotedString(Cow::Owned("say \"hi\" \\o/".to_string()))
        );
    }

    #[test]
    fn test_nil_is_case_insensitive() {
        let mut lexer = Lexer::new(b"NIL nil");
        assert_eq!(lexer.next_token().unwrap(), Token::Nil);
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Nil);
    }

    #[test]
    fn test_flag_list_tokens() {
        let mut lexer = Lexer::new(b"(\\Seen $Forwarded)");

        assert_eq!(lexer.next_token().unwrap(), Token::LParen);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("\\Seen"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("$Forwarded"));
        assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    }

    #[test]
    fn test_body_section_splits_on_brackets() {
        let mut lexer = Lexer::new(b"BODY[] {5}\r\nhello");

        assert_eq!(lexer.next_token().unwrap(), Token::Atom("BODY"));
        assert_eq!(lexer.next_token().unwrap(), Token::LBracket);
        assert_eq!(lexer.next_token().unwrap(), Token::RBracket);
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b"hello"));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_literal_plus_and_binary_data() {
        let mut lexer = Lexer::new(b"{4+}\r\n\r\n()");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b"\r\n()"));
    }

    #[test]
    fn test_incomplete_literal_is_error() {
        let mut lexer = Lexer::new(b"{10}\r\nshort");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_continuation() {
        let mut lexer = Lexer::new(b"+ Ready\r\n");

        assert_eq!(lexer.next_token().unwrap(), Token::Plus);
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("Ready"));
        assert_eq!(lexer.next_token().unwrap(), Token::Crlf);
    }

    #[test]
    fn test_skip_value_nested_list() {
        let mut lexer = Lexer::new(b"(\"a\" (NIL {2}\r\nxy) 3) REST");
        lexer.skip_value().unwrap();
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("REST"));
    }

    #[test]
    fn test_read_text_until_crlf() {
        let mut lexer = Lexer::new(b"some text here\r\n");
        assert_eq!(lexer.read_text_until_crlf(), "some text here");
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_is_atom_char() {
        assert!(is_atom_char(b'A'));
        assert!(is_atom_char(b'0'));
        assert!(is_atom_char(b':'));
        assert!(is_atom_char(b'\\'));
        assert!(is_atom_char(b'$'));
        assert!(!is_atom_char(b' '));
        assert!(!is_atom_char(b'"'));
        assert!(!is_atom_char(b'('));
        assert!(!is_atom_char(b'['));
        assert!(!is_atom_char(b']'));
        assert!(!is_atom_char(b'{'));
        assert!(!is_atom_char(b'*'));
    }
}
