//! IMAP token types.

use std::borrow::Cow;

/// Token types produced by the lexer.
///
/// Tokens borrow from the response buffer; quoted strings only allocate when
/// they contain escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom (unquoted string without special characters).
    Atom(&'a str),
    /// Quoted string, unescaped.
    QuotedString(Cow<'a, str>),
    /// Literal string with size prefix {n}.
    Literal(&'a [u8]),
    /// Number.
    Number(u32),
    /// Opening parenthesis.
    LParen,
    /// Closing parenthesis.
    RParen,
    /// Opening bracket.
    LBracket,
    /// Closing bracket.
    RBracket,
    /// Space character.
    Space,
    /// Asterisk (untagged response prefix).
    Asterisk,
    /// Plus (continuation response prefix).
    Plus,
    /// NIL literal.
    Nil,
    /// CRLF line ending.
    Crlf,
    /// End of input.
    Eof,
}
