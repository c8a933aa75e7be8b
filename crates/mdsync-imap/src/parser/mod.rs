//! IMAP protocol parser.
//!
//! A sans-I/O parser for the server responses a synchronizing client sees:
//! status conditions, capability and mailbox data, and FETCH results with
//! message bodies.
//!
//! # Architecture
//!
//! - **Lexer**: turns raw bytes into IMAP tokens (atoms, strings, literals, numbers)
//! - **Response Parser**: builds structured responses from tokens
//!
//! # Example
//!
//! ```
//! use mdsync_imap::parser::{Response, ResponseParser, UntaggedResponse};
//! use mdsync_imap::{ResponseCode, Status};
//!
//! let input = b"* OK [UIDVALIDITY 42] UIDs valid\r\n";
//! let response = ResponseParser::parse(input).unwrap();
//!
//! match response {
//!     Response::Untagged(UntaggedResponse::Condition { status, code, .. }) => {
//!         assert_eq!(status, Status::Ok);
//!         assert!(matches!(code, Some(ResponseCode::UidValidity(v)) if v.get() == 42));
//!     }
//!     _ => panic!("Expected untagged OK"),
//! }
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{FetchItem, Response, ResponseParser, UntaggedResponse};
