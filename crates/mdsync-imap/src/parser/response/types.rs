//! Response data types.

use crate::types::{Capability, Flags, ListResponse, ResponseCode, SeqNum, Status, Uid};

/// FETCH response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Flags),
    /// Internal date, as sent by the server.
    InternalDate(String),
    /// RFC822 size.
    Rfc822Size(u32),
    /// UID.
    Uid(Uid),
    /// BODY section.
    Body {
        /// Section specifier, `None` for the whole message.
        section: Option<String>,
        /// Body data, `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
}

/// Untagged response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// Status condition: OK, NO, BAD, PREAUTH or BYE.
    Condition {
        /// Condition keyword.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY response.
    Capability(Vec<Capability>),
    /// LIST response.
    List(ListResponse),
    /// FLAGS response.
    Flags(Flags),
    /// EXISTS response (message count).
    Exists(u32),
    /// RECENT response.
    Recent(u32),
    /// EXPUNGE response (message removed).
    Expunge(SeqNum),
    /// FETCH response.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Fetch data items.
        items: Vec<FetchItem>,
    },
    /// SEARCH response.
    Search(Vec<u32>),
    /// Any other untagged data, kept by keyword so callers can ignore it.
    Other(String),
}

impl UntaggedResponse {
    /// Returns true for an untagged BYE.
    #[must_use]
    pub const fn is_bye(&self) -> bool {
        matches!(
            self,
            Self::Condition {
                status: Status::Bye,
                ..
            }
        )
    }

    /// Returns the response code of a status condition, if any.
    #[must_use]
    pub const fn code(&self) -> Option<&ResponseCode> {
        match self {
            Self::Condition { code, .. } => code.as_ref(),
            _ => None,
        }
    }
}
