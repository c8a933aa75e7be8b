//! Command-related type definitions.

/// FETCH items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// Fetch fast (equivalent to FLAGS INTERNALDATE RFC822.SIZE).
    Fast,
    /// Custom list of items.
    Items(Vec<FetchAttribute>),
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Internal date.
    InternalDate,
    /// RFC822 size.
    Rfc822Size,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier (`None` for the whole message).
        section: Option<String>,
        /// Peek (don't set \Seen).
        peek: bool,
    },
}

impl FetchAttribute {
    /// The complete message, fetched without setting `\Seen`.
    #[must_use]
    pub const fn full_body_peek() -> Self {
        Self::Body {
            section: None,
            peek: true,
        }
    }
}
