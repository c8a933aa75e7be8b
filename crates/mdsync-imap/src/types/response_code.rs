//! Response codes.

use super::{Capability, Flag, Uid, UidValidity};

/// Identifiers assigned to an appended message (UIDPLUS `APPENDUID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendUid {
    /// UIDVALIDITY of the destination mailbox.
    pub uid_validity: UidValidity,
    /// UID of the appended message.
    pub uid: Uid,
}

/// Bracketed response code attached to a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// ALERT: Human-readable message that MUST be shown to user.
    Alert,
    /// CAPABILITY response.
    Capability(Vec<Capability>),
    /// PERMANENTFLAGS: Flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// READ-ONLY: Mailbox selected as read-only.
    ReadOnly,
    /// READ-WRITE: Mailbox selected as read-write.
    ReadWrite,
    /// TRYCREATE: Mailbox doesn't exist, but can be created.
    TryCreate,
    /// UIDNEXT: Next UID to be assigned.
    UidNext(Uid),
    /// UIDVALIDITY: Unique identifier validity value.
    UidValidity(UidValidity),
    /// APPENDUID: identifiers assigned to an appended message.
    AppendUid(AppendUid),
    /// Unknown response code.
    Unknown(String),
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
    fn append_uid_carries_both_values() {
        let code = ResponseCode::AppendUid(AppendUid {
            uid_validity: UidValidity::new(42).unwrap(),
            uid: Uid::new(7).unwrap(),
        });
        let ResponseCode::AppendUid(append) = code else {
            panic!("Expected AppendUid variant");
        };
        assert_eq!(append.uid_validity.get(), 42);
        assert_eq!(append.uid.get(), 7);
    }

    #[test]
    fn unknown_keeps_name() {
        let code = ResponseCode::Unknown("X-CUSTOM".to_string());
        assert_eq!(code, ResponseCode::Unknown("X-CUSTOM".to_string()));
    }
}
