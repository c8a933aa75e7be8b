//! The IMAP side of a sync.
//!
//! [`MailRemote`] is the set of server operations the synchronizer needs.
//! [`Session`] implements it over one authenticated IMAP connection.

mod password;
mod session;

use std::future::Future;

pub use self::password::resolve_password;
pub use self::session::Session;
use crate::Result;
use crate::flags::MaildirFlags;

/// What EXAMINE reported about a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFolder {
    /// The folder's UIDVALIDITY.
    pub uid_validity: u32,
    /// Number of messages in the folder.
    pub exists: u32,
}

/// A message body with its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessage {
    /// Flags, already translated to maildir letters.
    pub flags: MaildirFlags,
    /// The complete RFC 5322 message.
    pub body: Vec<u8>,
}

/// Identifiers the server assigned to an uploaded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uploaded {
    /// UIDVALIDITY of the target folder.
    pub uid_validity: u32,
    /// UID of the new message.
    pub uid: u32,
}

/// Server operations used by the synchronizer.
pub trait MailRemote {
    /// Returns the names of the folders to synchronize.
    fn list_folders(&mut self) -> impl Future<Output = Result<Vec<String>>>;

    /// Opens a folder read-only and reports its validity and size.
    fn examine(&mut self, folder: &str) -> impl Future<Output = Result<RemoteFolder>>;

    /// Returns, in ascending order, the UIDs greater than `since`.
    fn fetch_new_uids(
        &mut self,
        folder: &str,
        since: u32,
    ) -> impl Future<Output = Result<Vec<u32>>>;

    /// Fetches one message without setting `\Seen`.
    fn fetch_body(&mut self, folder: &str, uid: u32)
    -> impl Future<Output = Result<RemoteMessage>>;

    /// Appends a message and returns the identifiers it was given.
    ///
    /// The message is passed whole; it is sent as one literal.
    fn upload(
        &mut self,
        folder: &str,
        flags: &MaildirFlags,
        message: &[u8],
    ) -> impl Future<Output = Result<Uploaded>>;

    /// Logs out and closes the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>>;
}
