//! The message record passed between the store and the synchronizer.

use std::path::PathBuf;

use crate::flags::MaildirFlags;

/// One message as the synchronizer sees it.
///
/// A message found by the local scan has no remote identity yet
/// (`uid_validity` and `uid` are 0). A message fetched from the server has
/// no path until the store writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageInfo {
    /// Folder name, relative to the maildir root.
    pub folder: String,
    /// Location of the message file, if it has one.
    pub path: Option<PathBuf>,
    /// UIDVALIDITY of the folder the UID belongs to.
    pub uid_validity: u32,
    /// Server UID.
    pub uid: u32,
    /// Maildir flags.
    pub flags: MaildirFlags,
}

impl MessageInfo {
    /// Creates the record of a message fetched from the server.
    #[must_use]
    pub fn remote(folder: impl Into<String>, uid_validity: u32, uid: u32, flags: MaildirFlags) -> Self {
        Self {
            folder: folder.into(),
            path: None,
            uid_validity,
            uid,
            flags,
        }
    }

    /// Returns true once the server has assigned the message a UID.
    #[must_use]
    pub const fn has_remote_id(&self) -> bool {
        self.uid_validity != 0 && self.uid != 0
    }
}
