//! Local maildir store.
//!
//! One root directory holds a directory per folder, each with the usual
//! `tmp/`, `cur/` and `new/` subdirectories plus a `.cursor` file recording
//! how far the pull pass got.
//!
//! Writes follow the maildir delivery protocol: the body goes to `tmp/`
//! first and is renamed into `cur/` only once it is complete. The cursor is
//! advanced strictly after the message it covers is in place, so a crash
//! can make the next run fetch a message again but never skip one.

pub mod cursor;
pub mod filename;
mod scan;

use std::collections::BTreeSet;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub use self::cursor::Cursor;
pub use self::filename::MARKER;
pub use self::scan::Scan;
use crate::flags::MaildirFlags;
use crate::message::MessageInfo;
use crate::{Error, Result};

const SUBDIRS: [&str; 3] = ["tmp", "cur", "new"];
const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// A maildir tree for one account.
#[derive(Debug)]
pub struct Maildir {
    root: PathBuf,
    host: String,
    pid: u32,
    seq: AtomicU64,
}

impl Maildir {
    /// Opens an existing maildir root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if `root` is not a directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(Error::storage(&root))?;
        if !meta.is_dir() {
            return Err(not_a_directory(root));
        }

        let host = match nix::unistd::gethostname() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(e) => {
                warn!(error = %e, "cannot read hostname, using localhost");
                "localhost".to_string()
            }
        };

        Ok(Self {
            root,
            host: filename::sanitize_host(&host),
            pid: std::process::id(),
            seq: AtomicU64::new(1),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of a folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for names that would leave the root or
    /// clash with the store's own files.
    pub fn folder_dir(&self, folder: &str) -> Result<PathBuf> {
        let path = Path::new(folder);
        let plain = !folder.is_empty()
            && !filename::is_hidden(folder)
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(part) if !part.to_string_lossy().starts_with('.')));
        if !plain {
            return Err(Error::Config(format!(
                "folder name {folder:?} cannot be stored in a maildir"
            )));
        }
        Ok(self.root.join(path))
    }

    /// Makes sure a folder and its `tmp/`, `cur/` and `new/` directories exist.
    ///
    /// # Errors
    ///
    /// Fails if a non-directory is in the way or a directory cannot be created.
    pub async fn create_folder(&self, folder: &str) -> Result<()> {
        let dir = self.folder_dir(folder)?;
        if let Ok(meta) = tokio::fs::metadata(&dir).await {
            if !meta.is_dir() {
                return Err(not_a_directory(dir));
            }
        }

        for sub in SUBDIRS {
            let path = dir.join(sub);
            tokio::fs::DirBuilder::new()
                .recursive(true)
                .mode(DIR_MODE)
                .create(&path)
                .await
                .map_err(Error::storage(path))?;
        }
        Ok(())
    }

    /// Reads a folder's cursor; `(0, 0)` if it has never been pulled.
    ///
    /// # Errors
    ///
    /// Fails if the cursor file cannot be read or is malformed.
    pub async fn cursor(&self, folder: &str) -> Result<Cursor> {
        cursor::read(&self.folder_dir(folder)?).await
    }

    /// Moves a folder's cursor forward to `uid`.
    ///
    /// A zero stored validity adopts `uid_validity`. A `uid` at or below the
    /// stored one leaves the cursor as it is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Consistency`] if the folder was synchronized under a
    /// different UIDVALIDITY.
    pub async fn advance_cursor(&self, folder: &str, uid_validity: u32, uid: u32) -> Result<()> {
        let dir = self.folder_dir(folder)?;
        let current = cursor::read(&dir).await?;

        if current.uid_validity != 0 && current.uid_validity != uid_validity {
            return Err(Error::Consistency {
                folder: folder.to_string(),
                local: current.uid_validity,
                remote: uid_validity,
            });
        }
        if current.uid_validity == uid_validity && uid <= current.last_seen {
            debug!(folder, uid, last_seen = current.last_seen, "cursor already past uid");
            return Ok(());
        }

        cursor::write(&dir, Cursor::new(uid_validity, uid)).await?;
        debug!(folder, uid_validity, uid, "cursor advanced");
        Ok(())
    }

    async fn commit_cursor(&self, info: &MessageInfo) -> Result<()> {
        self.advance_cursor(&info.folder, info.uid_validity, info.uid)
            .await
    }

    /// Stores a message fetched from the server and advances the cursor.
    ///
    /// The whole body is held in memory; the protocol layer caps literals at
    /// 100 MiB.
    ///
    /// # Errors
    ///
    /// Fails if the message cannot be written or moved into `cur/` (nothing
    /// is left behind in `tmp/` and the cursor is untouched), or if the
    /// cursor cannot be advanced afterwards.
    pub async fn add_message(&self, info: MessageInfo, body: &[u8]) -> Result<MessageInfo> {
        let dir = self.folder_dir(&info.folder)?;
        let name = self.next_name(info.uid, &info.flags);
        let tmp = dir.join("tmp").join(&name);
        let dest = dir.join("cur").join(&name);

        write_new(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &dest).await {
            remove_quietly(&tmp).await;
            return Err(Error::storage(dest)(e));
        }
        debug!(folder = %info.folder, uid = info.uid, path = %dest.display(), "message stored");

        self.commit_cursor(&info).await?;
        Ok(MessageInfo {
            path: Some(dest),
            ..info
        })
    }

    /// Gives an uploaded message its final name in `cur/`.
    ///
    /// The cursor is advanced only when the assigned UID directly follows the
    /// stored one; otherwise unpulled messages lie in between and the pull
    /// pass moves the cursor. If advancing fails the file is moved back.
    ///
    /// # Errors
    ///
    /// Fails if the message has no path, the rename fails, or the cursor
    /// cannot be updated.
    pub async fn rename_message(&self, info: MessageInfo) -> Result<MessageInfo> {
        let dir = self.folder_dir(&info.folder)?;
        let Some(old) = info.path.clone() else {
            return Err(Error::Storage {
                path: dir,
                source: io::Error::new(ErrorKind::InvalidInput, "message has no file"),
            });
        };
        let new = dir
            .join("cur")
            .join(self.next_name(info.uid, &info.flags));

        tokio::fs::rename(&old, &new)
            .await
            .map_err(Error::storage(&old))?;
        debug!(from = %old.display(), to = %new.display(), "uploaded message renamed");

        if let Err(e) = self.commit_after_upload(&info).await {
            if let Err(undo) = tokio::fs::rename(&new, &old).await {
                warn!(path = %new.display(), error = %undo, "cannot restore original name");
            }
            return Err(e);
        }

        Ok(MessageInfo {
            path: Some(new),
            ..info
        })
    }

    async fn commit_after_upload(&self, info: &MessageInfo) -> Result<()> {
        let current = self.cursor(&info.folder).await?;
        let same_validity =
            current.uid_validity == 0 || current.uid_validity == info.uid_validity;
        if same_validity && current.last_seen.checked_add(1) == Some(info.uid) {
            self.commit_cursor(info).await
        } else {
            Ok(())
        }
    }

    /// Returns the UIDs of the marked files in a folder's `cur/`.
    ///
    /// # Errors
    ///
    /// Fails if `cur/` exists but cannot be listed.
    pub async fn stored_uids(&self, folder: &str) -> Result<BTreeSet<u32>> {
        let cur = self.folder_dir(folder)?.join("cur");
        let mut entries = match tokio::fs::read_dir(&cur).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(Error::storage(cur)(e)),
        };

        let mut uids = BTreeSet::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(Error::storage(&cur))?
        {
            if let Some(uid) = filename::parse_uid(&entry.file_name().to_string_lossy()) {
                uids.insert(uid);
            }
        }
        Ok(uids)
    }

    /// Starts a scan for messages in `cur/` directories that carry no marker.
    ///
    /// Folders are visited in name order; hidden entries and folders without
    /// a `cur/` directory are skipped. Must be called within a tokio runtime.
    #[must_use]
    pub fn scan(&self) -> Scan {
        Scan::start(self.root.clone())
    }

    fn next_name(&self, uid: u32, flags: &MaildirFlags) -> String {
        filename::FileName {
            timestamp: chrono::Utc::now().timestamp(),
            pid: self.pid,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            host: &self.host,
            uid,
            flags,
        }
        .to_string()
    }
}

fn not_a_directory(path: PathBuf) -> Error {
    Error::Storage {
        path,
        source: io::Error::new(ErrorKind::AlreadyExists, "not a directory"),
    }
}

/// Creates `path` and writes `body` to disk; a partial file is removed.
async fn write_new(path: &Path, body: &[u8]) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(FILE_MODE)
        .open(path)
        .await
        .map_err(Error::storage(path))?;

    let written = async {
        file.write_all(body).await?;
        file.sync_all().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        remove_quietly(path).await;
        return Err(Error::storage(path)(e));
    }
    Ok(())
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "cannot remove file"),
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
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;
    use crate::flags;

    async fn store() -> (TempDir, Maildir) {
        let dir = tempfile::tempdir().unwrap();
        let maildir = Maildir::open(dir.path()).await.unwrap();
        (dir, maildir)
    }

    fn files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    mod folders {
        use super::*;

        #[tokio::test]
        async fn test_create_folder_layout() {
            let (dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();
            maildir.create_folder("INBOX").await.unwrap();

            for sub in SUBDIRS {
                let meta = std::fs::metadata(dir.path().join("INBOX").join(sub)).unwrap();
                assert!(meta.is_dir());
                assert_eq!(meta.permissions().mode() & 0o777, 0o700);
            }
        }

        #[tokio::test]
        async fn test_create_folder_over_file_fails() {
            let (dir, maildir) = store().await;
            std::fs::write(dir.path().join("INBOX"), b"not a folder").unwrap();

            let result = maildir.create_folder("INBOX").await;
            assert!(matches!(result, Err(Error::Storage { .. })));
        }

        #[tokio::test]
        async fn test_unsafe_folder_names() {
            let (_dir, maildir) = store().await;
            for name in ["", ".hidden", "..", "a/../b", "/etc", "a/.b"] {
                assert!(
                    matches!(maildir.folder_dir(name), Err(Error::Config(_))),
                    "accepted {name:?}"
                );
            }
            assert!(maildir.folder_dir("Archive/2024").is_ok());
        }

        #[tokio::test]
        async fn test_open_rejects_file() {
            let dir = tempfile::tempdir().unwrap();
            let file = dir.path().join("file");
            std::fs::write(&file, b"").unwrap();
            assert!(Maildir::open(&file).await.is_err());
            assert!(Maildir::open(dir.path().join("missing")).await.is_err());
        }
    }

    mod cursors {
        use super::*;

        #[tokio::test]
        async fn test_advance_never_regresses() {
            let (_dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();

            maildir.advance_cursor("INBOX", 9, 5).await.unwrap();
            maildir.advance_cursor("INBOX", 9, 3).await.unwrap();
            assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(9, 5));

            maildir.advance_cursor("INBOX", 9, 6).await.unwrap();
            assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(9, 6));
        }

        #[tokio::test]
        async fn test_advance_with_other_validity_fails() {
            let (_dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();
            maildir.advance_cursor("INBOX", 5, 1).await.unwrap();

            let result = maildir.advance_cursor("INBOX", 7, 2).await;
            assert!(matches!(
                result,
                Err(Error::Consistency {
                    local: 5,
                    remote: 7,
                    ..
                })
            ));
            assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(5, 1));
        }
    }

    mod messages {
        use super::*;

        #[tokio::test]
        async fn test_add_message() {
            let (dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();

            let info = MessageInfo::remote("INBOX", 42, 3, flags::parse_letters("S"));
            let stored = maildir.add_message(info, b"Subject: a\r\n\r\nbody\r\n").await.unwrap();

            let path = stored.path.unwrap();
            assert_eq!(path.parent().unwrap(), dir.path().join("INBOX/cur"));
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.contains(MARKER));
            assert!(name.ends_with(",U=3:2,S"));
            assert_eq!(std::fs::read(&path).unwrap(), b"Subject: a\r\n\r\nbody\r\n");
            assert_eq!(
                std::fs::metadata(&path).unwrap().permissions().mode() & 0o777,
                0o600
            );
            assert!(files(&dir.path().join("INBOX/tmp")).is_empty());
            assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(42, 3));
        }

        #[tokio::test]
        async fn test_sequence_numbers_are_unique() {
            let (dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();

            for uid in 1..=3 {
                let info = MessageInfo::remote("INBOX", 1, uid, MaildirFlags::new());
                maildir.add_message(info, b"x").await.unwrap();
            }

            let names = files(&dir.path().join("INBOX/cur"));
            assert_eq!(names.len(), 3);
            for seq in 1..=3 {
                assert!(names.iter().any(|n| n.contains(&format!("Q{seq}S"))));
            }
        }

        #[tokio::test]
        async fn test_failed_rename_leaves_nothing_behind() {
            let (dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();
            std::fs::remove_dir(dir.path().join("INBOX/cur")).unwrap();

            let info = MessageInfo::remote("INBOX", 42, 1, MaildirFlags::new());
            let result = maildir.add_message(info, b"body").await;

            assert!(matches!(result, Err(Error::Storage { .. })));
            assert!(files(&dir.path().join("INBOX/tmp")).is_empty());
            assert!(!dir.path().join("INBOX/cur").exists());
            assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::default());
        }

        #[tokio::test]
        async fn test_failed_write_leaves_nothing_behind() {
            let (dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();
            maildir.advance_cursor("INBOX", 42, 4).await.unwrap();
            let tmp = dir.path().join("INBOX/tmp");
            std::fs::remove_dir(&tmp).unwrap();
            std::fs::write(&tmp, b"in the way").unwrap();

            let info = MessageInfo::remote("INBOX", 42, 5, MaildirFlags::new());
            let result = maildir.add_message(info, b"body").await;

            assert!(matches!(result, Err(Error::Storage { .. })));
            assert_eq!(std::fs::read(&tmp).unwrap(), b"in the way");
            assert!(files(&dir.path().join("INBOX/cur")).is_empty());
            assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(42, 4));
        }

        #[tokio::test]
        async fn test_write_new_keeps_existing_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("taken");
            std::fs::write(&path, b"first").unwrap();

            let result = write_new(&path, b"second").await;

            assert!(matches!(result, Err(Error::Storage { .. })));
            assert_eq!(std::fs::read(&path).unwrap(), b"first");
        }

        #[tokio::test]
        async fn test_stored_uids() {
            let (dir, maildir) = store().await;
            assert!(maildir.stored_uids("INBOX").await.unwrap().is_empty());
            maildir.create_folder("INBOX").await.unwrap();

            for uid in [2, 5] {
                maildir
                    .add_message(MessageInfo::remote("INBOX", 42, uid, MaildirFlags::new()), b"x")
                    .await
                    .unwrap();
            }
            std::fs::write(dir.path().join("INBOX/cur/local,U=9:2,S"), b"x").unwrap();

            let uids: Vec<_> = maildir.stored_uids("INBOX").await.unwrap().into_iter().collect();
            assert_eq!(uids, vec![2, 5]);
        }

        #[tokio::test]
        async fn test_rename_advances_contiguous_cursor() {
            let (dir, maildir) = store().await;
            maildir.create_folder("Sent").await.unwrap();
            let original = dir.path().join("Sent/cur/local-draft:2,S");
            std::fs::write(&original, b"hello").unwrap();

            let info = MessageInfo {
                folder: "Sent".to_string(),
                path: Some(original.clone()),
                uid_validity: 42,
                uid: 1,
                flags: flags::parse_letters("S"),
            };
            let renamed = maildir.rename_message(info).await.unwrap();

            assert!(!original.exists());
            let name = renamed.path.unwrap().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.contains(MARKER));
            assert!(name.ends_with(",U=1:2,S"));
            assert_eq!(maildir.cursor("Sent").await.unwrap(), Cursor::new(42, 1));
        }

        #[tokio::test]
        async fn test_rename_leaves_gap_for_pull() {
            let (dir, maildir) = store().await;
            maildir.create_folder("Sent").await.unwrap();
            maildir.advance_cursor("Sent", 42, 3).await.unwrap();
            let original = dir.path().join("Sent/cur/local");
            std::fs::write(&original, b"hello").unwrap();

            let info = MessageInfo {
                folder: "Sent".to_string(),
                path: Some(original),
                uid_validity: 42,
                uid: 9,
                flags: MaildirFlags::new(),
            };
            maildir.rename_message(info).await.unwrap();

            assert_eq!(maildir.cursor("Sent").await.unwrap(), Cursor::new(42, 3));
        }

        #[tokio::test]
        async fn test_rename_is_undone_when_cursor_fails() {
            let (dir, maildir) = store().await;
            maildir.create_folder("Sent").await.unwrap();
            std::fs::write(dir.path().join("Sent/.cursor"), b"garbage").unwrap();
            let original = dir.path().join("Sent/cur/local");
            std::fs::write(&original, b"hello").unwrap();

            let info = MessageInfo {
                folder: "Sent".to_string(),
                path: Some(original.clone()),
                uid_validity: 42,
                uid: 1,
                flags: MaildirFlags::new(),
            };
            let result = maildir.rename_message(info).await;

            assert!(matches!(result, Err(Error::MalformedCursor { .. })));
            assert!(original.exists());
            assert_eq!(files(&dir.path().join("Sent/cur")), vec!["local"]);
        }
    }

    mod scanning {
        use super::*;

        async fn drain(maildir: &Maildir) -> Vec<MessageInfo> {
            let mut scan = maildir.scan();
            let mut found = Vec::new();
            while let Some(item) = scan.next().await {
                found.push(item.unwrap());
            }
            found
        }

        #[tokio::test]
        async fn test_scan_yields_unmarked_messages() {
            let (dir, maildir) = store().await;
            maildir.create_folder("INBOX").await.unwrap();
            maildir.create_folder("Sent").await.unwrap();
            std::fs::create_dir(dir.path().join("NoCur")).unwrap();
            std::fs::create_dir_all(dir.path().join(".Trash/cur")).unwrap();
            std::fs::write(dir.path().join(".Trash/cur/gone:2,T"), b"x").unwrap();

            std::fs::write(dir.path().join("INBOX/cur/a:2,FS"), b"a").unwrap();
            std::fs::write(dir.path().join("INBOX/cur/.hidden"), b"h").unwrap();
            std::fs::write(dir.path().join("Sent/cur/b"), b"b").unwrap();
            maildir
                .add_message(MessageInfo::remote("INBOX", 1, 1, MaildirFlags::new()), b"m")
                .await
                .unwrap();

            let found = drain(&maildir).await;

            assert_eq!(found.len(), 2);
            assert_eq!(found[0].folder, "INBOX");
            assert_eq!(flags::letters(&found[0].flags), "FS");
            assert_eq!(found[0].path.as_deref(), Some(dir.path().join("INBOX/cur/a:2,FS").as_path()));
            assert!(!found[0].has_remote_id());
            assert_eq!(found[1].folder, "Sent");
            assert!(found[1].flags.is_empty());
        }

        #[tokio::test]
        async fn test_scan_yields_each_message_once_while_renaming() {
            let (dir, maildir) = store().await;
            maildir.create_folder("Sent").await.unwrap();
            for name in ["one", "two", "three"] {
                std::fs::write(dir.path().join("Sent/cur").join(name), name).unwrap();
            }

            let mut scan = maildir.scan();
            let mut uid = 0;
            while let Some(item) = scan.next().await {
                uid += 1;
                let info = MessageInfo {
                    uid_validity: 3,
                    uid,
                    ..item.unwrap()
                };
                maildir.rename_message(info).await.unwrap();
            }

            assert_eq!(uid, 3);
            let names = files(&dir.path().join("Sent/cur"));
            assert_eq!(names.len(), 3);
            assert!(names.iter().all(|n| n.contains(MARKER)));
            assert_eq!(maildir.cursor("Sent").await.unwrap(), Cursor::new(3, 3));
        }

        #[tokio::test]
        async fn test_scan_of_empty_root() {
            let (_dir, maildir) = store().await;
            assert!(drain(&maildir).await.is_empty());
        }
    }
}
