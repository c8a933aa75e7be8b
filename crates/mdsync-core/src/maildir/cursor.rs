//! The per-folder pull cursor.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::{FILE_MODE, remove_quietly};
use crate::{Error, Result};

/// File name of the cursor inside a folder directory.
pub const CURSOR_FILE: &str = ".cursor";

const CURSOR_TMP_FILE: &str = ".cursor.tmp";

/// How far the pull pass got in one folder.
///
/// `uid_validity == 0` means the folder has never been pulled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// UIDVALIDITY the UIDs below belong to.
    pub uid_validity: u32,
    /// Highest UID stored locally.
    pub last_seen: u32,
}

impl Cursor {
    /// Creates a cursor.
    #[must_use]
    pub const fn new(uid_validity: u32, last_seen: u32) -> Self {
        Self {
            uid_validity,
            last_seen,
        }
    }

    /// Parses the two-line file format.
    fn parse(path: &Path, content: &str) -> Result<Self> {
        let malformed = |reason: &str| Error::MalformedCursor {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut lines = content.lines();
        let (Some(validity), Some(last_seen), None) = (lines.next(), lines.next(), lines.next())
        else {
            return Err(malformed("expected exactly two lines"));
        };

        let uid_validity = validity
            .trim()
            .parse()
            .map_err(|_| malformed("UIDVALIDITY is not a number"))?;
        let last_seen = last_seen
            .trim()
            .parse()
            .map_err(|_| malformed("last UID is not a number"))?;
        Ok(Self::new(uid_validity, last_seen))
    }
}

/// Returns the cursor path of a folder directory.
#[must_use]
pub fn path(folder_dir: &Path) -> PathBuf {
    folder_dir.join(CURSOR_FILE)
}

/// Reads a folder's cursor; a missing file is the zero cursor.
pub async fn read(folder_dir: &Path) -> Result<Cursor> {
    let path = path(folder_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Cursor::parse(&path, &content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Cursor::default()),
        Err(e) => Err(Error::storage(path)(e)),
    }
}

/// Replaces a folder's cursor.
///
/// The new content is synced to a temporary file and renamed over the old
/// one, so after a crash the file holds either the old or the new cursor.
/// The folder directory is synced last to make the rename durable.
pub async fn write(folder_dir: &Path, cursor: Cursor) -> Result<()> {
    let tmp = folder_dir.join(CURSOR_TMP_FILE);
    let content = format!("{}\n{}\n", cursor.uid_validity, cursor.last_seen);

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(&tmp)
        .await
        .map_err(Error::storage(&tmp))?;
    let written = async {
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await
    }
    .await;
    drop(file);
    if let Err(e) = written {
        remove_quietly(&tmp).await;
        return Err(Error::storage(tmp)(e));
    }

    let path = path(folder_dir);
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
        remove_quietly(&tmp).await;
        return Err(Error::storage(path)(e));
    }

    let dir = tokio::fs::File::open(folder_dir)
        .await
        .map_err(Error::storage(folder_dir))?;
    dir.sync_all().await.map_err(Error::storage(folder_dir))
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

    #[tokio::test]
    async fn test_missing_cursor_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read(dir.path()).await.unwrap(), Cursor::default());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), Cursor::new(42, 7)).await.unwrap();

        assert_eq!(read(dir.path()).await.unwrap(), Cursor::new(42, 7));
        let raw = std::fs::read_to_string(dir.path().join(CURSOR_FILE)).unwrap();
        assert_eq!(raw, "42\n7\n");
        assert!(!dir.path().join(CURSOR_TMP_FILE).exists());
    }

    #[tokio::test]
    async fn test_write_over_existing_cursor() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), Cursor::new(42, 7)).await.unwrap();
        write(dir.path(), Cursor::new(42, 12)).await.unwrap();

        assert_eq!(read(dir.path()).await.unwrap(), Cursor::new(42, 12));
        let mode = std::fs::metadata(dir.path().join(CURSOR_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_failed_replace_removes_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join(CURSOR_FILE);
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let result = write(dir.path(), Cursor::new(42, 7)).await;

        assert!(matches!(result, Err(Error::Storage { .. })));
        assert!(!dir.path().join(CURSOR_TMP_FILE).exists());
        assert!(blocker.join("keep").exists());
    }

    #[tokio::test]
    async fn test_malformed_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CURSOR_FILE);

        for bad in ["", "42\n", "42\nseven\n", "1\n2\n3\n", "-1\n2\n"] {
            std::fs::write(&file, bad).unwrap();
            let result = read(dir.path()).await;
            assert!(
                matches!(result, Err(Error::MalformedCursor { .. })),
                "accepted {bad:?}"
            );
        }
    }
}
