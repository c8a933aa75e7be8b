//! The per-account synchronizer.
//!
//! An account run pushes new local messages first and then pulls new remote
//! ones:
//!
//! ```text
//! Connecting → Pushing → Pulling → Closing → Done
//!      └──────────┴──────────┴─────────┴──→ Failed
//! ```
//!
//! Any error ends the run for that account. Nothing is retried.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{AccountConfig, FolderSelection};
use crate::maildir::Maildir;
use crate::message::MessageInfo;
use crate::remote::{MailRemote, Session};
use crate::{Error, Result};

/// Stage of an account run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Connecting and logging in.
    Connecting,
    /// Uploading local messages.
    Pushing,
    /// Downloading remote messages.
    Pulling,
    /// Logging out.
    Closing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connect",
            Self::Pushing => "push",
            Self::Pulling => "pull",
            Self::Closing => "close",
        })
    }
}

/// An account run that stopped with an error.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {error}")]
pub struct SyncFailure {
    /// Where the run stopped.
    pub phase: Phase,
    /// What went wrong.
    #[source]
    pub error: Error,
}

impl SyncFailure {
    fn at(phase: Phase) -> impl FnOnce(Error) -> Self {
        move |error| Self { phase, error }
    }
}

/// Counts from a successful account run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Local messages uploaded.
    pub uploaded: usize,
    /// Remote messages stored locally.
    pub downloaded: usize,
    /// Remote folders visited by the pull pass.
    pub folders: usize,
}

/// Connects to the account's server and synchronizes it with `store`.
///
/// # Errors
///
/// Returns the first error together with the phase it happened in.
pub async fn sync_account(
    account: &AccountConfig,
    store: &Maildir,
) -> std::result::Result<SyncReport, SyncFailure> {
    let mut session = Session::connect(account)
        .await
        .map_err(SyncFailure::at(Phase::Connecting))?;
    sync(&mut session, store, &account.folders).await
}

/// Runs the push and pull passes over an open remote and closes it.
///
/// The remote is closed even when a pass fails; a close error is then only
/// logged and the pass error is returned.
///
/// # Errors
///
/// Returns the first error together with the phase it happened in.
pub async fn sync<R: MailRemote>(
    remote: &mut R,
    store: &Maildir,
    selection: &FolderSelection,
) -> std::result::Result<SyncReport, SyncFailure> {
    let result = run_passes(remote, store, selection).await;

    match (result, remote.close().await) {
        (Ok(report), Ok(())) => {
            info!(
                uploaded = report.uploaded,
                downloaded = report.downloaded,
                folders = report.folders,
                "account synchronized"
            );
            Ok(report)
        }
        (Ok(_), Err(error)) => Err(SyncFailure::at(Phase::Closing)(error)),
        (Err(failure), close) => {
            if let Err(error) = close {
                warn!(%error, "close after failed sync");
            }
            Err(failure)
        }
    }
}

async fn run_passes<R: MailRemote>(
    remote: &mut R,
    store: &Maildir,
    selection: &FolderSelection,
) -> std::result::Result<SyncReport, SyncFailure> {
    let mut report = SyncReport::default();
    push(remote, store, selection, &mut report)
        .await
        .map_err(SyncFailure::at(Phase::Pushing))?;
    pull(remote, store, &mut report)
        .await
        .map_err(SyncFailure::at(Phase::Pulling))?;
    Ok(report)
}

/// Uploads every unmarked local message and gives it its final name.
async fn push<R: MailRemote>(
    remote: &mut R,
    store: &Maildir,
    selection: &FolderSelection,
    report: &mut SyncReport,
) -> Result<()> {
    let mut scan = store.scan();

    while let Some(item) = scan.next().await {
        let info = item?;
        if !selection.admits(&info.folder) {
            debug!(folder = %info.folder, "folder not selected, not pushing");
            continue;
        }
        let Some(path) = info.path.as_deref() else {
            continue;
        };

        let body = tokio::fs::read(path).await.map_err(Error::storage(path))?;
        let assigned = remote.upload(&info.folder, &info.flags, &body).await?;
        let info = store
            .rename_message(MessageInfo {
                uid_validity: assigned.uid_validity,
                uid: assigned.uid,
                ..info
            })
            .await?;

        debug!(folder = %info.folder, uid = info.uid, "pushed");
        report.uploaded += 1;
    }

    Ok(())
}

/// Stores every remote message newer than each folder's cursor.
///
/// UIDs that already have a file in `cur/` are not downloaded again; the
/// cursor is moved past them. These are messages pushed while the cursor
/// lagged behind, or stored by a run that stopped before advancing it.
async fn pull<R: MailRemote>(
    remote: &mut R,
    store: &Maildir,
    report: &mut SyncReport,
) -> Result<()> {
    for folder in remote.list_folders().await? {
        store.create_folder(&folder).await?;
        let cursor = store.cursor(&folder).await?;
        let status = remote.examine(&folder).await?;

        if cursor.uid_validity != 0 && cursor.uid_validity != status.uid_validity {
            return Err(Error::Consistency {
                folder,
                local: cursor.uid_validity,
                remote: status.uid_validity,
            });
        }

        let uids = remote.fetch_new_uids(&folder, cursor.last_seen).await?;
        let stored = if uids.is_empty() {
            BTreeSet::new()
        } else {
            store.stored_uids(&folder).await?
        };
        let mut downloaded = 0;

        for uid in uids {
            if stored.contains(&uid) {
                debug!(%folder, uid, "already stored");
                store
                    .advance_cursor(&folder, status.uid_validity, uid)
                    .await?;
                continue;
            }

            let message = remote.fetch_body(&folder, uid).await?;
            let info = MessageInfo::remote(&folder, status.uid_validity, uid, message.flags);
            store.add_message(info, &message.body).await?;
            downloaded += 1;
        }

        if downloaded > 0 {
            info!(%folder, downloaded, "folder pulled");
        }
        report.downloaded += downloaded;
        report.folders += 1;
    }
    Ok(())
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
    use std::collections::BTreeMap;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::flags::{self, MaildirFlags};
    use crate::maildir::{Cursor, MARKER};
    use crate::remote::{RemoteFolder, RemoteMessage, Uploaded};

    #[derive(Debug, Default)]
    struct FakeFolder {
        uid_validity: u32,
        messages: BTreeMap<u32, (MaildirFlags, Vec<u8>)>,
    }

    /// In-memory server.
    #[derive(Debug, Default)]
    struct FakeRemote {
        folders: BTreeMap<String, FakeFolder>,
        uidplus: bool,
        fetched: Vec<(String, u32)>,
        fail_fetch: Option<u32>,
        closed: bool,
    }

    impl FakeRemote {
        fn with_folder(mut self, name: &str, uid_validity: u32, uids: &[u32]) -> Self {
            let messages = uids
                .iter()
                .map(|uid| (*uid, (flags::parse_letters("S"), format!("message {uid}").into_bytes())))
                .collect();
            self.folders.insert(
                name.to_string(),
                FakeFolder {
                    uid_validity,
                    messages,
                },
            );
            self.uidplus = true;
            self
        }

        fn folder(&self, name: &str) -> Result<&FakeFolder> {
            self.folders
                .get(name)
                .ok_or_else(|| Error::Protocol(format!("no folder {name}")))
        }
    }

    impl MailRemote for FakeRemote {
        async fn list_folders(&mut self) -> Result<Vec<String>> {
            Ok(self.folders.keys().cloned().collect())
        }

        async fn examine(&mut self, folder: &str) -> Result<RemoteFolder> {
            let f = self.folder(folder)?;
            Ok(RemoteFolder {
                uid_validity: f.uid_validity,
                exists: u32::try_from(f.messages.len()).unwrap(),
            })
        }

        async fn fetch_new_uids(&mut self, folder: &str, since: u32) -> Result<Vec<u32>> {
            Ok(self
                .folder(folder)?
                .messages
                .keys()
                .copied()
                .filter(|uid| *uid > since)
                .collect())
        }

        async fn fetch_body(&mut self, folder: &str, uid: u32) -> Result<RemoteMessage> {
            if self.fail_fetch == Some(uid) {
                return Err(Error::Protocol(format!("no body for {uid}")));
            }
            let (flags, body) = self
                .folder(folder)?
                .messages
                .get(&uid)
                .cloned()
                .ok_or_else(|| Error::Protocol(format!("no message {uid}")))?;
            self.fetched.push((folder.to_string(), uid));
            Ok(RemoteMessage { flags, body })
        }

        async fn upload(
            &mut self,
            folder: &str,
            flags: &MaildirFlags,
            message: &[u8],
        ) -> Result<Uploaded> {
            if !self.uidplus {
                return Err(Error::MissingCapability("UIDPLUS"));
            }
            let f = self
                .folders
                .get_mut(folder)
                .ok_or_else(|| Error::Protocol(format!("no folder {folder}")))?;
            let uid = f.messages.keys().next_back().copied().unwrap_or(0) + 1;
            f.messages.insert(uid, (flags.clone(), message.to_vec()));
            Ok(Uploaded {
                uid_validity: f.uid_validity,
                uid,
            })
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    async fn store() -> (TempDir, Maildir) {
        let dir = tempfile::tempdir().unwrap();
        let maildir = Maildir::open(dir.path()).await.unwrap();
        (dir, maildir)
    }

    fn cur_files(root: &Path, folder: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root.join(folder).join("cur"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_initial_pull_stores_everything_in_order() {
        let (dir, maildir) = store().await;
        let mut remote = FakeRemote::default().with_folder("INBOX", 42, &[1, 2, 3]);

        let report = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 3);
        assert_eq!(report.uploaded, 0);
        assert_eq!(
            remote.fetched,
            vec![
                ("INBOX".to_string(), 1),
                ("INBOX".to_string(), 2),
                ("INBOX".to_string(), 3)
            ]
        );
        assert_eq!(cur_files(dir.path(), "INBOX").len(), 3);
        assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(42, 3));
        assert!(remote.closed);
    }

    #[tokio::test]
    async fn test_second_pull_is_empty() {
        let (dir, maildir) = store().await;
        let mut remote = FakeRemote::default().with_folder("INBOX", 42, &[1, 2, 3]);
        sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();
        remote.fetched.clear();

        let report = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 0);
        assert!(remote.fetched.is_empty());
        assert_eq!(cur_files(dir.path(), "INBOX").len(), 3);
    }

    #[tokio::test]
    async fn test_cursor_only_moves_forward() {
        let (_dir, maildir) = store().await;
        let mut remote = FakeRemote::default().with_folder("INBOX", 42, &[1, 2]);
        let mut seen = Vec::new();

        for next in [3, 4, 9] {
            sync(&mut remote, &maildir, &FolderSelection::default())
                .await
                .unwrap();
            seen.push(maildir.cursor("INBOX").await.unwrap().last_seen);

            let folder = remote.folders.get_mut("INBOX").unwrap();
            folder.messages.insert(next, (MaildirFlags::new(), b"x".to_vec()));
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(seen, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_validity_change_stops_pull() {
        let (dir, maildir) = store().await;
        maildir.create_folder("INBOX").await.unwrap();
        maildir.advance_cursor("INBOX", 5, 10).await.unwrap();
        let mut remote = FakeRemote::default().with_folder("INBOX", 7, &[1]);

        let failure = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap_err();

        assert_eq!(failure.phase, Phase::Pulling);
        assert!(matches!(
            failure.error,
            Error::Consistency {
                local: 5,
                remote: 7,
                ..
            }
        ));
        assert!(cur_files(dir.path(), "INBOX").is_empty());
        assert!(remote.fetched.is_empty());
        assert!(remote.closed);
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_stored_prefix() {
        let (dir, maildir) = store().await;
        let mut remote = FakeRemote::default().with_folder("INBOX", 42, &[1, 2, 3]);
        remote.fail_fetch = Some(3);

        let failure = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap_err();

        assert_eq!(failure.phase, Phase::Pulling);
        assert_eq!(cur_files(dir.path(), "INBOX").len(), 2);
        assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(42, 2));
    }

    #[tokio::test]
    async fn test_refetch_after_stale_cursor_does_not_duplicate() {
        let (dir, maildir) = store().await;
        let mut remote = FakeRemote::default().with_folder("INBOX", 42, &[1, 2]);
        sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();

        // A crash between storing UID 2 and advancing the cursor.
        std::fs::write(dir.path().join("INBOX/.cursor"), "42\n1\n").unwrap();
        remote.fetched.clear();

        let report = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 0);
        assert!(remote.fetched.is_empty());
        let names = cur_files(dir.path(), "INBOX");
        assert_eq!(names.len(), 2);
        assert_eq!(names.iter().filter(|n| n.contains(",U=2:")).count(), 1);
        assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(42, 2));
    }

    #[tokio::test]
    async fn test_push_uploads_and_marks() {
        let (dir, maildir) = store().await;
        maildir.create_folder("INBOX").await.unwrap();
        std::fs::write(dir.path().join("INBOX/cur/draft"), b"Subject: hi\r\n\r\n").unwrap();

        let mut remote = FakeRemote::default().with_folder("INBOX", 42, &[1, 2, 3, 4, 5, 6]);
        let report = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();

        assert_eq!(report.uploaded, 1);
        let names = cur_files(dir.path(), "INBOX");
        assert_eq!(names.len(), 7);
        let pushed: Vec<_> = names.iter().filter(|n| n.contains(",U=7:2,")).collect();
        assert_eq!(pushed.len(), 1);
        assert!(pushed[0].contains(MARKER));
        assert!(!names.contains(&"draft".to_string()));

        // The uploaded message is not downloaded again.
        assert_eq!(remote.fetched.len(), 6);
        assert!(!remote.fetched.contains(&("INBOX".to_string(), 7)));
        assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(42, 7));

        remote.fetched.clear();
        let report = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();
        assert_eq!(report, SyncReport { uploaded: 0, downloaded: 0, folders: 1 });
    }

    #[tokio::test]
    async fn test_pushed_message_survives_failed_pull() {
        let (dir, maildir) = store().await;
        maildir.create_folder("INBOX").await.unwrap();
        std::fs::write(dir.path().join("INBOX/cur/draft"), b"Subject: hi\r\n\r\n").unwrap();
        let mut remote = FakeRemote::default().with_folder("INBOX", 42, &[1, 2, 3, 4, 5, 6]);
        remote.fail_fetch = Some(1);

        let failure = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap_err();
        assert_eq!(failure.phase, Phase::Pulling);
        assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::default());

        remote.fail_fetch = None;
        let report = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();

        assert_eq!(report.downloaded, 6);
        assert!(!remote.fetched.contains(&("INBOX".to_string(), 7)));
        let names = cur_files(dir.path(), "INBOX");
        assert_eq!(names.len(), 7);
        assert_eq!(names.iter().filter(|n| n.contains(",U=7:2,")).count(), 1);
        assert_eq!(maildir.cursor("INBOX").await.unwrap(), Cursor::new(42, 7));
    }

    #[tokio::test]
    async fn test_push_into_synchronized_folder_advances_cursor() {
        let (dir, maildir) = store().await;
        let mut remote = FakeRemote::default().with_folder("Sent", 9, &[]);
        maildir.create_folder("Sent").await.unwrap();
        std::fs::write(dir.path().join("Sent/cur/new-mail:2,S"), b"x").unwrap();

        sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap();

        assert_eq!(maildir.cursor("Sent").await.unwrap(), Cursor::new(9, 1));
        let (flags, body) = &remote.folders["Sent"].messages[&1];
        assert_eq!(flags::letters(flags), "S");
        assert_eq!(body, b"x");
        assert!(remote.fetched.is_empty());
    }

    #[tokio::test]
    async fn test_push_skips_unselected_folders() {
        let (dir, maildir) = store().await;
        maildir.create_folder("Drafts").await.unwrap();
        std::fs::write(dir.path().join("Drafts/cur/wip"), b"x").unwrap();
        let mut remote = FakeRemote::default().with_folder("INBOX", 1, &[]);
        let selection = FolderSelection {
            exclude: ["Drafts".to_string()].into_iter().collect(),
            ..FolderSelection::default()
        };

        let report = sync(&mut remote, &maildir, &selection).await.unwrap();

        assert_eq!(report.uploaded, 0);
        assert_eq!(cur_files(dir.path(), "Drafts"), vec!["wip"]);
    }

    #[tokio::test]
    async fn test_push_without_uidplus_fails() {
        let (dir, maildir) = store().await;
        maildir.create_folder("INBOX").await.unwrap();
        std::fs::write(dir.path().join("INBOX/cur/draft"), b"x").unwrap();
        let mut remote = FakeRemote::default().with_folder("INBOX", 1, &[1]);
        remote.uidplus = false;

        let failure = sync(&mut remote, &maildir, &FolderSelection::default())
            .await
            .unwrap_err();

        assert_eq!(failure.phase, Phase::Pushing);
        assert!(matches!(failure.error, Error::MissingCapability(_)));
        assert!(remote.fetched.is_empty());
        assert_eq!(cur_files(dir.path(), "INBOX"), vec!["draft"]);
    }

    #[test]
    fn test_failure_display() {
        let failure = SyncFailure {
            phase: Phase::Connecting,
            error: Error::Config("server is not set".to_string()),
        };
        assert_eq!(
            failure.to_string(),
            "connect failed: Configuration error: server is not set"
        );
    }
}
