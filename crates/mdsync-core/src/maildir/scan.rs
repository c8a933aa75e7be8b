//! Streaming scan for messages that were never uploaded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::debug;

use super::filename;
use crate::message::MessageInfo;
use crate::{Error, Result};

/// How many scanned messages may wait for the consumer.
const SCAN_BUFFER: usize = 100;

/// Receiving end of a scan.
///
/// The directory walk runs on a blocking thread and stops early when this
/// value is dropped.
#[derive(Debug)]
pub struct Scan {
    rx: mpsc::Receiver<Result<MessageInfo>>,
}

impl Scan {
    pub(super) fn start(root: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel(SCAN_BUFFER);
        tokio::task::spawn_blocking(move || walk(&root, &tx));
        Self { rx }
    }

    /// Returns the next unsynchronized message, or `None` when the walk is done.
    pub async fn next(&mut self) -> Option<Result<MessageInfo>> {
        self.rx.recv().await
    }
}

type Sender = mpsc::Sender<Result<MessageInfo>>;

fn walk(root: &Path, tx: &Sender) {
    let folders = match folder_names(root) {
        Ok(folders) => folders,
        Err(e) => {
            let _ = tx.blocking_send(Err(Error::storage(root)(e)));
            return;
        }
    };

    for (name, path) in folders {
        if filename::is_hidden(&name) || !path.is_dir() {
            continue;
        }
        let cur = path.join("cur");
        if !cur.is_dir() {
            debug!(folder = %name, "no cur directory, skipping");
            continue;
        }
        if !walk_folder(&name, &cur, tx) {
            return;
        }
    }
}

/// Sends every unmarked message of one folder as it is read from `cur/`.
/// Returns false once the consumer has gone away.
///
/// Files the consumer renames during the walk carry the marker afterwards,
/// so they are skipped if the listing reaches them again.
fn walk_folder(folder: &str, cur: &Path, tx: &Sender) -> bool {
    let entries = match fs::read_dir(cur) {
        Ok(entries) => entries,
        Err(e) => return tx.blocking_send(Err(Error::storage(cur)(e))).is_ok(),
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return tx.blocking_send(Err(Error::storage(cur)(e))).is_ok(),
        };
        // Names that are not UTF-8 cannot be uploaded under a parsed name.
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let path = entry.path();
        if filename::is_hidden(&name) || filename::has_marker(&name) || !path.is_file() {
            continue;
        }
        let info = MessageInfo {
            folder: folder.to_string(),
            flags: filename::parse_flags(&name),
            path: Some(path),
            ..MessageInfo::default()
        };
        if tx.blocking_send(Ok(info)).is_err() {
            return false;
        }
    }
    true
}

/// Lists the folder directories of the root in name order.
fn folder_names(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // Names that are not UTF-8 cannot be mapped to IMAP folders.
        if let Ok(name) = entry.file_name().into_string() {
            entries.push((name, entry.path()));
        }
    }
    entries.sort();
    Ok(entries)
}
