//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mdsync_imap::{
    AppendUid, Client, Error, FetchAttribute, FetchItems, Flag, Uid, UidSet, UidValidity,
};

/// Mock stream that replays a scripted server transcript.
struct MockStream {
    /// Server output, returned in order regardless of what the client sends.
    responses: Cursor<Vec<u8>>,
    /// Everything the client wrote.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.responses.position()).unwrap_or(usize::MAX);
        let data = self.responses.get_ref();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let to_read = (data.len() - pos).min(buf.remaining());
        buf.put_slice(&data[pos..pos + to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&sent.lock().unwrap()).into_owned()
}

#[tokio::test]
async fn test_pull_session_flow() {
    let transcript = concat!(
        "* OK [CAPABILITY IMAP4rev1 UIDPLUS] ready\r\n",
        "A0000 OK Logged in\r\n",
        "* CAPABILITY IMAP4rev1 UIDPLUS\r\n",
        "A0001 OK done\r\n",
        "* LIST (\\HasNoChildren) \"/\" INBOX\r\n",
        "* LIST (\\Noselect) \"/\" Archive\r\n",
        "A0002 OK LIST done\r\n",
        "* 2 EXISTS\r\n",
        "* OK [UIDVALIDITY 42] ok\r\n",
        "A0003 OK [READ-ONLY] done\r\n",
        "* 1 FETCH (UID 3)\r\n",
        "* 2 FETCH (UID 4)\r\n",
        "A0004 OK fetch done\r\n",
        "* 2 FETCH (UID 4 FLAGS (\\Seen) BODY[] {19}\r\nSubject: hi\r\n\r\nyo\r\n)\r\n",
        "A0005 OK fetch done\r\n",
        "A0006 OK closed\r\n",
        "* BYE logging out\r\n",
        "A0007 OK bye\r\n",
    );
    let (stream, sent) = MockStream::new(transcript.as_bytes());

    let client = Client::from_stream(stream).await.unwrap();
    let mut client = client.login("me@example.com", "hunter 2").await.unwrap();
    assert!(client.supports_uidplus());

    let folders = client.list("", "*").await.unwrap();
    let selectable: Vec<_> = folders.iter().filter(|f| f.is_selectable()).collect();
    assert_eq!(selectable.len(), 1);

    let (mut selected, status) = client.examine("INBOX").await.unwrap();
    assert_eq!(status.exists, 2);
    assert_eq!(status.uid_validity, UidValidity::new(42));

    let uids: Vec<Uid> = selected
        .uid_fetch(
            &UidSet::after(2).unwrap(),
            FetchItems::Items(vec![FetchAttribute::Uid]),
        )
        .await
        .unwrap()
        .collect()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|m| m.uid)
        .collect();
    assert_eq!(uids, vec![Uid::new(3).unwrap(), Uid::new(4).unwrap()]);

    let mut fetch = selected
        .uid_fetch(
            &UidSet::single(Uid::new(4).unwrap()),
            FetchItems::Items(vec![
                FetchAttribute::Uid,
                FetchAttribute::Flags,
                FetchAttribute::full_body_peek(),
            ]),
        )
        .await
        .unwrap();
    let message = fetch.next().await.unwrap().unwrap();
    assert!(fetch.next().await.is_none());
    assert!(message.flags.unwrap().is_seen());
    assert_eq!(message.body.unwrap(), b"Subject: hi\r\n\r\nyo\r\n");

    let mut client = selected.close().await.unwrap();
    client.logout().await.unwrap();
    client.shutdown().await.unwrap();

    let sent = sent_text(&sent);
    assert!(sent.contains("A0000 LOGIN \"me@example.com\" \"hunter 2\"\r\n"));
    assert!(sent.contains("A0003 EXAMINE INBOX\r\n"));
    assert!(sent.contains("A0004 UID FETCH 3:4294967295 UID\r\n"));
    assert!(sent.contains("A0005 UID FETCH 4 (UID FLAGS BODY.PEEK[])\r\n"));
    assert!(sent.contains("A0006 CLOSE\r\n"));
    assert!(sent.ends_with("A0007 LOGOUT\r\n"));
}

#[tokio::test]
async fn test_push_session_flow() {
    let transcript = concat!(
        "* OK [CAPABILITY IMAP4rev1 UIDPLUS] ready\r\n",
        "A0000 OK [CAPABILITY IMAP4rev1 UIDPLUS] Logged in\r\n",
        "+ Ready for literal data\r\n",
        "A0001 OK [APPENDUID 42 7] APPEND completed\r\n",
    );
    let (stream, sent) = MockStream::new(transcript.as_bytes());

    let client = Client::from_stream(stream).await.unwrap();
    let mut client = client.login("me", "pw").await.unwrap();

    let assigned = client
        .append("INBOX", &[Flag::Seen, Flag::Forwarded], None, b"Subject: x\r\n\r\nbody\r\n")
        .await
        .unwrap();
    assert_eq!(
        assigned,
        Some(AppendUid {
            uid_validity: UidValidity::new(42).unwrap(),
            uid: Uid::new(7).unwrap(),
        })
    );

    let sent = sent_text(&sent);
    assert!(sent.contains(
        "A0001 APPEND INBOX (\\Seen $Forwarded) {20}\r\nSubject: x\r\n\r\nbody\r\n\r\n"
    ));
}

#[tokio::test]
async fn test_fetch_rejection_reaches_consumer() {
    let transcript = concat!(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        "A0000 OK [CAPABILITY IMAP4rev1] Logged in\r\n",
        "* 1 EXISTS\r\n",
        "* OK [UIDVALIDITY 9] ok\r\n",
        "A0001 OK [READ-ONLY] done\r\n",
        "A0002 BAD [SERVERBUG] internal error\r\n",
    );
    let (stream, _sent) = MockStream::new(transcript.as_bytes());

    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("me", "pw").await.unwrap();
    let (mut selected, _) = client.examine("INBOX").await.unwrap();

    let mut fetch = selected
        .uid_fetch(
            &UidSet::after(0).unwrap(),
            FetchItems::Items(vec![FetchAttribute::Uid]),
        )
        .await
        .unwrap();
    assert!(matches!(fetch.next().await, Some(Err(Error::Bad(_)))));
    assert!(fetch.next().await.is_none());
}

#[tokio::test]
async fn test_connection_drop_is_io_error() {
    let transcript = "* OK [CAPABILITY IMAP4rev1] ready\r\n";
    let (stream, _sent) = MockStream::new(transcript.as_bytes());

    let client = Client::from_stream(stream).await.unwrap();
    let result = client.login("me", "pw").await;
    assert!(matches!(result, Err(Error::Io(_))));
}
