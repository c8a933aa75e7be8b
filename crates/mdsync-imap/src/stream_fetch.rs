//! Streaming UID FETCH.
//!
//! A [`FetchStream`] yields each message as soon as its `FETCH` response has
//! been read, so a consumer can start storing bodies before the server has
//! sent the rest. The command's tagged completion is checked after the last
//! message; a `NO`/`BAD` arriving late still reaches the consumer as a final
//! `Err` item.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::connection::FramedStream;
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{Flags, SeqNum, Uid};
use crate::{Error, Result};

/// One message from a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number.
    pub seq: SeqNum,
    /// UID, if the server sent one.
    pub uid: Option<Uid>,
    /// Flags, if requested.
    pub flags: Option<Flags>,
    /// Full message body (`BODY[]`), if requested.
    pub body: Option<Vec<u8>>,
    /// RFC822 size, if requested.
    pub size: Option<u32>,
}

impl FetchedMessage {
    /// Collects the items of one FETCH response.
    ///
    /// Only the whole-message body section is kept as `body`.
    #[must_use]
    pub fn from_items(seq: SeqNum, items: Vec<FetchItem>) -> Self {
        let mut message = Self {
            seq,
            uid: None,
            flags: None,
            body: None,
            size: None,
        };

        for item in items {
            match item {
                FetchItem::Uid(uid) => message.uid = Some(uid),
                FetchItem::Flags(flags) => message.flags = Some(flags),
                FetchItem::Rfc822Size(size) => message.size = Some(size),
                FetchItem::Body {
                    section: None,
                    data,
                } => message.body = data,
                FetchItem::Body { .. } | FetchItem::InternalDate(_) => {}
            }
        }

        message
    }
}

/// Pull-based stream over the results of one UID FETCH command.
pub struct FetchStream<'a, S> {
    stream: &'a mut FramedStream<S>,
    tag: String,
    done: bool,
}

impl<'a, S> FetchStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) const fn new(stream: &'a mut FramedStream<S>, tag: String) -> Self {
        Self {
            stream,
            tag,
            done: false,
        }
    }

    /// Returns the next message, or `None` once the command has completed.
    ///
    /// A failed completion or a transport error is returned once as
    /// `Some(Err(_))`, after which the stream is exhausted.
    pub async fn next(&mut self) -> Option<Result<FetchedMessage>> {
        if self.done {
            return None;
        }

        loop {
            let raw = match self.stream.read_response().await {
                Ok(raw) => raw,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match ResponseParser::parse(&raw) {
                Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) => {
                    return Some(Ok(FetchedMessage::from_items(seq, items)));
                }
                Ok(Response::Tagged {
                    tag, status, text, ..
                }) if tag.as_str() == self.tag => {
                    self.done = true;
                    debug!(tag = %self.tag, ?status, "fetch completed");
                    return Error::check_completion(status, text).err().map(Err);
                }
                Ok(_) => {}
                // Skipping an unreadable FETCH would silently lose a message.
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }

    /// Drives the command to completion, discarding remaining messages.
    ///
    /// # Errors
    ///
    /// Returns the first error the stream reports.
    pub async fn finish(mut self) -> Result<()> {
        while let Some(item) = self.next().await {
            item?;
        }
        Ok(())
    }

    /// Collects every remaining message.
    ///
    /// # Errors
    ///
    /// Returns the first error the stream reports.
    pub async fn collect(mut self) -> Result<Vec<FetchedMessage>> {
        let mut messages = Vec::new();
        while let Some(item) = self.next().await {
            messages.push(item?);
        }
        Ok(messages)
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
    use tokio_test::io::Builder;

    use super::*;
    use crate::types::Flag;

    #[test]
    fn test_from_items_keeps_whole_body_only() {
        let message = FetchedMessage::from_items(
            SeqNum::new(1).unwrap(),
            vec![
                FetchItem::Uid(Uid::new(100).unwrap()),
                FetchItem::Body {
                    section: Some("HEADER".to_string()),
                    data: Some(b"Subject: x\r\n".to_vec()),
                },
                FetchItem::Flags([Flag::Seen].into_iter().collect()),
            ],
        );

        assert_eq!(message.uid, Uid::new(100));
        assert!(message.body.is_none());
        assert!(message.flags.unwrap().is_seen());
    }

    #[tokio::test]
    async fn test_stream_yields_then_completes() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 5)\r\n")
            .read(b"* 2 FETCH (UID 6)\r\n")
            .read(b"A0007 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        let mut fetch = FetchStream::new(&mut framed, "A0007".to_string());

        assert_eq!(fetch.next().await.unwrap().unwrap().uid, Uid::new(5));
        assert_eq!(fetch.next().await.unwrap().unwrap().uid, Uid::new(6));
        assert!(fetch.next().await.is_none());
        assert!(fetch.next().await.is_none());
    }

    #[tokio::test]
    async fn test_late_rejection_surfaces_after_messages() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (UID 5)\r\n")
            .read(b"A0003 NO some messages could not be fetched\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        let mut fetch = FetchStream::new(&mut framed, "A0003".to_string());

        assert!(fetch.next().await.unwrap().is_ok());
        assert!(matches!(fetch.next().await, Some(Err(Error::No(_)))));
        assert!(fetch.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unsolicited_data_is_skipped() {
        let mock = Builder::new()
            .read(b"* 4 EXISTS\r\n")
            .read(b"* 1 FETCH (UID 5 BODY[] {3}\r\nabc)\r\n")
            .read(b"A0001 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        let fetch = FetchStream::new(&mut framed, "A0001".to_string());

        let messages = fetch.collect().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body.as_deref(), Some(&b"abc"[..]));
    }
}
