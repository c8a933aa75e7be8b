//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines with support for literals. A "response"
//! here is one line plus every literal it announces and the line
//! continuations after them, which is the unit the parser works on.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MiB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MiB

/// Literals are read in chunks so the read timeout applies to progress, not
/// to the whole transfer.
const LITERAL_CHUNK: usize = 64 * 1024;

/// Framed connection for IMAP protocol.
///
/// Handles line-based reading with literal support and buffered writing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
    read_timeout: Option<Duration>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream without a read timeout.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            read_timeout: None,
        }
    }

    /// Bounds every read from the server by `timeout`.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Returns the configured read timeout.
    pub const fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Reads one complete response, literals included.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(literal_len) = parse_literal_length(&line) else {
                break;
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }

            let start = response.len();
            response.resize(start + literal_len, 0);
            for chunk in response[start..].chunks_mut(LITERAL_CHUNK) {
                within(self.read_timeout, self.reader.read_exact(chunk)).await?;
            }
        }

        Ok(response)
    }

    /// Reads a single line up to and including its LF.
    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = within(self.read_timeout, self.reader.fill_buf()).await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&buf[..=pos]);
                self.reader.consume(pos + 1);
                return Ok(line);
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes a serialized command and flushes it.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(data);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Writes raw data (literal payloads) and flushes it.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Shuts down the write half of the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Buffered but unread data is lost, which is what STARTTLS requires.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

/// Runs one I/O step, mapping an elapsed deadline to [`Error::Timeout`].
async fn within<T>(
    timeout: Option<Duration>,
    step: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, step)
            .await
            .map_err(|_| Error::Timeout(limit))?
            .map_err(Error::from),
        None => step.await.map_err(Error::from),
    }
}

/// Parses a literal length from the end of a line.
///
/// Matches `{123}\r\n` and the non-synchronizing `{123+}\r\n`.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Returns true if `response` is the tagged completion for `tag`.
#[must_use]
pub fn is_tagged_response(response: &[u8], tag: &str) -> bool {
    response
        .strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}

/// Collects the responses of one command up to its tagged completion.
pub struct ResponseAccumulator {
    tag: String,
    responses: Vec<Vec<u8>>,
}

impl ResponseAccumulator {
    /// Creates a new response accumulator for the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            responses: Vec::new(),
        }
    }

    /// Reads responses until the tagged response for our tag arrives.
    ///
    /// The tagged response is the last element of the returned list.
    pub async fn read_until_tagged<S>(
        &mut self,
        framed: &mut FramedStream<S>,
    ) -> Result<Vec<Vec<u8>>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let response = framed.read_response().await?;
            let done = is_tagged_response(&response, &self.tag);
            self.responses.push(response);
            if done {
                return Ok(std::mem::take(&mut self.responses));
            }
        }
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

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY[] {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY[] {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(parse_literal_length(b"empty {}\r\n"), None);
    }

    #[test]
    fn test_is_tagged_response() {
        assert!(is_tagged_response(b"A0001 OK done\r\n", "A0001"));
        assert!(!is_tagged_response(b"A00011 OK done\r\n", "A0001"));
        assert!(!is_tagged_response(b"* OK done\r\n", "A0001"));
    }

    #[tokio::test]
    async fn test_framed_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_framed_read_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {7}\r\n")
            .read(b"a\r\nb")
            .read(b"cd)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[] {7}\r\na\r\nbcd)\r\n");
    }

    #[tokio::test]
    async fn test_framed_write_command() {
        let mock = Builder::new().write(b"A0001 CAPABILITY\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_command(b"A0001 CAPABILITY\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_response_accumulator() {
        let mock = Builder::new()
            .read(b"* CAPABILITY IMAP4rev1 UIDPLUS\r\n")
            .read(b"A0001 OK Success\r\n")
            .build();

        let mut framed = FramedStream::new(mock);
        let mut accumulator = ResponseAccumulator::new("A0001");

        let responses = accumulator.read_until_tagged(&mut framed).await.unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1], b"A0001 OK Success\r\n");
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }

    #[tokio::test]
    async fn test_eof_is_io_error() {
        let mock = Builder::new().build();
        let mut framed = FramedStream::new(mock);

        assert!(matches!(framed.read_response().await, Err(Error::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let mock = Builder::new().wait(Duration::from_secs(120)).build();
        let mut framed = FramedStream::new(mock).with_read_timeout(Duration::from_secs(60));

        let result = framed.read_response().await;
        assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_secs(60)));
    }
}
