//! Implementation for the not-authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::connection::stream::ImapStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{ResponseCode, Status};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it advertises.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_framed(FramedStream::new(stream)).await
    }

    /// Creates a new client from an already framed stream, which lets the
    /// caller set a read timeout first.
    pub async fn from_framed(mut framed: FramedStream<S>) -> Result<Self> {
        let greeting = framed.read_response().await?;

        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Condition { status, code, text }) => {
                match status {
                    Status::Ok | Status::PreAuth => {}
                    Status::Bye => return Err(Error::Bye(text)),
                    Status::No | Status::Bad => {
                        return Err(Error::Protocol(format!("unexpected greeting: {text}")));
                    }
                }
                match code {
                    Some(ResponseCode::Capability(caps)) => caps,
                    _ => Vec::new(),
                }
            }
            other => return Err(Error::Protocol(format!("unexpected greeting: {other:?}"))),
        };
        debug!(capabilities = capabilities.len(), "greeting received");

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success. The
    /// capability list is refreshed, since servers commonly advertise more
    /// once the user is known.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.login_disabled() {
            return Err(Error::InvalidState(
                "server advertises LOGINDISABLED on this connection".to_string(),
            ));
        }

        self.capabilities.clear();
        self.execute(&Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;

        let mut client = self.into_state(Authenticated);
        if client.capabilities.is_empty() {
            client.capability().await?;
        }
        Ok(client)
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Upgrades the connection with STARTTLS.
    ///
    /// Capabilities learned before the upgrade are discarded and queried
    /// again over the encrypted channel.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        self.execute(&Command::StartTls).await?;

        let read_timeout = self.stream.read_timeout();
        let tls = self.stream.into_inner().upgrade_to_tls(host).await?;
        let mut framed = FramedStream::new(tls);
        if let Some(timeout) = read_timeout {
            framed = framed.with_read_timeout(timeout);
        }

        let mut client = Self {
            stream: framed,
            tag_gen: self.tag_gen,
            capabilities: Vec::new(),
            state: NotAuthenticated,
        };
        client.capability().await?;
        Ok(client)
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
    use crate::types::Capability;

    #[tokio::test]
    async fn test_greeting_capabilities() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] ready\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        assert!(client.has_capability(&Capability::StartTls));
        assert!(client.login_disabled());
    }

    #[tokio::test]
    async fn test_greeting_bye() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();

        let result = Client::from_stream(mock).await;
        assert!(matches!(result, Err(Error::Bye(text)) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_login_disabled_refused_locally() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 LOGINDISABLED] ready\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let result = client.login("user", "secret").await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_login_uses_capabilities_from_tagged_ok() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1] ready\r\n")
            .write(b"A0000 LOGIN \"user\" \"secret\"\r\n")
            .read(b"A0000 OK [CAPABILITY IMAP4rev1 UIDPLUS] Logged in\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        assert!(!client.supports_uidplus());

        let client = client.login("user", "secret").await.unwrap();
        assert!(client.supports_uidplus());
    }

    #[tokio::test]
    async fn test_login_queries_capabilities_when_absent() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN \"user\" \"secret\"\r\n")
            .read(b"A0000 OK Logged in\r\n")
            .write(b"A0001 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 UIDPLUS\r\n")
            .read(b"A0001 OK done\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let client = client.login("user", "secret").await.unwrap();
        assert!(client.supports_uidplus());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN \"user\" \"wrong\"\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap();
        let result = client.login("user", "wrong").await;
        assert!(matches!(result, Err(Error::No(text)) if text == "Invalid credentials"));
    }
}
