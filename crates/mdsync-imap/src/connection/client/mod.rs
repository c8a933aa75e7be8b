//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful EXAMINE
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, ResponseAccumulator};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) state: State,
}

impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// What a completed command left behind: its untagged data and the response
/// code of its tagged `OK`.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    pub(crate) untagged: Vec<UntaggedResponse>,
    pub(crate) code: Option<ResponseCode>,
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server supports UIDPLUS (RFC 4315).
    #[must_use]
    pub fn supports_uidplus(&self) -> bool {
        self.has_capability(&Capability::UidPlus)
    }

    /// Returns true if LOGIN is disabled (e.g., before STARTTLS).
    #[must_use]
    pub fn login_disabled(&self) -> bool {
        self.has_capability(&Capability::LoginDisabled)
    }

    /// Sends a CAPABILITY command and replaces the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        self.capabilities.clear();
        self.execute(&Command::Capability).await?;
        Ok(self.capabilities.clone())
    }

    /// Sends LOGOUT and waits for the server to acknowledge it.
    ///
    /// The transport stays open; see [`Client::shutdown`].
    pub async fn logout(&mut self) -> Result<()> {
        self.execute(&Command::Logout).await.map(drop)
    }

    /// Closes the transport.
    pub async fn shutdown(mut self) -> Result<()> {
        self.stream.shutdown().await
    }

    /// Moves the connection into another state.
    pub(crate) fn into_state<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state,
        }
    }

    /// Tags and writes a command, returning its tag.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<String> {
        let tag = self.tag_gen.next();
        debug!(%tag, command = command.name(), "sending");
        self.stream.write_command(&command.serialize(&tag)).await?;
        Ok(tag)
    }

    /// Sends a command and waits for its successful completion.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.send(command).await?;
        self.finish(&tag).await
    }

    /// Reads up to the tagged response for `tag` and checks its status.
    ///
    /// Capability data seen on the way replaces the stored capabilities.
    pub(crate) async fn finish(&mut self, tag: &str) -> Result<Completion> {
        let responses = ResponseAccumulator::new(tag)
            .read_until_tagged(&mut self.stream)
            .await?;
        let mut completion = Completion::default();

        for raw in &responses {
            match ResponseParser::parse(raw) {
                Ok(Response::Tagged {
                    tag: done,
                    status,
                    code,
                    text,
                }) if done.as_str() == tag => {
                    debug!(%tag, ?status, "completed");
                    if let Some(ResponseCode::Capability(caps)) = &code {
                        self.capabilities.clone_from(caps);
                    }
                    Error::check_completion(status, text)?;
                    completion.code = code;
                    return Ok(completion);
                }
                Ok(Response::Untagged(UntaggedResponse::Capability(caps))) => {
                    self.capabilities = caps;
                }
                Ok(Response::Untagged(untagged)) => {
                    if let Some(ResponseCode::Capability(caps)) = untagged.code() {
                        self.capabilities.clone_from(caps);
                    }
                    completion.untagged.push(untagged);
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unparseable response"),
            }
        }

        Err(Error::Protocol(format!("missing tagged response for {tag}")))
    }
}
