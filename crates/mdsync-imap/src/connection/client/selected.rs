//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::{Command, FetchItems};
use crate::stream_fetch::FetchStream;
use crate::types::UidSet;

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox and its status at selection time.
    #[must_use]
    pub const fn selected(&self) -> &Selected {
        &self.state
    }

    /// Closes the current mailbox and returns to authenticated state.
    ///
    /// The mailbox was opened with EXAMINE, so nothing is expunged.
    pub async fn close(mut self) -> Result<Client<S, Authenticated>> {
        self.execute(&Command::Close).await?;
        Ok(self.into_state(Authenticated))
    }

    /// Starts a UID FETCH and returns a stream over its results.
    ///
    /// Messages are yielded as the server sends them. The stream must be
    /// driven to its end (or [`FetchStream::finish`]ed) before the client
    /// is used again.
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        items: FetchItems,
    ) -> Result<FetchStream<'_, S>> {
        let tag = self
            .send(&Command::UidFetch {
                uids: uids.clone(),
                items,
            })
            .await?;
        Ok(FetchStream::new(&mut self.stream, tag))
    }
}
