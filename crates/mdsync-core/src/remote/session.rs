//! One authenticated IMAP connection for one account.

use mdsync_imap::{
    Authenticated, Client, Config as ImapConfig, FetchAttribute, FetchItems, FramedStream,
    ImapStream, Security, Selected, Uid, UidSet,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::{MailRemote, RemoteFolder, RemoteMessage, Uploaded, resolve_password};
use crate::config::{AccountConfig, FolderSelection};
use crate::flags::{self, MaildirFlags};
use crate::{Error, Result};

/// Where the connection is in the IMAP state machine.
enum State<S> {
    Authenticated(Client<S, Authenticated>),
    Selected {
        folder: String,
        client: Client<S, Selected>,
    },
    Closed,
}

/// An authenticated IMAP session.
///
/// Folders are opened with EXAMINE and stay open until a different folder or
/// an authenticated-state command is needed.
pub struct Session<S = ImapStream> {
    state: State<S>,
    selection: FolderSelection,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Authenticated(_) => "authenticated",
            State::Selected { folder, .. } => folder.as_str(),
            State::Closed => "closed",
        };
        f.debug_struct("Session")
            .field("state", &state)
            .field("selection", &self.selection)
            .finish()
    }
}

impl Session<ImapStream> {
    /// Connects and logs in to the account's server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the server, username or password is
    /// missing, [`Error::Connection`] if the server cannot be reached or the
    /// TLS setup fails, and [`Error::Auth`] if LOGIN is rejected.
    pub async fn connect(account: &AccountConfig) -> Result<Self> {
        if account.server.is_empty() {
            return Err(Error::Config("server is not set".to_string()));
        }
        if account.username.is_empty() {
            return Err(Error::Config("username is not set".to_string()));
        }
        let password = resolve_password(account).await?;

        let config = ImapConfig::builder(&account.server)
            .port(account.port)
            .security(account.security())
            .build();
        let connection_error = |source: mdsync_imap::Error| Error::Connection {
            host: config.host.clone(),
            source,
        };

        debug!(host = %config.host, port = config.port, security = ?config.security, "connecting");
        let stream = config.connect().await.map_err(connection_error)?;
        let framed = FramedStream::new(stream).with_read_timeout(config.io_timeout);
        let mut client = Client::from_framed(framed)
            .await
            .map_err(connection_error)?;
        if config.security == Security::StartTls {
            client = client
                .starttls(&config.host)
                .await
                .map_err(connection_error)?;
        }

        let client = client
            .login(&account.username, &password)
            .await
            .map_err(|source| Error::Auth {
                username: account.username.clone(),
                source,
            })?;
        info!(host = %config.host, username = %account.username, "logged in");

        Ok(Self::new(client, account.folders.clone()))
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already authenticated client.
    #[must_use]
    pub const fn new(client: Client<S, Authenticated>, selection: FolderSelection) -> Self {
        Self {
            state: State::Authenticated(client),
            selection,
        }
    }

    /// Returns the client in authenticated state, closing an open folder.
    async fn authenticated(&mut self) -> Result<&mut Client<S, Authenticated>> {
        self.state = match std::mem::replace(&mut self.state, State::Closed) {
            State::Selected { folder, client } => {
                debug!(%folder, "closing folder");
                State::Authenticated(client.close().await?)
            }
            other => other,
        };

        match &mut self.state {
            State::Authenticated(client) => Ok(client),
            _ => Err(closed()),
        }
    }

    /// Returns the client with `folder` examined.
    async fn select(&mut self, folder: &str) -> Result<&mut Client<S, Selected>> {
        let open = matches!(&self.state, State::Selected { folder: current, .. } if current == folder);
        if !open {
            self.authenticated().await?;
            let State::Authenticated(client) = std::mem::replace(&mut self.state, State::Closed)
            else {
                return Err(closed());
            };
            let (client, status) = client.examine(folder).await?;
            debug!(folder, exists = status.exists, "folder examined");
            self.state = State::Selected {
                folder: folder.to_string(),
                client,
            };
        }

        match &mut self.state {
            State::Selected { client, .. } => Ok(client),
            _ => Err(closed()),
        }
    }
}

fn closed() -> Error {
    Error::Protocol("session is closed".to_string())
}

async fn log_out<S, St>(mut client: Client<S, St>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let logout = client.logout().await;
    let shutdown = client.shutdown().await;
    logout?;
    shutdown?;
    Ok(())
}

impl<S> MailRemote for Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn list_folders(&mut self) -> Result<Vec<String>> {
        let listed = self.authenticated().await?.list("", "*").await?;

        let names: Vec<String> = listed
            .iter()
            .map(|item| item.mailbox.as_str().to_string())
            .collect();
        let missing = self.selection.missing(&names);
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "folders not found on the server: {}",
                missing.join(", ")
            )));
        }

        let folders: Vec<String> = listed
            .into_iter()
            .filter(|item| {
                let name = item.mailbox.as_str();
                (item.is_selectable() || self.selection.explicitly_includes(name))
                    && self.selection.admits(name)
            })
            .map(|item| item.mailbox.0)
            .collect();
        debug!(listed = names.len(), selected = folders.len(), "folders listed");
        Ok(folders)
    }

    async fn examine(&mut self, folder: &str) -> Result<RemoteFolder> {
        let client = self.select(folder).await?;
        let status = client.selected().status();
        let uid_validity = status
            .uid_validity
            .ok_or_else(|| Error::Protocol(format!("no UIDVALIDITY for folder {folder}")))?;

        Ok(RemoteFolder {
            uid_validity: uid_validity.get(),
            exists: status.exists,
        })
    }

    async fn fetch_new_uids(&mut self, folder: &str, since: u32) -> Result<Vec<u32>> {
        let client = self.select(folder).await?;
        if client.selected().status().exists == 0 {
            return Ok(Vec::new());
        }
        let Some(range) = UidSet::after(since) else {
            return Ok(Vec::new());
        };

        let messages = client
            .uid_fetch(&range, FetchItems::Items(vec![FetchAttribute::Uid]))
            .await?
            .collect()
            .await?;

        let mut uids = Vec::with_capacity(messages.len());
        for message in messages {
            let uid = message.uid.ok_or_else(|| {
                Error::Protocol(format!(
                    "FETCH of message {} in {folder} carried no UID",
                    message.seq
                ))
            })?;
            // Some servers answer a range past the last UID with the last message.
            if uid.get() > since {
                uids.push(uid.get());
            }
        }
        uids.sort_unstable();
        uids.dedup();
        Ok(uids)
    }

    async fn fetch_body(&mut self, folder: &str, uid: u32) -> Result<RemoteMessage> {
        let wanted = Uid::new(uid).ok_or_else(|| Error::Protocol("UID 0 requested".to_string()))?;
        let client = self.select(folder).await?;

        let mut fetch = client
            .uid_fetch(
                &UidSet::single(wanted),
                FetchItems::Items(vec![
                    FetchAttribute::Uid,
                    FetchAttribute::Flags,
                    FetchAttribute::full_body_peek(),
                ]),
            )
            .await?;

        let mut found = false;
        let mut body = None;
        let mut remote_flags = None;
        while let Some(item) = fetch.next().await {
            let message = item?;
            if message.uid != Some(wanted) {
                continue;
            }
            found = true;
            body = message.body.or(body);
            remote_flags = message.flags.or(remote_flags);
        }

        if !found {
            return Err(Error::Protocol(format!(
                "message {uid} not found in {folder}"
            )));
        }
        let body = body.ok_or_else(|| {
            Error::Protocol(format!("no body returned for message {uid} in {folder}"))
        })?;
        let flags = remote_flags.as_ref().map(flags::to_local).unwrap_or_default();
        debug!(folder, uid, bytes = body.len(), "message fetched");

        Ok(RemoteMessage { flags, body })
    }

    async fn upload(
        &mut self,
        folder: &str,
        flags: &MaildirFlags,
        message: &[u8],
    ) -> Result<Uploaded> {
        let client = self.authenticated().await?;
        if !client.supports_uidplus() {
            return Err(Error::MissingCapability("UIDPLUS"));
        }

        let now = chrono::Local::now().fixed_offset();
        let assigned = client
            .append(folder, &flags::to_remote(flags), Some(now), message)
            .await?
            .ok_or_else(|| {
                Error::Protocol(format!("APPEND to {folder} returned no APPENDUID"))
            })?;
        debug!(folder, uid = %assigned.uid, bytes = message.len(), "message uploaded");

        Ok(Uploaded {
            uid_validity: assigned.uid_validity.get(),
            uid: assigned.uid.get(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Authenticated(client) => log_out(client).await,
            State::Selected { client, .. } => log_out(client).await,
            State::Closed => Ok(()),
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
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::flags::MaildirFlag;

    const LOGIN: &[u8] = b"A0000 LOGIN \"u\" \"p\"\r\n";

    fn login(builder: &mut Builder, capabilities: &str) {
        builder
            .read(format!("* OK [CAPABILITY {capabilities}] ready\r\n").as_bytes())
            .write(LOGIN)
            .read(format!("A0000 OK [CAPABILITY {capabilities}] done\r\n").as_bytes());
    }

    async fn session(mut builder: Builder, selection: FolderSelection) -> Session<Mock> {
        let client = Client::from_stream(builder.build())
            .await
            .unwrap()
            .login("u", "p")
            .await
            .unwrap();
        Session::new(client, selection)
    }

    fn include(names: &[&str]) -> FolderSelection {
        FolderSelection {
            include: names.iter().map(ToString::to_string).collect(),
            ..FolderSelection::default()
        }
    }

    fn listing(builder: &mut Builder) {
        builder
            .write(b"A0001 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\Noselect \\HasChildren) \"/\" Archive\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" Archive/2024\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" Spam\r\n")
            .read(b"A0001 OK LIST completed\r\n");
    }

    #[tokio::test]
    async fn test_list_skips_unselectable_and_excluded() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        listing(&mut builder);
        let selection = FolderSelection {
            exclude: ["Spam".to_string()].into_iter().collect(),
            ..FolderSelection::default()
        };

        let mut session = session(builder, selection).await;
        let folders = session.list_folders().await.unwrap();
        assert_eq!(folders, vec!["INBOX", "Archive/2024"]);
    }

    #[tokio::test]
    async fn test_list_with_include() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        listing(&mut builder);

        let mut session = session(builder, include(&["Spam", "Archive"])).await;
        let folders = session.list_folders().await.unwrap();
        assert_eq!(folders, vec!["Archive", "Spam"]);
    }

    #[tokio::test]
    async fn test_list_with_missing_include_fails() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        listing(&mut builder);

        let mut session = session(builder, include(&["INBOX", "Lists"])).await;
        let result = session.list_folders().await;
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Lists")));
    }

    #[tokio::test]
    async fn test_pull_exchange_reuses_examined_folder() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        builder
            .write(b"A0001 EXAMINE INBOX\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 42] UIDs valid\r\n")
            .read(b"A0001 OK [READ-ONLY] done\r\n")
            .write(b"A0002 UID FETCH 2:4294967295 UID\r\n")
            .read(b"* 3 FETCH (UID 5)\r\n")
            .read(b"* 2 FETCH (UID 3)\r\n")
            .read(b"A0002 OK done\r\n")
            .write(b"A0003 UID FETCH 3 (UID FLAGS BODY.PEEK[])\r\n")
            .read(b"* 2 FETCH (UID 3 FLAGS (\\Seen \\Answered $Junk) BODY[] {4}\r\nabcd)\r\n")
            .read(b"A0003 OK done\r\n")
            .write(b"A0004 LOGOUT\r\n")
            .read(b"* BYE bye\r\n")
            .read(b"A0004 OK done\r\n");

        let mut session = session(builder, FolderSelection::default()).await;

        let folder = session.examine("INBOX").await.unwrap();
        assert_eq!(
            folder,
            RemoteFolder {
                uid_validity: 42,
                exists: 3
            }
        );
        assert_eq!(session.fetch_new_uids("INBOX", 1).await.unwrap(), vec![3, 5]);

        let message = session.fetch_body("INBOX", 3).await.unwrap();
        assert_eq!(message.body, b"abcd");
        assert_eq!(
            message.flags,
            [MaildirFlag::Replied, MaildirFlag::Seen].into_iter().collect()
        );

        session.close().await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_folder_needs_no_fetch() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        builder
            .write(b"A0001 EXAMINE Sent\r\n")
            .read(b"* 0 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 7] UIDs valid\r\n")
            .read(b"A0001 OK [READ-ONLY] done\r\n");

        let mut session = session(builder, FolderSelection::default()).await;
        assert!(session.fetch_new_uids("Sent", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_without_uid_is_protocol_error() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        builder
            .write(b"A0001 EXAMINE INBOX\r\n")
            .read(b"* 1 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 42] UIDs valid\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 UID FETCH 1:4294967295 UID\r\n")
            .read(b"* 1 FETCH (FLAGS ())\r\n")
            .read(b"A0002 OK done\r\n");

        let mut session = session(builder, FolderSelection::default()).await;
        let result = session.fetch_new_uids("INBOX", 0).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_missing_body_is_protocol_error() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        builder
            .write(b"A0001 EXAMINE INBOX\r\n")
            .read(b"* 1 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 42] UIDs valid\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 UID FETCH 9 (UID FLAGS BODY.PEEK[])\r\n")
            .read(b"A0002 OK done\r\n");

        let mut session = session(builder, FolderSelection::default()).await;
        let result = session.fetch_body("INBOX", 9).await;
        assert!(matches!(result, Err(Error::Protocol(msg)) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_examine_without_uidvalidity() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");
        builder
            .write(b"A0001 EXAMINE INBOX\r\n")
            .read(b"* 1 EXISTS\r\n")
            .read(b"A0001 OK done\r\n");

        let mut session = session(builder, FolderSelection::default()).await;
        assert!(matches!(
            session.examine("INBOX").await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_requires_uidplus() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1");

        let mut session = session(builder, FolderSelection::default()).await;
        let result = session.upload("INBOX", &MaildirFlags::new(), b"hi").await;
        assert!(matches!(result, Err(Error::MissingCapability("UIDPLUS"))));
    }

    #[tokio::test]
    async fn test_upload_closes_open_folder_first() {
        let mut builder = Builder::new();
        login(&mut builder, "IMAP4rev1 UIDPLUS");
        builder
            .write(b"A0001 EXAMINE INBOX\r\n")
            .read(b"* 0 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 42] UIDs valid\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 CLOSE\r\n")
            .read(b"A0002 NO [SERVERBUG] cannot close\r\n");

        let mut session = session(builder, FolderSelection::default()).await;
        session.examine("INBOX").await.unwrap();
        let result = session.upload("INBOX", &MaildirFlags::new(), b"hi").await;
        assert!(matches!(result, Err(Error::Imap(mdsync_imap::Error::No(_)))));
        assert!(matches!(
            session.examine("INBOX").await,
            Err(Error::Protocol(msg)) if msg == "session is closed"
        ));
    }
}
