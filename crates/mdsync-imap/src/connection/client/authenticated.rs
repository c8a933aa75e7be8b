//! Implementation for the authenticated state.

use chrono::{DateTime, FixedOffset};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::states::{Authenticated, Selected};
use super::{Client, Completion};
use crate::command::Command;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{
    AppendUid, Flag, ListResponse, Mailbox, MailboxStatus, ResponseCode, Status,
};
use crate::{Error, Result};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens a mailbox read-only with EXAMINE.
    ///
    /// Consumes self and returns a selected client on success. Fetching from
    /// an examined mailbox never changes message flags.
    pub async fn examine(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let mailbox = Mailbox::new(mailbox);
        let completion = self
            .execute(&Command::Examine {
                mailbox: mailbox.clone(),
            })
            .await?;
        let status = parse_mailbox_status(&completion);

        let selected = Selected {
            mailbox,
            status: status.clone(),
        };
        Ok((self.into_state(selected), status))
    }

    /// Lists mailboxes matching a pattern.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let completion = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|untagged| match untagged {
                UntaggedResponse::List(item) => Some(item),
                _ => None,
            })
            .collect())
    }

    /// Appends a complete RFC 5322 message to a mailbox.
    ///
    /// Returns the identifiers the server assigned when it answers with an
    /// `APPENDUID` code (UIDPLUS), `None` otherwise.
    pub async fn append(
        &mut self,
        mailbox: &str,
        flags: &[Flag],
        internal_date: Option<DateTime<FixedOffset>>,
        message: &[u8],
    ) -> Result<Option<AppendUid>> {
        let tag = self
            .send(&Command::Append {
                mailbox: Mailbox::new(mailbox),
                flags: flags.to_vec(),
                internal_date,
                size: message.len(),
            })
            .await?;

        // The server either asks for the literal or rejects the command.
        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw)? {
                Response::Continuation { .. } => break,
                Response::Tagged {
                    tag: done,
                    status,
                    text,
                    ..
                } if done.as_str() == tag => {
                    Error::check_completion(status, text)?;
                    return Err(Error::Protocol(
                        "APPEND completed without a continuation request".to_string(),
                    ));
                }
                Response::Untagged(UntaggedResponse::Condition {
                    status: Status::Bye,
                    text,
                    ..
                }) => return Err(Error::Bye(text)),
                _ => {}
            }
        }

        debug!(bytes = message.len(), "sending APPEND literal");
        self.stream.write_raw(message).await?;
        self.stream.write_raw(b"\r\n").await?;

        let completion = self.finish(&tag).await?;
        Ok(match completion.code {
            Some(ResponseCode::AppendUid(assigned)) => Some(assigned),
            _ => None,
        })
    }
}

/// Builds the mailbox status from the data an EXAMINE returned.
fn parse_mailbox_status(completion: &Completion) -> MailboxStatus {
    let mut status = MailboxStatus::default();

    for untagged in &completion.untagged {
        match untagged {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
            UntaggedResponse::Condition {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(v) => status.uid_next = Some(*v),
                _ => {}
            },
            _ => {}
        }
    }
    status.read_only = matches!(completion.code, Some(ResponseCode::ReadOnly));

    status
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
    use crate::types::{Uid, UidValidity};

    const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 UIDPLUS] ready\r\n";
    const LOGIN: &[u8] = b"A0000 LOGIN \"u\" \"p\"\r\n";
    const LOGIN_OK: &[u8] = b"A0000 OK [CAPABILITY IMAP4rev1 UIDPLUS] done\r\n";

    async fn authenticated(
        builder: &mut Builder,
    ) -> Client<tokio_test::io::Mock, Authenticated> {
        let mock = builder.build();
        Client::from_stream(mock)
            .await
            .unwrap()
            .login("u", "p")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_examine_collects_status() {
        let mut builder = Builder::new();
        builder
            .read(GREETING)
            .write(LOGIN)
            .read(LOGIN_OK)
            .write(b"A0001 EXAMINE INBOX\r\n")
            .read(b"* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n")
            .read(b"* OK [PERMANENTFLAGS ()] No permanent flags permitted\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"* 0 RECENT\r\n")
            .read(b"* OK [UIDVALIDITY 1700000000] UIDs valid\r\n")
            .read(b"* OK [UIDNEXT 4] Predicted next UID\r\n")
            .read(b"A0001 OK [READ-ONLY] EXAMINE completed\r\n");

        let client = authenticated(&mut builder).await;
        let (selected, status) = client.examine("INBOX").await.unwrap();

        assert_eq!(status.exists, 3);
        assert_eq!(status.uid_validity, UidValidity::new(1_700_000_000));
        assert_eq!(status.uid_next, Uid::new(4));
        assert_eq!(status.flags.len(), 5);
        assert!(status.read_only);
        assert_eq!(selected.selected().mailbox().as_str(), "INBOX");
    }

    #[tokio::test]
    async fn test_list_skips_other_data() {
        let mut builder = Builder::new();
        builder
            .read(GREETING)
            .write(LOGIN)
            .read(LOGIN_OK)
            .write(b"A0001 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* 4 EXISTS\r\n")
            .read(b"* LIST (\\Noselect \\HasChildren) \"/\" \"[Gmail]\"\r\n")
            .read(b"A0001 OK LIST completed\r\n");

        let mut client = authenticated(&mut builder).await;
        let folders = client.list("", "*").await.unwrap();

        assert_eq!(folders.len(), 2);
        assert!(folders[0].is_selectable());
        assert_eq!(folders[1].mailbox.as_str(), "[Gmail]");
        assert!(!folders[1].is_selectable());
    }

    #[tokio::test]
    async fn test_append_returns_appenduid() {
        let mut builder = Builder::new();
        builder
            .read(GREETING)
            .write(LOGIN)
            .read(LOGIN_OK)
            .write(b"A0001 APPEND Sent (\\Seen) {5}\r\n")
            .read(b"+ Ready for literal data\r\n")
            .write(b"hello")
            .write(b"\r\n")
            .read(b"A0001 OK [APPENDUID 42 7] APPEND completed\r\n");

        let mut client = authenticated(&mut builder).await;
        let assigned = client
            .append("Sent", &[Flag::Seen], None, b"hello")
            .await
            .unwrap();

        assert_eq!(
            assigned,
            Some(AppendUid {
                uid_validity: UidValidity::new(42).unwrap(),
                uid: Uid::new(7).unwrap(),
            })
        );
    }

    #[tokio::test]
    async fn test_append_without_uidplus_code() {
        let mut builder = Builder::new();
        builder
            .read(GREETING)
            .write(LOGIN)
            .read(LOGIN_OK)
            .write(b"A0001 APPEND INBOX () {2}\r\n")
            .read(b"+ go ahead\r\n")
            .write(b"hi")
            .write(b"\r\n")
            .read(b"A0001 OK APPEND completed\r\n");

        let mut client = authenticated(&mut builder).await;
        assert_eq!(client.append("INBOX", &[], None, b"hi").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_append_rejected_before_literal() {
        let mut builder = Builder::new();
        builder
            .read(GREETING)
            .write(LOGIN)
            .read(LOGIN_OK)
            .write(b"A0001 APPEND Missing () {2}\r\n")
            .read(b"A0001 NO [TRYCREATE] No such mailbox\r\n");

        let mut client = authenticated(&mut builder).await;
        let result = client.append("Missing", &[], None, b"hi").await;
        assert!(matches!(result, Err(Error::No(text)) if text == "No such mailbox"));
    }
}
