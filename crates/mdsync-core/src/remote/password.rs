//! Password lookup.

use tokio::process::Command;
use tracing::debug;

use crate::config::AccountConfig;
use crate::{Error, Result};

/// Returns the account's password.
///
/// `password_cmd`, if set, is run with `sh -c` and its standard output,
/// minus trailing line breaks, is the password. Otherwise `password` is used.
///
/// # Errors
///
/// Returns [`Error::PasswordCommand`] if the command cannot be started,
/// exits unsuccessfully or prints something that is not UTF-8, and
/// [`Error::Config`] if the resulting password is empty.
pub async fn resolve_password(account: &AccountConfig) -> Result<String> {
    let password = match &account.password_cmd {
        Some(cmd) => run(cmd).await?,
        None => account.password.clone().unwrap_or_default(),
    };

    if password.is_empty() {
        return Err(Error::Config(format!(
            "no password for {}",
            account.username
        )));
    }
    Ok(password)
}

async fn run(cmd: &str) -> Result<String> {
    debug!("running password command");
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::PasswordCommand(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::PasswordCommand(format!(
            "{}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|_| Error::PasswordCommand("output is not UTF-8".to_string()))?;
    Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
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
    use super::*;

    fn account(password: Option<&str>, cmd: Option<&str>) -> AccountConfig {
        AccountConfig {
            username: "me".to_string(),
            password: password.map(ToString::to_string),
            password_cmd: cmd.map(ToString::to_string),
            ..AccountConfig::default()
        }
    }

    #[tokio::test]
    async fn test_plain_password() {
        let pw = resolve_password(&account(Some("secret"), None)).await.unwrap();
        assert_eq!(pw, "secret");
    }

    #[tokio::test]
    async fn test_command_output_is_trimmed() {
        let pw = resolve_password(&account(Some("ignored"), Some("printf ' s3cret \\r\\n\\n'")))
            .await
            .unwrap();
        assert_eq!(pw, " s3cret ");
    }

    #[tokio::test]
    async fn test_failing_command() {
        let result = resolve_password(&account(None, Some("echo nope >&2; exit 3"))).await;
        assert!(matches!(result, Err(Error::PasswordCommand(msg)) if msg.contains("nope")));
    }

    #[tokio::test]
    async fn test_empty_password_is_config_error() {
        assert!(matches!(
            resolve_password(&account(None, None)).await,
            Err(Error::Config(_))
        ));
        assert!(matches!(
            resolve_password(&account(None, Some("true"))).await,
            Err(Error::Config(_))
        ));
    }
}
