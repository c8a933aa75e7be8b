//! Configuration file loading and maildir path expansion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mdsync_core::AccountConfig;
use serde::Deserialize;

/// The whole configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Accounts by name, processed in name order.
    pub accounts: BTreeMap<String, AccountConfig>,
}

/// Returns `<user config dir>/mdsync/config.toml`.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mdsync")
        .join("config.toml")
}

/// Reads and parses a configuration file.
pub async fn load(path: &Path) -> Result<ConfigFile> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("cannot parse {}", path.display()))
}

/// Expands a configured maildir path.
///
/// A leading `~` or `$VAR` is replaced using `env`; the result is made
/// absolute against `cwd`.
pub fn expand_path(raw: &Path, env: impl Fn(&str) -> Option<String>, cwd: &Path) -> Result<PathBuf> {
    let Some(text) = raw.to_str() else {
        return Ok(cwd.join(raw));
    };

    let expanded = if text == "~" || text.starts_with("~/") {
        let home = env("HOME").context("cannot expand ~: HOME is not set")?;
        format!("{home}{}", &text[1..])
    } else if let Some(rest) = text.strip_prefix('$') {
        let (name, tail) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
        if name.is_empty() {
            bail!("empty variable name in {text}");
        }
        let value = env(name).with_context(|| format!("cannot expand {text}: ${name} is not set"))?;
        format!("{value}{tail}")
    } else {
        text.to_string()
    };

    Ok(cwd.join(expanded))
}

/// Creates the maildir root, readable by the owner only, if it is missing.
pub fn create_root(root: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if root.is_dir() {
        return Ok(());
    }
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(root)
        .with_context(|| format!("cannot create {}", root.display()))
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

    fn env(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/me".to_string()),
            "MAILROOT" => Some("/srv/mail".to_string()),
            _ => None,
        }
    }

    fn expand(raw: &str) -> Result<PathBuf> {
        expand_path(Path::new(raw), env, Path::new("/work"))
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand("~/Mail").unwrap(), PathBuf::from("/home/me/Mail"));
        assert_eq!(expand("~").unwrap(), PathBuf::from("/home/me"));
        assert_eq!(expand("$HOME/Mail").unwrap(), PathBuf::from("/home/me/Mail"));
    }

    #[test]
    fn test_expand_variable() {
        assert_eq!(expand("$MAILROOT/work").unwrap(), PathBuf::from("/srv/mail/work"));
        assert_eq!(expand("$MAILROOT").unwrap(), PathBuf::from("/srv/mail"));
        assert!(expand("$UNSET/x").is_err());
        assert!(expand("$/x").is_err());
    }

    #[test]
    fn test_relative_and_absolute() {
        assert_eq!(expand("Mail/work").unwrap(), PathBuf::from("/work/Mail/work"));
        assert_eq!(expand("/var/mail").unwrap(), PathBuf::from("/var/mail"));
        assert_eq!(expand("~other").unwrap(), PathBuf::from("/work/~other"));
    }

    #[test]
    fn test_parse_config() {
        let file: ConfigFile = toml::from_str(
            r#"
            [accounts.work]
            maildir = "~/Mail/work"
            server = "imap.example.com"
            username = "me@example.com"
            password_cmd = "pass show work"
            use_tls = true

            [accounts.work.folders]
            include = ["INBOX", "Sent"]
            exclude = ["Sent"]

            [accounts.home]
            server = "mail.home.lan"
            port = 1143
            username = "me"
            password = "secret"
            use_starttls = true
            "#,
        )
        .unwrap();

        let names: Vec<_> = file.accounts.keys().cloned().collect();
        assert_eq!(names, vec!["home", "work"]);

        let work = &file.accounts["work"];
        assert_eq!(work.maildir.as_deref(), Some(Path::new("~/Mail/work")));
        assert_eq!(work.effective_port(), 993);
        assert!(work.folders.admits("INBOX"));
        assert!(!work.folders.admits("Sent"));

        let home = &file.accounts["home"];
        assert!(home.maildir.is_none());
        assert_eq!(home.effective_port(), 1143);
        assert_eq!(home.password.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load(&missing).await.unwrap_err();
        assert!(format!("{err:#}").contains("nope.toml"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "accounts = 3").unwrap();
        assert!(load(&bad).await.is_err());
    }

    #[test]
    fn test_create_root() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a/b");
        create_root(&root).unwrap();
        create_root(&root).unwrap();
        let mode = std::fs::metadata(&root).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
