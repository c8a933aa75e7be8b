//! `mdsync` - two-way synchronization between IMAP accounts and maildirs.
//!
//! Each configured account is pushed (new local messages are uploaded) and
//! then pulled (new remote messages are stored), one account at a time.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use mdsync_core::{AccountConfig, Maildir, SyncReport, sync_account};
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Two-way sync between IMAP accounts and local maildirs.
#[derive(Debug, Parser)]
#[command(name = "mdsync", version, about)]
struct Cli {
    /// Configuration file [default: <config dir>/mdsync/config.toml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Synchronize only this account (repeatable)
    #[arg(short, long = "account", value_name = "NAME")]
    accounts: Vec<String>,

    /// More logging (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

const fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "mdsync=info,mdsync_core=info,mdsync_imap=warn",
        1 => "mdsync=debug,mdsync_core=debug,mdsync_imap=info",
        _ => "mdsync=debug,mdsync_core=debug,mdsync_imap=debug",
    }
}

/// Synchronizes the selected accounts. Returns false if any of them failed.
async fn run(cli: &Cli) -> Result<bool> {
    let path = cli.config.clone().unwrap_or_else(config::default_path);
    let file = config::load(&path).await?;

    for name in &cli.accounts {
        if !file.accounts.contains_key(name) {
            bail!("no account named {name} in {}", path.display());
        }
    }

    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let mut all_ok = true;

    for (name, account) in &file.accounts {
        if !cli.accounts.is_empty() && !cli.accounts.contains(name) {
            continue;
        }

        let span = info_span!("account", %name);
        match sync_one(account, &cwd).instrument(span.clone()).await {
            Ok(Some(report)) => {
                let _guard = span.enter();
                info!(
                    uploaded = report.uploaded,
                    downloaded = report.downloaded,
                    "done"
                );
            }
            Ok(None) => {}
            Err(e) => {
                let _guard = span.enter();
                error!("{e:#}");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

/// Runs one account. Returns `None` if the account has no maildir.
async fn sync_one(account: &AccountConfig, cwd: &Path) -> Result<Option<SyncReport>> {
    let Some(raw) = account.maildir.as_deref() else {
        warn!("no maildir configured, skipping");
        return Ok(None);
    };

    let root = config::expand_path(raw, |name| std::env::var(name).ok(), cwd)?;
    config::create_root(&root)?;
    let store = Maildir::open(&root).await?;
    info!(maildir = %root.display(), server = %account.server, "synchronizing");

    let report = sync_account(account, &store).await?;
    Ok(Some(report))
}
