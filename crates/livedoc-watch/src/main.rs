//! livedoc-watch: follow a workspace's live event stream from the terminal.
//!
//! Usage:
//!   livedoc-watch --workspace quarterly-report
//!   livedoc-watch --base-url https://docs.example.com --workspace q3 --channel actions
//!   LIVEDOC_TOKEN=... livedoc-watch --workspace q3
//!
//! Logs go to stderr (`RUST_LOG=livedoc_client=debug` for per-frame detail);
//! workspace changes go to stdout.

mod config;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use livedoc_client::{DocumentView, HttpTransport, WorkspaceStore};
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::WatchConfig;

/// Follow a livedoc workspace stream.
#[derive(Parser, Debug)]
#[command(name = "livedoc-watch")]
#[command(about = "Follow a livedoc workspace's live event stream")]
struct Args {
    /// Server base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Workspace to follow
    #[arg(short, long)]
    workspace: Option<String>,

    /// Stream channel (state, actions, citations)
    #[arg(short, long)]
    channel: Option<String>,

    /// Bearer token, sent as a query parameter
    #[arg(long, env = "LIVEDOC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Wait between reconnect attempts, in milliseconds
    #[arg(long)]
    backoff_ms: Option<u64>,

    /// Config file (default: ~/.config/livedoc/watch.ron)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> WatchConfig {
        WatchConfig {
            base_url: self.base_url.clone(),
            workspace: self.workspace.clone(),
            channel: self.channel.clone(),
            token: self.token.clone(),
            backoff_ms: self.backoff_ms,
            ..WatchConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = WatchConfig::load(args.config.as_deref())?
        .merge(args.overrides())
        .resolve()
        .context("invalid watcher settings")?;

    tracing::info!(endpoint = %settings.endpoint, "starting livedoc-watch");

    let store = WorkspaceStore::new();
    let mut snapshots = store.subscribe();
    let (_scheduler, mut updates, view_task) =
        DocumentView::new(settings.highlight).follow(store.subscribe());

    store.connect(
        settings.endpoint,
        Arc::new(HttpTransport::new()),
        settings.stream,
    );
    let mut status = store
        .with_stream(|stream| stream.subscribe_status())
        .context("stream handle missing after connect")?;

    let mut last = store.snapshot();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            changed = status.recv() => match changed {
                Ok(s) => println!("{}", report::status_line(&s)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "status notifications lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(update) = updates.recv() => {
                println!("{}", report::update_line(&update));
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = snapshots.borrow_and_update().clone();
                for line in report::snapshot_lines(&last, &next) {
                    println!("{line}");
                }
                last = next;
            }
        }
    }

    store.disconnect();
    view_task.abort();
    Ok(())
}
