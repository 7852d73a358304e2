mod config;
mod session;

use std::{io, path::PathBuf, rc::Rc, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use storefront_core::{HttpAuctionApi, SelectionPolicy, StoreOptions, SystemClock};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::session::{Command, Session};

#[derive(Parser, Debug)]
struct Cli {
    /// Config file; `storefront.toml` is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    cdn_url: Option<String>,
    #[arg(long)]
    bidder_tag: Option<String>,
    /// Allow any closed lot in the basket, not only lots won by this bidder.
    #[arg(long)]
    any_closed: bool,
    /// Runs one command. Without a command, reads commands from stdin so
    /// bids and orders share one session.
    #[command(subcommand)]
    command: Option<Command>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(v) = cli.api_url {
        settings.api_url = v;
    }
    if let Some(v) = cli.cdn_url {
        settings.cdn_url = v;
    }
    if let Some(v) = cli.bidder_tag {
        settings.bidder_tag = v;
    }
    if cli.any_closed {
        settings.selection_policy = SelectionPolicy::AnyClosed;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    info!(api = %settings.api_url, policy = ?settings.selection_policy, "storefront starting");

    let api = HttpAuctionApi::new(&settings.api_url, settings.cdn_url.clone())?;
    let session = Session::new(
        Arc::new(api),
        Rc::new(SystemClock),
        StoreOptions {
            bidder_tag: settings.bidder_tag.clone(),
            selection_policy: settings.selection_policy,
        },
    )?;
    session
        .load()
        .await
        .with_context(|| format!("api at {}", settings.api_url))?;

    let mut out = io::stdout();
    match cli.command {
        Some(command) => session.execute(command, &mut out).await,
        None => session.run_shell(io::stdin().lock(), &mut out).await,
    }
}
