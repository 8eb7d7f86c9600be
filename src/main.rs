//! # Pagewatch — recurring site-watch service
//!
//! Loads the registered watch tasks, runs each on its own cadence, and
//! fans change notifications out to Telegram, email, webhooks, and
//! connected WebSocket clients.
//!
//! Usage:
//!   pagewatch                        # Start with ~/.pagewatch/config.toml
//!   pagewatch --config ./dev.toml    # Custom config
//!   pagewatch --port 9000            # Override the gateway port

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pagewatch_channels::{
    DispatcherSet, EmailDispatcher, SocketHub, TelegramDispatcher, WebhookDispatcher,
    WebsocketDispatcher,
};
use pagewatch_core::PagewatchConfig;
use pagewatch_fetch::SiteFetcher;
use pagewatch_gateway::AppState;
use pagewatch_scheduler::{WatchDb, WatchScheduler};

#[derive(Parser)]
#[command(name = "pagewatch", version, about = "Site-watch scheduler and notifier")]
struct Cli {
    /// Path to the config file (default: ~/.pagewatch/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Gateway port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "pagewatch=debug,tower_http=debug"
    } else {
        "pagewatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => PagewatchConfig::load_from(std::path::Path::new(&expand_path(path)))?,
        None => PagewatchConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let db_path = expand_path(&config.store.db_path);
    let db = Arc::new(WatchDb::open(std::path::Path::new(&db_path))?);
    tracing::info!("store opened at {db_path}");

    let fetcher = Arc::new(SiteFetcher::new()?);
    let hub = Arc::new(SocketHub::new());
    let dispatchers = Arc::new(build_dispatchers(&config, hub.clone()));
    tracing::info!(
        "dispatchers ready: {:?}",
        dispatchers.kinds().iter().map(|k| k.to_string()).collect::<Vec<_>>()
    );

    let scheduler = WatchScheduler::new(
        db.clone(),
        db.clone(),
        db.clone(),
        fetcher.clone(),
        dispatchers,
    );

    let scheduler_enabled = config.scheduler.enabled_with_env();
    if scheduler_enabled {
        scheduler.start();
    } else {
        tracing::info!("recurring scheduler disabled by configuration");
    }

    if !config.gateway.enabled {
        tracing::info!("gateway disabled, running scheduler only");
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    let state = AppState {
        gateway_config: config.gateway.clone(),
        scheduler,
        scheduler_enabled,
        store: db,
        fetcher,
        hub,
        start_time: std::time::Instant::now(),
    };

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind gateway to {addr}"))?;
    tracing::info!("gateway listening on http://{addr}");

    axum::serve(listener, pagewatch_gateway::build_router(state))
        .await
        .context("gateway server failed")?;
    Ok(())
}

/// Build the dispatcher registry from whatever channels the config has
/// credentials for. Webhook and websocket need none and are always
/// available.
fn build_dispatchers(config: &PagewatchConfig, hub: Arc<SocketHub>) -> DispatcherSet {
    let mut set = DispatcherSet::new();
    set.register(Arc::new(WebhookDispatcher::new()));
    set.register(Arc::new(WebsocketDispatcher::new(hub)));

    if let Some(tg) = &config.channel.telegram
        && tg.enabled
        && !tg.bot_token.is_empty()
    {
        set.register(Arc::new(TelegramDispatcher::new(tg.bot_token.clone())));
    }

    if let Some(email) = &config.channel.email
        && email.enabled
    {
        match EmailDispatcher::new(email) {
            Ok(dispatcher) => set.register(Arc::new(dispatcher)),
            Err(e) => tracing::warn!("email channel disabled: {e}"),
        }
    }

    set
}
