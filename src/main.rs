use std::sync::Arc;

use anyhow::{Context, Result};
use depth_monitor::{
    book::{BookStore, Reconciler},
    config::{AppConfig, FeedConfig},
    display::{self, DisplayConfig, TerminalGuard},
    feed::{self, ReplayFeed, WsFeed},
    status::{self, BookStatusSource, HttpStatusSource},
    utils,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Feed events buffered between the source and the reconciler.
const EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load();
    let feed_config = config.feed().context("invalid feed configuration")?;
    utils::init_logging(&config.log_file)
        .with_context(|| format!("cannot open log file {}", config.log_file.display()))?;

    tracing::info!(
        group = config.group,
        refresh_ms = config.refresh_ms,
        status_url = ?config.status_url,
        "[INIT] depth-monitor starting"
    );

    let store = BookStore::new();
    let cancel = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

    // Producer -------------------------------------------------------------
    let mut tasks = vec![match feed_config {
        FeedConfig::WebSocket(url) => {
            tracing::info!(%url, "[INIT] websocket feed");
            feed::spawn_feed(WsFeed::new(url), event_tx, cancel.clone())
        }
        FeedConfig::Replay { path, delay } => {
            tracing::info!(path = %path.display(), ?delay, "[INIT] replay feed");
            feed::spawn_feed(ReplayFeed::new(path, delay), event_tx, cancel.clone())
        }
    }];

    // Single writer of the ladders ------------------------------------------
    tasks.push(tokio::spawn(
        Reconciler::new(store.clone()).run(event_rx, cancel.clone()),
    ));

    // Status watchers --------------------------------------------------------
    let interval = config.status_interval();
    let watchers = match &config.status_url {
        Some(url) => {
            let source = HttpStatusSource::new(url.clone()).context("status client")?;
            status::spawn_watchers(Arc::new(source), store.clone(), interval, cancel.clone())
        }
        None => {
            let source = BookStatusSource::new(store.clone(), config.stale_after());
            status::spawn_watchers(Arc::new(source), store.clone(), interval, cancel.clone())
        }
    };
    tasks.extend(watchers);

    tokio::spawn(shutdown_signal(cancel.clone()));

    // Render loop on the main task; the guard restores the terminal on exit.
    let outcome = {
        let (_guard, mut terminal) =
            TerminalGuard::enter().context("failed to initialise terminal")?;
        let display_config = DisplayConfig {
            refresh: config.refresh(),
            group: config.group,
        };
        display::run(&mut terminal, store, display_config, cancel.clone()).await
    };

    cancel.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "[EXIT] task did not finish cleanly");
        }
    }
    tracing::info!("[EXIT] depth-monitor stopped");
    outcome.context("render loop failed")
}

/// Cancels everything on SIGINT / SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "[INIT] SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("[EXIT] SIGINT received"),
        _ = terminate => tracing::info!("[EXIT] SIGTERM received"),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}
