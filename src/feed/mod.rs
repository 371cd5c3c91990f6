//! Feed sources.
//!
//! Responsibilities:
//! • Deliver `Snapshot` / `Diff` / `Trades` events to the reconciler in feed
//!   order.
//! • Own transport failures: reconnect with backoff and make sure a fresh
//!   snapshot precedes any diff after a discontinuity.
//! • Close the transport gracefully on cancellation.

pub mod message;
pub mod replay;
pub mod ws;

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::errors::Result;
use crate::models::FeedEvent;

pub use message::decode;
pub use replay::ReplayFeed;
pub use ws::WsFeed;

/// Implemented by each event producer.
pub trait FeedSource: Send + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Streams events into `tx` until the source is exhausted, the receiver
    /// is dropped, or `cancel` fires.
    fn run(
        self,
        tx: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Spawn a feed source task; a fatal source error is logged, not propagated.
pub fn spawn_feed<F: FeedSource>(
    source: F,
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let name = source.name();
    tokio::spawn(async move {
        if let Err(e) = source.run(tx, cancel).await {
            error!(feed = name, error = %e, "[FEED] source stopped with error");
        }
    })
}
