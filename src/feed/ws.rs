//! WebSocket feed client.
//!
//! Connects to a server speaking the neutral JSON schema in
//! [`crate::feed::message`]. On every (re)connect the book is treated as
//! discontinuous: diffs are dropped until the server sends a snapshot.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::Result;
use crate::feed::FeedSource;
use crate::feed::message::decode;
use crate::models::FeedEvent;
use crate::utils::ExponentialBackoff;

/// Drops diffs received before the first snapshot of a session.
#[derive(Debug, Default)]
pub struct SnapshotGate {
    synced: bool,
    dropped: u64,
}

impl SnapshotGate {
    /// Marks the book as discontinuous (new connection).
    pub fn reset(&mut self) {
        self.synced = false;
        self.dropped = 0;
    }

    /// Whether `event` may be forwarded to the reconciler.
    pub fn admit(&mut self, event: &FeedEvent) -> bool {
        match event {
            FeedEvent::Snapshot(_) => {
                if self.dropped > 0 {
                    debug!(dropped = self.dropped, "[FEED] resynced on snapshot");
                }
                self.synced = true;
                self.dropped = 0;
                true
            }
            FeedEvent::Diff(_) if !self.synced => {
                self.dropped += 1;
                false
            }
            FeedEvent::Diff(_) | FeedEvent::Trades(_) => true,
        }
    }
}

/// Reconnecting WebSocket feed.
#[derive(Debug)]
pub struct WsFeed {
    url: Url,
    backoff: ExponentialBackoff,
}

impl WsFeed {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            backoff: ExponentialBackoff::default(),
        }
    }
}

enum SessionEnd {
    /// Cancelled or receiver gone; stop for good.
    Shutdown,
    /// Transport dropped; reconnect.
    Lost,
}

impl WsFeed {
    async fn session(
        &mut self,
        tx: &mpsc::Sender<FeedEvent>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd> {
        let (ws_stream, _resp) = connect_async(self.url.as_str()).await?;
        info!(url = %self.url, "[FEED] connected");
        self.backoff.reset();

        let (mut write, mut read) = ws_stream.split();
        let mut gate = SnapshotGate::default();

        loop {
            let text = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[FEED] sending close handshake");
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        warn!(error = %e, "[FEED] close handshake failed");
                    }
                    return Ok(SessionEnd::Shutdown);
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        warn!(?frame, "[FEED] server closed connection");
                        return Ok(SessionEnd::Lost);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "[FEED] websocket message error");
                        return Ok(SessionEnd::Lost);
                    }
                    None => {
                        warn!("[FEED] stream ended");
                        return Ok(SessionEnd::Lost);
                    }
                }
            };

            let event = match decode(&text) {
                Ok(event) => event,
                Err(e) => {
                    warn!(
                        error = %e,
                        payload_head = %text.chars().take(200).collect::<String>(),
                        "[FEED] message parse failed"
                    );
                    continue;
                }
            };
            if !gate.admit(&event) {
                continue;
            }
            if tx.send(event).await.is_err() {
                return Ok(SessionEnd::Shutdown);
            }
        }
    }
}

impl FeedSource for WsFeed {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn run(mut self, tx: mpsc::Sender<FeedEvent>, cancel: CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            info!(url = %self.url, "[FEED] connecting");

            match self.session(&tx, &cancel).await {
                Ok(SessionEnd::Shutdown) => return Ok(()),
                Ok(SessionEnd::Lost) => {}
                Err(e) => error!(error = %e, "[FEED] connection failed"),
            }

            let delay = self.backoff.next_delay();
            warn!(
                attempt = self.backoff.attempt(),
                ?delay,
                "[FEED] reconnecting; book is stale until the next snapshot"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
