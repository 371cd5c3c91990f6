//! Offline feed: replays recorded messages from a JSON-lines file.
//!
//! One message per line in the schema of [`crate::feed::message`]. Blank
//! lines and lines starting with `#` are skipped.

use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::Result;
use crate::feed::FeedSource;
use crate::feed::message::decode;
use crate::models::FeedEvent;

#[derive(Debug, Clone)]
pub struct ReplayFeed {
    path: PathBuf,
    delay: Duration,
}

impl ReplayFeed {
    /// `delay` is the pause between consecutive messages.
    pub fn new(path: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            path: path.into(),
            delay,
        }
    }
}

impl FeedSource for ReplayFeed {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn run(self, tx: mpsc::Sender<FeedEvent>, cancel: CancellationToken) -> Result<()> {
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        info!(path = %self.path.display(), "[REPLAY] started");

        let mut line_no = 0usize;
        let mut sent = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let event = match decode(line) {
                Ok(event) => event,
                Err(e) => {
                    warn!(line = line_no, error = %e, "[REPLAY] skipping malformed line");
                    continue;
                }
            };
            if tx.send(event).await.is_err() {
                return Ok(());
            }
            sent += 1;

            if !self.delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.delay) => {}
                }
            } else if cancel.is_cancelled() {
                return Ok(());
            }
        }

        info!(sent, "[REPLAY] finished");
        Ok(())
    }
}
