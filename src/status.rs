//! Venue status: per-side totals and a health string.
//!
//! Two producers refresh these on their own cadence, independently of the
//! order-book feed. Poll failures are logged and retried with backoff; they
//! never stop the process.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::book::BookStore;
use crate::errors::Result;
use crate::feed::message::DecimalRepr;
use crate::models::{Health, Side, SideTotals};
use crate::utils::ExponentialBackoff;

pub const HEALTH_STALE: &str = "STALE";
pub const HEALTH_NO_DATA: &str = "NO DATA";

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can report venue totals and health.
pub trait StatusSource: Send + Sync + 'static {
    fn totals(&self) -> impl Future<Output = Result<SideTotals>> + Send;
    fn health(&self) -> impl Future<Output = Result<Health>> + Send;
}

#[derive(Debug, Deserialize)]
struct TotalsResponse {
    bid_total: DecimalRepr,
    ask_total: DecimalRepr,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    health: String,
}

/// Polls `GET {base}/totals` and `GET {base}/health`.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: Client,
    base: Url,
}

impl HttpStatusSource {
    pub fn new(mut base: Url) -> Result<Self> {
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { client, base })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.base.join(endpoint)?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;
        Ok(body)
    }
}

impl StatusSource for HttpStatusSource {
    async fn totals(&self) -> Result<SideTotals> {
        let resp: TotalsResponse = self.get("totals").await?;
        Ok(SideTotals {
            bid: resp.bid_total.to_decimal()?,
            ask: resp.ask_total.to_decimal()?,
        })
    }

    async fn health(&self) -> Result<Health> {
        let resp: HealthResponse = self.get("health").await?;
        Ok(Health::new(resp.health))
    }
}

/// Derives status from the book itself when no status endpoint exists:
/// totals are the full ladder depths, health reflects feed staleness.
#[derive(Debug, Clone)]
pub struct BookStatusSource {
    store: BookStore,
    stale_after: Duration,
}

impl BookStatusSource {
    pub fn new(store: BookStore, stale_after: Duration) -> Self {
        Self { store, stale_after }
    }
}

impl StatusSource for BookStatusSource {
    async fn totals(&self) -> Result<SideTotals> {
        Ok(self.store.with_read(|state| SideTotals {
            bid: state.depth(Side::Bid),
            ask: state.depth(Side::Ask),
        }))
    }

    async fn health(&self) -> Result<Health> {
        let updated_at = self.store.with_read(|state| state.updated_at);
        let health = match updated_at {
            None => HEALTH_NO_DATA,
            Some(at) if Instant::now().duration_since(at) > self.stale_after => HEALTH_STALE,
            Some(_) => Health::NORMAL,
        };
        Ok(Health::new(health))
    }
}

/// Spawns the totals and health watchers, each polling every `interval`.
pub fn spawn_watchers<S: StatusSource>(
    source: Arc<S>,
    store: BookStore,
    interval: Duration,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let totals = {
        let (source, store) = (source.clone(), store.clone());
        tokio::spawn(poll_loop("totals", interval, cancel.clone(), move || {
            let (source, store) = (source.clone(), store.clone());
            async move {
                let totals = source.totals().await?;
                debug!(bid = %totals.bid, ask = %totals.ask, "[STATUS] totals");
                store.set_totals(totals);
                Ok(())
            }
        }))
    };

    let health = tokio::spawn(poll_loop("health", interval, cancel, move || {
        let (source, store) = (source.clone(), store.clone());
        async move {
            let health = source.health().await?;
            debug!(%health, "[STATUS] health");
            store.set_health(health);
            Ok(())
        }
    }));

    vec![totals, health]
}

/// Runs `poll` immediately and then once per `interval`. A failed poll is
/// retried after a backoff delay instead of waiting for the next tick.
async fn poll_loop<F, Fut>(
    name: &'static str,
    interval: Duration,
    cancel: CancellationToken,
    mut poll: F,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut backoff = ExponentialBackoff::default();

    info!(watcher = name, ?interval, "[STATUS] watcher started");
    'outer: loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        loop {
            match poll().await {
                Ok(()) => {
                    backoff.reset();
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        watcher = name,
                        error = %e,
                        attempt = backoff.attempt(),
                        ?delay,
                        "[STATUS] poll failed; retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break 'outer,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
    info!(watcher = name, "[STATUS] watcher stopped");
}
