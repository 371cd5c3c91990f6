//! Miscellaneous helper utilities.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use rand::Rng;
use tracing_subscriber::{EnvFilter, fmt};

use crate::errors::{AppError, Result};

/// Initialize `tracing` subscriber with env-based filter, writing to `path`.
///
/// The terminal belongs to the UI, so logs go to a file truncated at start.
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| AppError::Other(e.to_string()))
}

/// Lossy conversion used only when formatting numbers for display.
pub fn to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(60);
/// Jitter as a fraction of the capped delay, applied in both directions.
const BACKOFF_JITTER: f64 = 0.1;

/// Retry pacing for feed reconnects and status polls: 1s, 2s, 4s, ... up to
/// 60s, each randomised by ±10%.
#[derive(Debug, Clone, Default)]
pub struct ExponentialBackoff {
    attempt: u32,
}

impl ExponentialBackoff {
    /// Un-jittered delay for the current attempt.
    fn capped(&self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        BACKOFF_BASE.saturating_mul(factor).min(BACKOFF_CAP)
    }

    pub fn next_delay(&mut self) -> Duration {
        let secs = self.capped().as_secs_f64();
        let spread = secs * BACKOFF_JITTER;
        let jittered = secs + rand::thread_rng().gen_range(-spread..=spread);
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_secs_f64(jittered.max(0.0))
    }

    /// Call after a successful connection or poll.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
