//! Configuration loader and application settings.
//!
//! Every flag can also come from the environment (or a `.env` file).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::errors::{AppError, Result};

/// Consolidated application configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "depth-monitor")]
#[command(about = "Live order-book depth chart in the terminal")]
pub struct AppConfig {
    /// Price grouping unit for the depth chart
    #[arg(short, long, env = "GROUP", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub group: u32,

    /// WebSocket endpoint of the book feed
    #[arg(long, env = "FEED_URL")]
    pub feed_url: Option<Url>,

    /// Replay recorded feed messages from a JSON-lines file instead
    #[arg(long = "replay", env = "REPLAY_FILE")]
    pub replay_file: Option<PathBuf>,

    /// Pause between replayed messages, in milliseconds
    #[arg(long, env = "REPLAY_DELAY_MS", default_value_t = 50)]
    pub replay_delay_ms: u64,

    /// Base URL serving `/totals` and `/health`; without it status is
    /// derived from the book
    #[arg(long, env = "STATUS_URL")]
    pub status_url: Option<Url>,

    /// Redraw period in milliseconds
    #[arg(long, env = "REFRESH_MS", default_value_t = 150,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_ms: u64,

    /// Status poll period in seconds
    #[arg(long, env = "STATUS_INTERVAL_SECS", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub status_interval_secs: u64,

    /// Book-derived health turns STALE after this many seconds without events
    #[arg(long, env = "STALE_AFTER_SECS", default_value_t = 10)]
    pub stale_after_secs: u64,

    /// Log file; the terminal is taken by the chart
    #[arg(long, env = "LOG_FILE", default_value = "depth-monitor.log")]
    pub log_file: PathBuf,
}

/// Which feed source to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedConfig {
    WebSocket(Url),
    Replay { path: PathBuf, delay: Duration },
}

impl AppConfig {
    /// Load `.env` (if any), then parse flags and environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Exactly one of `--feed-url` / `--replay` must be given.
    pub fn feed(&self) -> Result<FeedConfig> {
        match (&self.feed_url, &self.replay_file) {
            (Some(url), None) => Ok(FeedConfig::WebSocket(url.clone())),
            (None, Some(path)) => {
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "replay file not found: {}",
                        path.display()
                    )));
                }
                Ok(FeedConfig::Replay {
                    path: path.clone(),
                    delay: Duration::from_millis(self.replay_delay_ms),
                })
            }
            (Some(_), Some(_)) => Err(AppError::Config(
                "--feed-url and --replay are mutually exclusive".into(),
            )),
            (None, None) => Err(AppError::Config(
                "one of --feed-url or --replay is required".into(),
            )),
        }
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<AppConfig, clap::Error> {
        AppConfig::try_parse_from(std::iter::once("depth-monitor").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_follow_documented_values() {
        let config = parse(&["--feed-url", "ws://localhost:9000/book"]).unwrap();
        assert_eq!(config.group, 1);
        assert_eq!(config.refresh(), Duration::from_millis(150));
        assert_eq!(config.status_interval(), Duration::from_secs(5));
        assert_eq!(config.stale_after(), Duration::from_secs(10));
        assert!(config.status_url.is_none());
        assert_eq!(
            config.feed().unwrap(),
            FeedConfig::WebSocket(Url::parse("ws://localhost:9000/book").unwrap())
        );
    }

    #[test]
    fn group_must_be_positive() {
        assert!(parse(&["--group", "0", "--feed-url", "ws://x"]).is_err());
        assert_eq!(parse(&["-g", "25", "--feed-url", "ws://x"]).unwrap().group, 25);
    }

    #[test]
    fn feed_source_is_required_and_exclusive() {
        let none = parse(&[]).unwrap();
        assert!(matches!(none.feed(), Err(AppError::Config(_))));

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let both = parse(&["--feed-url", "ws://x", "--replay", path]).unwrap();
        assert!(matches!(both.feed(), Err(AppError::Config(_))));

        let replay = parse(&["--replay", path, "--replay-delay-ms", "5"]).unwrap();
        assert_eq!(
            replay.feed().unwrap(),
            FeedConfig::Replay {
                path: file.path().to_path_buf(),
                delay: Duration::from_millis(5),
            }
        );
    }

    #[test]
    fn missing_replay_file_is_rejected() {
        let config = parse(&["--replay", "/nonexistent/session.jsonl"]).unwrap();
        assert!(config.feed().is_err());
    }
}
