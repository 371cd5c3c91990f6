//! Shared data structures used throughout the application.

use std::collections::BTreeMap;
use std::fmt;

use bigdecimal::BigDecimal;
use serde::Deserialize;

/// Exact decimal price. Ladder keys compare by value, so `100` and `100.0`
/// address the same level.
pub type Price = BigDecimal;

/// Exact decimal size.
pub type Quantity = BigDecimal;

/// One side's price → quantity levels. Every stored quantity is > 0.
pub type Ladder = BTreeMap<Price, Quantity>;

/// Book side. Trade messages may spell it `buy` / `sell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "buy")]
    Bid,
    #[serde(alias = "sell")]
    Ask,
}

/// A single `(price, quantity)` pair as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
}

impl PriceLevel {
    pub fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }
}

/// Full replacement content for both ladders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub mid_price: Option<Price>,
}

/// Changes since the previous event. Quantity ≤ 0 removes the level,
/// quantity > 0 sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDiff {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub mid_price: Option<Price>,
}

impl BookDiff {
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

/// A public execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub price: Price,
    /// Unix milliseconds as reported by the feed.
    pub timestamp: i64,
    pub side: Option<Side>,
}

/// Everything the feed source hands to the reconciler, in feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Snapshot(BookSnapshot),
    Diff(BookDiff),
    Trades(Vec<Trade>),
}

/// Venue-wide resting size per side, refreshed by the status poller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideTotals {
    pub bid: Quantity,
    pub ask: Quantity,
}

/// Venue health string as reported by the status source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Health(String);

impl Health {
    pub const NORMAL: &'static str = "NORMAL";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn normal() -> Self {
        Self::new(Self::NORMAL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_normal(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::NORMAL)
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
