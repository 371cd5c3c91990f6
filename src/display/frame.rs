//! One frame's worth of aggregated data, built outside the store lock.

use crate::aggregator::{Bucket, SideStats, aggregate, summarize};
use crate::book::BookState;
use crate::models::{Health, Price, Quantity, Side, SideTotals};

/// Everything the renderer needs; independent of the live store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    /// Best first: ascending prices.
    pub asks: Vec<Bucket>,
    /// Best first: descending prices.
    pub bids: Vec<Bucket>,
    pub ask_stats: SideStats,
    pub bid_stats: SideStats,
    pub ltp: Option<Price>,
    pub spread: Option<Price>,
    pub health: Health,
    pub totals: SideTotals,
    pub group: u32,
}

impl DepthFrame {
    /// Largest bucket quantity on either side; bars are scaled to it.
    pub fn max_shown(&self) -> &Quantity {
        if self.ask_stats.max_quantity >= self.bid_stats.max_quantity {
            &self.ask_stats.max_quantity
        } else {
            &self.bid_stats.max_quantity
        }
    }
}

/// Aggregates a copied book view for a grid with `rows` rows per side.
///
/// Returns `None` while either ladder is empty: nothing meaningful can be
/// drawn yet and the caller skips the cycle.
pub fn prepare_frame(view: &BookState, group: u32, rows: usize) -> Option<DepthFrame> {
    if !view.is_ready() {
        return None;
    }

    let mut asks = aggregate(view.ladder(Side::Ask), Side::Ask, group);
    let mut bids = aggregate(view.ladder(Side::Bid), Side::Bid, group);
    asks.truncate(rows);
    bids.truncate(rows);

    Some(DepthFrame {
        ask_stats: summarize(&asks, rows),
        bid_stats: summarize(&bids, rows),
        asks,
        bids,
        ltp: view.ltp.clone(),
        spread: view.spread(),
        health: view.health.clone(),
        totals: view.totals.clone(),
        group,
    })
}
