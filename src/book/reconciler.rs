//! Applies feed events to the [`BookStore`].
//!
//! Responsibilities:
//! • Replace both ladders on a snapshot (refresh path).
//! • Upsert / remove levels on a diff, as one atomic write.
//! • Track the last traded price from trade batches.
//!
//! Events are applied strictly in channel order. Nothing is reordered or
//! coalesced; a feed that delivers out of order leaves the book wrong until
//! the next snapshot.

use num_traits::Zero;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::book::store::BookStore;
use crate::models::{BookDiff, BookSnapshot, FeedEvent, Ladder, PriceLevel, Quantity, Side, Trade};

/// Single writer of the book ladders.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: BookStore,
}

impl Reconciler {
    pub fn new(store: BookStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    pub fn apply(&self, event: &FeedEvent) {
        match event {
            FeedEvent::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            FeedEvent::Diff(diff) => self.apply_diff(diff),
            FeedEvent::Trades(trades) => self.apply_trades(trades),
        }
    }

    /// Replaces both ladders wholesale. Levels with quantity ≤ 0 are dropped.
    pub fn apply_snapshot(&self, snapshot: &BookSnapshot) {
        // Built outside the lock; the swap itself is the only critical work.
        let bids = build_ladder(&snapshot.bids);
        let asks = build_ladder(&snapshot.asks);
        let (bid_levels, ask_levels) = (bids.len(), asks.len());

        self.store.write(|state| {
            state.bids = bids;
            state.asks = asks;
            state.mid_price = snapshot.mid_price.clone();
            state.updated_at = Some(Instant::now());
        });

        debug!(bid_levels, ask_levels, "[BOOK] snapshot applied");
    }

    /// Applies every pair of the diff under one write lock.
    pub fn apply_diff(&self, diff: &BookDiff) {
        let removed = self.store.write(|state| {
            let mut removed = 0;
            for side in [Side::Bid, Side::Ask] {
                removed += apply_levels(state.ladder_mut(side), diff.levels(side));
            }
            if let Some(mid) = &diff.mid_price {
                state.mid_price = Some(mid.clone());
            }
            state.updated_at = Some(Instant::now());
            removed
        });

        debug!(
            bids = diff.bids.len(),
            asks = diff.asks.len(),
            removed,
            "[BOOK] diff applied"
        );
    }

    /// Ltp follows the last trade of the batch in feed order.
    pub fn apply_trades(&self, trades: &[Trade]) {
        let Some(last) = trades.last() else {
            return;
        };
        self.store.write(|state| {
            state.ltp = Some(last.price.clone());
            state.updated_at = Some(Instant::now());
        });
    }

    /// Consumes events until the channel closes or `cancel` fires.
    pub async fn run(self, mut rx: mpsc::Receiver<FeedEvent>, cancel: CancellationToken) {
        let mut applied: u64 = 0;
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.apply(&event);
            applied += 1;
        }
        info!(applied, "[BOOK] reconciler stopped");
    }
}

fn build_ladder(levels: &[PriceLevel]) -> Ladder {
    levels
        .iter()
        .filter(|level| level.quantity > Quantity::zero())
        .map(|level| (level.price.clone(), level.quantity.clone()))
        .collect()
}

/// Upserts positive quantities and removes the rest. A negative quantity is
/// treated as a removal rather than rejected. Returns how many levels were
/// actually removed.
fn apply_levels(ladder: &mut Ladder, levels: &[PriceLevel]) -> usize {
    let mut removed = 0;
    for level in levels {
        if level.quantity > Quantity::zero() {
            ladder.insert(level.price.clone(), level.quantity.clone());
        } else if ladder.remove(&level.price).is_some() {
            removed += 1;
        }
    }
    removed
}
