//! Lock-guarded book state shared between the reconciler, the status
//! watchers and the render loop.
//!
//! Every access goes through [`BookStore::read`] / [`BookStore::write`].
//! Readers get an independent copy, so aggregation and rendering never run
//! inside the critical section.

use std::sync::Arc;

use num_traits::Zero;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::models::{Health, Ladder, Price, Quantity, Side, SideTotals};

/// Current view of the instrument.
///
/// Bid and ask ladders always reflect a fully applied snapshot or diff.
/// `totals` and `health` are refreshed on their own cadence and are only
/// eventually consistent with the ladders.
#[derive(Debug, Clone, Default)]
pub struct BookState {
    pub bids: Ladder,
    pub asks: Ladder,
    /// Last traded price; `None` until the first trade arrives.
    pub ltp: Option<Price>,
    pub mid_price: Option<Price>,
    pub health: Health,
    pub totals: SideTotals,
    /// When the last feed event was applied.
    pub updated_at: Option<Instant>,
}

impl BookState {
    pub fn ladder(&self, side: Side) -> &Ladder {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn ladder_mut(&mut self, side: Side) -> &mut Ladder {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Both ladders hold at least one level.
    pub fn is_ready(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<&Price> {
        self.bids.keys().next_back()
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<&Price> {
        self.asks.keys().next()
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<Price> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// Sum of every resting quantity on one side.
    pub fn depth(&self, side: Side) -> Quantity {
        self.ladder(side)
            .values()
            .fold(Quantity::zero(), |acc, qty| acc + qty)
    }
}

/// Shared handle; clones point at the same state.
#[derive(Debug, Clone, Default)]
pub struct BookStore {
    inner: Arc<RwLock<BookState>>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Independent copy of the whole state, taken under the read lock.
    pub fn read(&self) -> BookState {
        self.inner.read().clone()
    }

    /// Runs `f` under the read lock. Keep `f` short.
    pub fn with_read<R>(&self, f: impl FnOnce(&BookState) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` under the write lock; everything `f` changes becomes visible
    /// to readers at once.
    pub fn write<R>(&self, f: impl FnOnce(&mut BookState) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn set_totals(&self, totals: SideTotals) {
        self.write(|state| state.totals = totals);
    }

    pub fn set_health(&self, health: Health) {
        self.write(|state| state.health = health);
    }
}
