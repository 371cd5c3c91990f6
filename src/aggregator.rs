//! Price-bucket aggregation for the depth chart.
//!
//! Raw levels are grouped into buckets of `group` price units. Ask buckets
//! are labelled by their upper bound (prices round up), bid buckets by their
//! lower bound (prices round down), so a bucket never claims a better price
//! than the levels it contains.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::models::{Ladder, Price, Quantity, Side};

/// Rows reserved around the ladders: label row, midline and border.
const ROW_MARGIN: u16 = 2;

/// One aggregated row of the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub price: Price,
    pub quantity: Quantity,
}

impl Bucket {
    pub fn new(price: Price, quantity: Quantity) -> Self {
        Self { price, quantity }
    }
}

/// Per-side figures over the buckets that fit on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideStats {
    pub total_quantity: Quantity,
    pub notional: BigDecimal,
    pub max_quantity: Quantity,
    /// Volume-weighted average price; `None` when nothing is shown.
    pub vwap: Option<Price>,
}

/// Maps a raw price to the label of the bucket containing it.
///
/// `group <= 1` is the identity. Asks round up to the next multiple of
/// `group`, bids round down. The remainder is exact, so fractional prices
/// land on multiples too.
pub fn bucket_price(price: &Price, side: Side, group: u32) -> Price {
    if group <= 1 {
        return price.clone();
    }
    let unit = BigDecimal::from(group);
    let rem = price.clone() % unit.clone();
    if rem.is_zero() {
        return price.clone();
    }
    match side {
        Side::Ask => price.clone() + (unit - rem),
        Side::Bid => price.clone() - rem,
    }
}

/// Collapses a ladder into buckets, best price first: asks ascending, bids
/// descending. Quantities of every price mapping to a bucket are summed.
pub fn aggregate(ladder: &Ladder, side: Side, group: u32) -> Vec<Bucket> {
    let mut grouped: BTreeMap<Price, Quantity> = BTreeMap::new();
    for (price, quantity) in ladder {
        *grouped
            .entry(bucket_price(price, side, group))
            .or_insert_with(Quantity::zero) += quantity;
    }

    let buckets = grouped
        .into_iter()
        .map(|(price, quantity)| Bucket::new(price, quantity));
    match side {
        Side::Ask => buckets.collect(),
        Side::Bid => buckets.rev().collect(),
    }
}

/// Totals, notional, largest bucket and VWAP over the first `rows` buckets.
pub fn summarize(buckets: &[Bucket], rows: usize) -> SideStats {
    let mut stats = SideStats::default();
    for bucket in buckets.iter().take(rows) {
        stats.total_quantity += &bucket.quantity;
        stats.notional += &bucket.price * &bucket.quantity;
        if bucket.quantity > stats.max_quantity {
            stats.max_quantity = bucket.quantity.clone();
        }
    }
    if !stats.total_quantity.is_zero() {
        stats.vwap = Some(&stats.notional / &stats.total_quantity);
    }
    stats
}

/// How many buckets fit on each side of a grid `height` rows tall.
pub fn display_rows(height: u16) -> usize {
    usize::from((height / 2).saturating_sub(ROW_MARGIN))
}
