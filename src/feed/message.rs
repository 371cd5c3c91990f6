//! Venue-neutral JSON messages understood by every feed source.
//!
//! ```json
//! {"type":"snapshot","bids":[["99","1.5"]],"asks":[["100","2"]],"mid_price":"99.5"}
//! {"type":"diff","asks":[["100","0"]]}
//! {"type":"trades","trades":[{"price":"100","timestamp":1700000000000,"side":"buy"}]}
//! ```
//!
//! Prices and sizes may be decimal strings or plain JSON numbers.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::errors::Result;
use crate::models::{BookDiff, BookSnapshot, FeedEvent, PriceLevel, Side, Trade};

/// A decimal as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum DecimalRepr {
    Text(String),
    Number(f64),
}

impl DecimalRepr {
    pub(crate) fn to_decimal(&self) -> Result<BigDecimal> {
        match self {
            DecimalRepr::Text(text) => Ok(BigDecimal::from_str(text.trim())?),
            // Shortest round-trip text, so 0.1 stays 0.1.
            DecimalRepr::Number(n) => Ok(BigDecimal::from_str(&n.to_string())?),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookPayload {
    #[serde(default)]
    bids: Vec<[DecimalRepr; 2]>,
    #[serde(default)]
    asks: Vec<[DecimalRepr; 2]>,
    #[serde(default)]
    mid_price: Option<DecimalRepr>,
}

#[derive(Debug, Deserialize)]
struct TradePayload {
    price: DecimalRepr,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    side: Option<Side>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeedMessage {
    Snapshot(BookPayload),
    Diff(BookPayload),
    Trades { trades: Vec<TradePayload> },
}

/// Parses one text frame / line into a [`FeedEvent`].
pub fn decode(text: &str) -> Result<FeedEvent> {
    let message: FeedMessage = serde_json::from_str(text)?;
    Ok(match message {
        FeedMessage::Snapshot(payload) => {
            let (bids, asks, mid_price) = payload.into_parts()?;
            FeedEvent::Snapshot(BookSnapshot {
                bids,
                asks,
                mid_price,
            })
        }
        FeedMessage::Diff(payload) => {
            let (bids, asks, mid_price) = payload.into_parts()?;
            FeedEvent::Diff(BookDiff {
                bids,
                asks,
                mid_price,
            })
        }
        FeedMessage::Trades { trades } => FeedEvent::Trades(
            trades
                .into_iter()
                .map(|t| {
                    Ok(Trade {
                        price: t.price.to_decimal()?,
                        timestamp: t.timestamp,
                        side: t.side,
                    })
                })
                .collect::<Result<_>>()?,
        ),
    })
}

type Parts = (Vec<PriceLevel>, Vec<PriceLevel>, Option<BigDecimal>);

impl BookPayload {
    fn into_parts(self) -> Result<Parts> {
        let mid_price = self.mid_price.as_ref().map(DecimalRepr::to_decimal).transpose()?;
        Ok((levels(&self.bids)?, levels(&self.asks)?, mid_price))
    }
}

fn levels(raw: &[[DecimalRepr; 2]]) -> Result<Vec<PriceLevel>> {
    raw.iter()
        .map(|[price, qty]| Ok(PriceLevel::new(price.to_decimal()?, qty.to_decimal()?)))
        .collect()
}
