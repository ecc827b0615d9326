use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One timestamped observation of a symbol's price.
///
/// Price history is append-only: points are inserted, never mutated.
/// The "current price" of a symbol is the point with the newest timestamp;
/// the "previous price" (used by percent-move alerts) is the second newest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub price: Decimal,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub volume: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl PricePoint {
    /// A bare price observation with no intraday high/low/volume detail.
    pub fn simple(symbol: impl Into<String>, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            price,
            high: None,
            low: None,
            volume: None,
            timestamp,
        }
    }
}
