//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single token over one interval.
///
/// `timestamp` is the bucket start in milliseconds since the UTC epoch.
/// Provider-specific fields never survive into a `Bar`; the aggregator strips them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Basic OHLCV sanity check: `low <= min(open, close) <= max(open, close) <= high`,
    /// strictly positive prices and non-negative volume.
    pub fn is_sane(&self) -> bool {
        self.low > Decimal::ZERO
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
            && self.volume >= Decimal::ZERO
    }

    /// Bucket start as a UTC datetime, if the timestamp is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}
