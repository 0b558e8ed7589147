//! Bar aggregator: raw provider records in, canonical bars out.
//!
//! Canonical means strictly increasing timestamps, no duplicates (last write
//! wins) and every bar satisfying `Bar::is_sane`. Malformed records are
//! dropped and counted, never fatal.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::provider::{RawCandle, RawTrade, SourcePayload};
use crate::domain::{Bar, Interval};

/// What the aggregator did to the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub input_records: usize,
    /// Records with at least one required field absent.
    pub dropped_missing: usize,
    /// Complete records that violate the OHLC invariant or carry a non-positive price.
    pub dropped_invalid: usize,
    pub duplicates_collapsed: usize,
    /// Trades folded into buckets (zero for candle input).
    pub trades_folded: usize,
    /// Largest number of trades folded into a single bar.
    #[serde(default)]
    pub max_trades_per_bar: usize,
    pub output_bars: usize,
}

impl AggregationReport {
    pub fn dropped(&self) -> usize {
        self.dropped_missing + self.dropped_invalid
    }
}

/// Canonicalizer for bar data
pub struct Canonicalizer;

impl Canonicalizer {
    /// Aggregate whatever the provider returned into canonical bars.
    pub fn aggregate(payload: SourcePayload, interval: Interval) -> (Vec<Bar>, AggregationReport) {
        match payload {
            SourcePayload::Candles(candles) => Self::from_candles(candles),
            SourcePayload::Trades(trades) => Self::from_trades(trades, interval),
        }
    }

    /// Normalize pre-aggregated candles: drop malformed records, sort, dedupe.
    pub fn from_candles(candles: Vec<RawCandle>) -> (Vec<Bar>, AggregationReport) {
        let mut report = AggregationReport {
            input_records: candles.len(),
            ..Default::default()
        };

        let mut bars = Vec::with_capacity(candles.len());
        for raw in candles {
            let (Some(timestamp), Some(open), Some(high), Some(low), Some(close), Some(volume)) =
                (raw.timestamp, raw.open, raw.high, raw.low, raw.close, raw.volume)
            else {
                report.dropped_missing += 1;
                continue;
            };
            let bar = Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            };
            if !bar.is_sane() {
                report.dropped_invalid += 1;
                continue;
            }
            bars.push(bar);
        }

        let bars = Self::canonicalize(bars, &mut report);
        Self::log_drops(&report);
        (bars, report)
    }

    /// Fold raw trades into fixed-width buckets.
    ///
    /// Bucket start is `floor(ts / width) * width`. Within a bucket, trades are
    /// applied in timestamp order: the first sets `open`, the last sets `close`,
    /// extremes set `high`/`low` and amounts sum into `volume`.
    pub fn from_trades(trades: Vec<RawTrade>, interval: Interval) -> (Vec<Bar>, AggregationReport) {
        let mut report = AggregationReport {
            input_records: trades.len(),
            ..Default::default()
        };

        let mut valid: Vec<(i64, Decimal, Decimal)> = Vec::with_capacity(trades.len());
        for raw in trades {
            let (Some(ts), Some(price), Some(amount)) = (raw.timestamp, raw.price, raw.amount)
            else {
                report.dropped_missing += 1;
                continue;
            };
            if price <= Decimal::ZERO || amount < Decimal::ZERO {
                report.dropped_invalid += 1;
                continue;
            }
            valid.push((ts, price, amount));
        }
        // Stable: trades sharing a timestamp keep arrival order.
        valid.sort_by_key(|(ts, _, _)| *ts);

        let mut buckets: BTreeMap<i64, TradeBucket> = BTreeMap::new();
        for (ts, price, amount) in valid {
            buckets
                .entry(interval.bucket_start(ts))
                .and_modify(|b| b.push(price, amount))
                .or_insert_with(|| TradeBucket::open(price, amount));
            report.trades_folded += 1;
        }

        report.max_trades_per_bar = buckets.values().map(|b| b.trades).max().unwrap_or(0);
        let bars = buckets
            .into_iter()
            .map(|(timestamp, b)| Bar {
                timestamp,
                open: b.open,
                high: b.high,
                low: b.low,
                close: b.close,
                volume: b.volume,
            })
            .collect();

        let bars = Self::canonicalize(bars, &mut report);
        Self::log_drops(&report);
        (bars, report)
    }

    /// Stable sort by timestamp; duplicate timestamps collapse to the last record.
    pub fn canonicalize(mut bars: Vec<Bar>, report: &mut AggregationReport) -> Vec<Bar> {
        bars.sort_by_key(|b| b.timestamp);

        let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match out.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => {
                    *last = bar;
                    report.duplicates_collapsed += 1;
                }
                _ => out.push(bar),
            }
        }
        report.output_bars = out.len();
        out
    }

    fn log_drops(report: &AggregationReport) {
        if report.dropped() > 0 || report.duplicates_collapsed > 0 {
            warn!(
                dropped_missing = report.dropped_missing,
                dropped_invalid = report.dropped_invalid,
                duplicates_collapsed = report.duplicates_collapsed,
                kept = report.output_bars,
                "aggregator discarded records"
            );
        }
    }
}

#[derive(Debug, Clone)]
struct TradeBucket {
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    trades: usize,
}

impl TradeBucket {
    fn open(price: Decimal, amount: Decimal) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            volume: amount,
            trades: 1,
        }
    }

    fn push(&mut self, price: Decimal, amount: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume = self.volume.saturating_add(amount);
        self.trades += 1;
    }
}
