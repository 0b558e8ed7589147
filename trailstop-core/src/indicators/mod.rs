//! Indicator engine.
//!
//! Indicators are pure functions: a close-price series in, a series of the
//! same length out. A value is `None` until enough warm-up bars exist. They
//! are computed once over the whole series and read per bar through
//! `IndicatorSet`; there is no streaming variant.
//!
//! # Look-ahead guard
//! No value at index t may depend on closes after t. Truncating the input
//! never changes the values that remain.

pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;

pub use bollinger::{Bollinger, BollingerBand};
pub use ema::Ema;
pub use rsi::Rsi;
pub use sma::Sma;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14", "ema_20").
    fn name(&self) -> &str;

    /// Number of leading indices that are `None`.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the full series. Output length equals input length.
    fn compute(&self, closes: &[Decimal]) -> Vec<Option<Decimal>>;
}

/// Periods for the indicators that feed the entry signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub bb_period: usize,
    pub bb_multiplier: Decimal,
    pub ema_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            bb_period: 20,
            bb_multiplier: Decimal::TWO,
            ema_period: 20,
        }
    }
}

impl IndicatorConfig {
    /// Bars needed before every indicator is defined.
    pub fn warmup_bars(&self) -> usize {
        (self.rsi_period + 1).max(self.bb_period).max(1)
    }
}

/// Read-only per-bar view of every indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi: Option<Decimal>,
    pub bb_lower: Option<Decimal>,
    pub bb_middle: Option<Decimal>,
    pub bb_upper: Option<Decimal>,
    pub ema: Option<Decimal>,
}

impl IndicatorSet {
    pub fn is_complete(&self) -> bool {
        self.rsi.is_some()
            && self.bb_lower.is_some()
            && self.bb_middle.is_some()
            && self.bb_upper.is_some()
            && self.ema.is_some()
    }
}

/// Sum of `values`, or `None` on decimal overflow.
pub fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

pub fn closes(bars: &[Bar]) -> Vec<Decimal> {
    bars.iter().map(|b| b.close).collect()
}

/// Compute every indicator over `bars`; element i is the view at bar i.
pub fn compute_indicator_sets(bars: &[Bar], config: &IndicatorConfig) -> Vec<IndicatorSet> {
    let closes = closes(bars);
    let rsi = Rsi::new(config.rsi_period).compute(&closes);
    let lower = Bollinger::lower(config.bb_period, config.bb_multiplier).compute(&closes);
    let middle = Bollinger::middle(config.bb_period, config.bb_multiplier).compute(&closes);
    let upper = Bollinger::upper(config.bb_period, config.bb_multiplier).compute(&closes);
    let ema = Ema::new(config.ema_period).compute(&closes);

    (0..closes.len())
        .map(|i| IndicatorSet {
            rsi: rsi[i],
            bb_lower: lower[i],
            bb_middle: middle[i],
            bb_upper: upper[i],
            ema: ema[i],
        })
        .collect()
}

// ── Test helpers ─────────────────────────────────────────────────────

#[cfg(test)]
pub fn closes_of(values: &[i64]) -> Vec<Decimal> {
    values.iter().map(|&v| Decimal::from(v)).collect()
}

/// Bars whose close follows `closes`, with open at the previous close.
#[cfg(test)]
pub fn make_bars(closes: &[Decimal]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: i as i64 * 60_000,
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: Decimal::ONE_THOUSAND,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: Decimal, expected: Decimal, epsilon: Decimal) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, epsilon={epsilon}"
    );
}
