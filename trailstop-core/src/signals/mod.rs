//! Entry signals.
//!
//! Signals never depend on position state. They answer "would I enter on the
//! latest bar?" from market data alone, deterministically for the same bars.

pub mod oversold;

pub use oversold::OversoldEntry;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Side};

/// A signal firing on a specific bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub bar_index: usize,
    pub timestamp: i64,
    pub side: Side,
    pub price: Decimal,
}

pub trait Signal: Send + Sync {
    /// Evaluate the last bar of `bars`. `None` means no entry.
    fn evaluate(&self, bars: &[Bar]) -> Option<SignalEvent>;

    /// Signal name for logs and status output.
    fn name(&self) -> &str;

    /// Bars required before the signal can fire.
    fn max_lookback(&self) -> usize;
}
