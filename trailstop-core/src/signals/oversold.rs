//! Oversold mean-reversion entry.
//!
//! Buy when, on the latest bar, RSI is below the oversold threshold, the close
//! is below the lower Bollinger band and the close is below the EMA. Any
//! indicator still warming up means no signal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Signal, SignalEvent};
use crate::domain::{Bar, Side};
use crate::indicators::{compute_indicator_sets, IndicatorConfig, IndicatorSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OversoldEntry {
    pub rsi_oversold: Decimal,
    pub indicators: IndicatorConfig,
}

impl Default for OversoldEntry {
    fn default() -> Self {
        Self {
            rsi_oversold: Decimal::from(30),
            indicators: IndicatorConfig::default(),
        }
    }
}

impl OversoldEntry {
    /// Whether `price` satisfies every condition against one indicator row.
    pub fn is_entry(&self, price: Decimal, set: &IndicatorSet) -> bool {
        match (set.rsi, set.bb_lower, set.ema) {
            (Some(rsi), Some(bb_lower), Some(ema)) => {
                rsi < self.rsi_oversold && price < bb_lower && price < ema
            }
            _ => false,
        }
    }
}

impl Signal for OversoldEntry {
    fn evaluate(&self, bars: &[Bar]) -> Option<SignalEvent> {
        let last = bars.last()?;
        if bars.len() < self.max_lookback() {
            return None;
        }
        let sets = compute_indicator_sets(bars, &self.indicators);
        let set = sets.last()?;
        self.is_entry(last.close, set).then(|| SignalEvent {
            bar_index: bars.len() - 1,
            timestamp: last.timestamp,
            side: Side::Buy,
            price: last.close,
        })
    }

    fn name(&self) -> &str {
        "oversold_entry"
    }

    fn max_lookback(&self) -> usize {
        self.indicators.warmup_bars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use rust_decimal_macros::dec;

    fn set(rsi: Decimal, bb_lower: Decimal, ema: Decimal) -> IndicatorSet {
        IndicatorSet {
            rsi: Some(rsi),
            bb_lower: Some(bb_lower),
            bb_middle: Some(bb_lower + dec!(5)),
            bb_upper: Some(bb_lower + dec!(10)),
            ema: Some(ema),
        }
    }

    #[test]
    fn all_conditions_required() {
        let signal = OversoldEntry::default();
        assert!(signal.is_entry(dec!(90), &set(dec!(25), dec!(95), dec!(100))));
        assert!(!signal.is_entry(dec!(90), &set(dec!(30), dec!(95), dec!(100))));
        assert!(!signal.is_entry(dec!(96), &set(dec!(25), dec!(95), dec!(100))));
        assert!(!signal.is_entry(dec!(90), &set(dec!(25), dec!(95), dec!(89))));
    }

    #[test]
    fn absent_indicator_means_no_entry() {
        let signal = OversoldEntry::default();
        let mut s = set(dec!(10), dec!(95), dec!(100));
        s.ema = None;
        assert!(!signal.is_entry(dec!(50), &s));
    }

    #[test]
    fn capitulation_fires_on_last_bar() {
        // Flat at 100 then a sharp drop: RSI collapses, price under both bands and EMA.
        let mut closes = vec![dec!(100); 24];
        closes.extend([dec!(99), dec!(97), dec!(94), dec!(90), dec!(85)]);
        let bars = make_bars(&closes);
        let event = OversoldEntry::default().evaluate(&bars).unwrap();
        assert_eq!(event.bar_index, bars.len() - 1);
        assert_eq!(event.side, Side::Buy);
        assert_eq!(event.price, dec!(85));
    }

    #[test]
    fn too_few_bars_never_fire() {
        let bars = make_bars(&[dec!(100), dec!(50)]);
        assert!(OversoldEntry::default().evaluate(&bars).is_none());
        assert!(OversoldEntry::default().evaluate(&[]).is_none());
    }

    #[test]
    fn rising_market_does_not_fire() {
        let closes: Vec<Decimal> = (0..30).map(|i| Decimal::from(100 + i)).collect();
        assert!(OversoldEntry::default().evaluate(&make_bars(&closes)).is_none());
    }
}
