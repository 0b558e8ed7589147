//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: EMA[0] = close[0], so the series is defined from the first bar.
//! Lookback: 0.

use rust_decimal::Decimal;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn alpha(&self) -> Decimal {
        Decimal::TWO / Decimal::from(self.period + 1)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, closes: &[Decimal]) -> Vec<Option<Decimal>> {
        let alpha = self.alpha();
        let keep = Decimal::ONE - alpha;

        let mut result = Vec::with_capacity(closes.len());
        let mut prev: Option<Decimal> = None;
        for &close in closes {
            let ema = match prev {
                None => close,
                Some(p) => close * alpha + p * keep,
            };
            result.push(Some(ema));
            prev = Some(ema);
        }
        result
    }
}
