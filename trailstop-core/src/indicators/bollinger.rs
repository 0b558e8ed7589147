//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + k * stddev(close, period)
//! - Lower: middle - k * stddev(close, period)
//!
//! Uses population stddev (divide by N). A window whose variance overflows
//! `Decimal` is absent.
//! Lookback: period - 1.

use rust_decimal::{Decimal, MathematicalOps};

use super::sma::Sma;
use super::Indicator;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: Decimal,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(band: BollingerBand, period: usize, multiplier: Decimal) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: Decimal) -> Self {
        Self::new(BollingerBand::Upper, period, multiplier)
    }

    pub fn middle(period: usize, multiplier: Decimal) -> Self {
        Self::new(BollingerBand::Middle, period, multiplier)
    }

    pub fn lower(period: usize, multiplier: Decimal) -> Self {
        Self::new(BollingerBand::Lower, period, multiplier)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, closes: &[Decimal]) -> Vec<Option<Decimal>> {
        let means = Sma::new(self.period).compute(closes);
        if self.band == BollingerBand::Middle {
            return means;
        }

        let divisor = Decimal::from(self.period);
        means
            .iter()
            .enumerate()
            .map(|(i, mean)| {
                let mean = (*mean)?;
                let window = &closes[i + 1 - self.period..=i];
                let mut squares = window.iter().map(|c| {
                    let diff = c.checked_sub(mean)?;
                    diff.checked_mul(diff)
                });
                let variance = squares
                    .try_fold(Decimal::ZERO, |acc, sq| acc.checked_add(sq?))?
                    .checked_div(divisor)?;
                let width = self.multiplier.checked_mul(variance.sqrt()?)?;
                match self.band {
                    BollingerBand::Upper => mean.checked_add(width),
                    _ => mean.checked_sub(width),
                }
            })
            .collect()
    }
}
