//! Relative Strength Index (RSI).
//!
//! Simple moving average of gains and losses over the trailing `period`
//! close-to-close deltas (not Wilder smoothing).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period (the first `period` indices are absent).
//! Edge case: avg_loss == 0 → RSI = 100.

use rust_decimal::Decimal;

use super::{checked_sum, Indicator};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, closes: &[Decimal]) -> Vec<Option<Decimal>> {
        let n = closes.len();
        let mut result = vec![None; n];
        if n < self.period + 1 {
            return result;
        }

        // deltas[i] = close[i+1] - close[i]
        let deltas: Vec<Option<Decimal>> =
            closes.windows(2).map(|w| w[1].checked_sub(w[0])).collect();
        let gain = |d: Decimal| d.max(Decimal::ZERO);
        let loss = |d: Decimal| (-d).max(Decimal::ZERO);
        let window_sums = |window: &[Option<Decimal>]| -> Option<(Decimal, Decimal)> {
            let window: Vec<Decimal> = window.iter().copied().collect::<Option<_>>()?;
            let gains = checked_sum(window.iter().copied().map(gain))?;
            let losses = checked_sum(window.iter().copied().map(loss))?;
            Some((gains, losses))
        };

        let mut sums = window_sums(&deltas[..self.period]);
        result[self.period] = sums.and_then(|(g, l)| compute_rsi(g, l));

        for i in (self.period + 1)..n {
            let entering = deltas[i - 1];
            let leaving = deltas[i - 1 - self.period];
            // Fall back to a full window sum when the rolling update overflows.
            sums = sums
                .zip(entering.zip(leaving))
                .and_then(|((g, l), (e, x))| {
                    let g = g.checked_add(gain(e))?.checked_sub(gain(x))?;
                    let l = l.checked_add(loss(e))?.checked_sub(loss(x))?;
                    Some((g, l))
                })
                .or_else(|| window_sums(&deltas[i - self.period..i]));
            result[i] = sums.and_then(|(g, l)| compute_rsi(g, l));
        }
        result
    }
}

/// Sums over the same window, so the period cancels out of the ratio.
/// `None` when the ratio overflows.
fn compute_rsi(gain_sum: Decimal, loss_sum: Decimal) -> Option<Decimal> {
    if loss_sum.is_zero() {
        return Some(Decimal::ONE_HUNDRED);
    }
    let rs = gain_sum.checked_div(loss_sum)?;
    let scaled = Decimal::ONE_HUNDRED.checked_div(Decimal::ONE.checked_add(rs)?)?;
    Some(Decimal::ONE_HUNDRED - scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, closes_of};
    use rust_decimal_macros::dec;

    #[test]
    fn rsi_all_gains() {
        let result = Rsi::new(3).compute(&closes_of(&[100, 101, 102, 103, 104, 105]));
        assert_eq!(result[3], Some(dec!(100)));
    }

    #[test]
    fn rsi_all_losses() {
        let result = Rsi::new(3).compute(&closes_of(&[105, 104, 103, 102, 101, 100]));
        assert_eq!(result[3], Some(dec!(0)));
    }

    #[test]
    fn rsi_flat_series_saturates_at_100() {
        let result = Rsi::new(3).compute(&closes_of(&[50, 50, 50, 50]));
        assert_eq!(result[3], Some(dec!(100)));
    }

    #[test]
    fn rsi_mixed_matches_hand_computation() {
        // changes: +0.34, -0.25, -0.48, +0.72
        // window 1..=3: gains 0.34, losses 0.73 → RSI = 100 - 100 / (1 + 0.34/0.73)
        // window 2..=4: gains 0.72, losses 0.73
        let closes = vec![dec!(44), dec!(44.34), dec!(44.09), dec!(43.61), dec!(44.33)];
        let result = Rsi::new(3).compute(&closes);
        assert!(result[..3].iter().all(Option::is_none));
        assert_approx(result[3].unwrap(), dec!(31.7757009), dec!(0.00001));
        assert_approx(result[4].unwrap(), dec!(49.6551724), dec!(0.00001));
    }

    #[test]
    fn rsi_warmup_over_short_series_is_absent() {
        let closes = closes_of(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert!(Rsi::new(14).compute(&closes).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_defined_from_period_index() {
        let closes: Vec<Decimal> = (0..20).map(|i| Decimal::from(100 + (i % 3))).collect();
        let result = Rsi::new(14).compute(&closes);
        assert!(result[..14].iter().all(Option::is_none));
        assert!(result[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_bounds() {
        let closes = closes_of(&[100, 105, 98, 110, 95, 115, 90, 120]);
        for v in Rsi::new(3).compute(&closes).into_iter().flatten() {
            assert!(v >= Decimal::ZERO && v <= Decimal::ONE_HUNDRED, "RSI out of bounds: {v}");
        }
    }

    #[test]
    fn rsi_overflowing_window_is_absent() {
        let huge = Decimal::MAX / dec!(4) * dec!(3);
        let closes = vec![dec!(1), huge, dec!(1), huge, dec!(1), dec!(2), dec!(3), dec!(4)];
        let result = Rsi::new(3).compute(&closes);
        // Two large gains in the first window sum past Decimal::MAX.
        assert_eq!(result[3], None);
        assert!(result[5].is_some());
        assert_eq!(result[7], Some(dec!(100)));
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
