//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! Lookback: period - 1 (first value at index period-1).

use rust_decimal::Decimal;

use super::{checked_sum, Indicator};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, closes: &[Decimal]) -> Vec<Option<Decimal>> {
        let n = closes.len();
        let mut result = vec![None; n];
        if n < self.period {
            return result;
        }

        let divisor = Decimal::from(self.period);
        let mut sum = checked_sum(closes[..self.period].iter().copied());
        result[self.period - 1] = sum.map(|s| s / divisor);

        for i in self.period..n {
            // Fall back to a full window sum when the rolling update overflows.
            sum = sum
                .and_then(|s| s.checked_sub(closes[i - self.period]))
                .and_then(|s| s.checked_add(closes[i]))
                .or_else(|| checked_sum(closes[i + 1 - self.period..=i].iter().copied()));
            result[i] = sum.map(|s| s / divisor);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::closes_of;
    use rust_decimal_macros::dec;

    #[test]
    fn sma_basic() {
        let closes = closes_of(&[10, 11, 12, 13, 14]);
        let result = Sma::new(3).compute(&closes);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(dec!(11)));
        assert_eq!(result[3], Some(dec!(12)));
        assert_eq!(result[4], Some(dec!(13)));
    }

    #[test]
    fn sma_short_series_is_all_absent() {
        let result = Sma::new(5).compute(&closes_of(&[1, 2, 3]));
        assert!(result.iter().all(Option::is_none));
    }

    #[test]
    fn sma_overflowing_window_is_absent() {
        let closes = vec![Decimal::MAX, Decimal::MAX, dec!(1), dec!(2), dec!(3)];
        let result = Sma::new(2).compute(&closes);
        assert_eq!(result[1], None);
        assert_eq!(result[2], None);
        assert_eq!(result[3], Some(dec!(1.5)));
        assert_eq!(result[4], Some(dec!(2.5)));
    }

    #[test]
    fn sma_lookback() {
        assert_eq!(Sma::new(20).lookback(), 19);
    }
}
