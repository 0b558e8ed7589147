//! Seeded random-walk candles for demos, benchmarks and offline runs.
//!
//! Same seed, same request ⇒ same candles. Returns are drawn in whole basis
//! points so every price stays an exact decimal.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use super::provider::{
    CandleSource, DataError, DataSource, FetchRequest, FetchResult, RawCandle, SourcePayload,
};

/// Upper bound on generated candles per request.
pub const MAX_SYNTHETIC_CANDLES: i64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    start_price: Decimal,
    /// Largest per-bar move, in basis points.
    max_step_bps: i64,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_price: Decimal::ONE_HUNDRED,
            max_step_bps: 150,
        }
    }

    pub fn with_start_price(mut self, start_price: Decimal) -> Self {
        self.start_price = start_price;
        self
    }

    pub fn with_max_step_bps(mut self, max_step_bps: i64) -> Self {
        self.max_step_bps = max_step_bps.max(1);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate candles covering every bucket in the request window.
    pub fn generate(&self, request: &FetchRequest) -> Result<Vec<RawCandle>, DataError> {
        if self.start_price <= Decimal::ZERO {
            return Err(DataError::InvalidRequest(
                "synthetic start price must be positive".into(),
            ));
        }
        let step = request.interval.millis();
        let first = request.interval.bucket_start(request.start_ms);
        let count = (request.end_ms - first).div_euclid(step) + 1;
        if count > MAX_SYNTHETIC_CANDLES {
            return Err(DataError::InvalidRequest(format!(
                "window spans {count} candles (limit {MAX_SYNTHETIC_CANDLES})"
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let floor = Decimal::new(1, 8);
        let mut price = self.start_price;
        let mut candles = Vec::with_capacity(count.max(0) as usize);

        for i in 0..count {
            let open = price;
            let ret = Decimal::new(rng.gen_range(-self.max_step_bps..=self.max_step_bps), 4);
            let close = (open * (Decimal::ONE + ret)).round_dp(8).max(floor);
            let upper_wick = Decimal::new(rng.gen_range(0..=self.max_step_bps / 2), 4);
            let lower_wick = Decimal::new(rng.gen_range(0..=self.max_step_bps / 2), 4);
            let high = (open.max(close) * (Decimal::ONE + upper_wick)).round_dp(8);
            let low = (open.min(close) * (Decimal::ONE - lower_wick))
                .round_dp(8)
                .max(floor)
                .min(open.min(close));
            let volume = Decimal::from(rng.gen_range(1_000u32..100_000));

            candles.push(RawCandle {
                timestamp: Some(first + i * step),
                open: Some(open),
                high: Some(high),
                low: Some(low),
                close: Some(close),
                volume: Some(volume),
            });
            price = close;
        }
        Ok(candles)
    }
}

impl CandleSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
        Ok(FetchResult {
            token: request.token.clone(),
            payload: SourcePayload::Candles(self.generate(request)?),
            source: DataSource::Synthetic,
        })
    }
}
