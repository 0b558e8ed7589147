//! Candle source trait and structured error types.
//!
//! The `CandleSource` trait abstracts over data sources (JSON/CSV files, the
//! Birdeye OHLCV API, synthetic random walks) so the engine never depends on a
//! particular provider and tests can run without network access.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::canonicalize::{AggregationReport, Canonicalizer};
use crate::domain::{Bar, Interval};

/// Pre-aggregated candle as delivered by a provider, before validation.
///
/// Every field is optional: providers routinely omit values, and a record with
/// any field missing is dropped by the aggregator rather than failing the fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    pub timestamp: Option<i64>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
}

/// A single executed trade, folded into candles by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    pub timestamp: Option<i64>,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
}

/// Raw provider output: either candles or individual trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePayload {
    Candles(Vec<RawCandle>),
    Trades(Vec<RawTrade>),
}

impl SourcePayload {
    pub fn len(&self) -> usize {
        match self {
            SourcePayload::Candles(c) => c.len(),
            SourcePayload::Trades(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Transport failure. Retrying is the caller's responsibility.
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    File,
    Birdeye,
    Synthetic,
}

/// One fetch: a token over `[start_ms, end_ms]` at a fixed interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub token: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub interval: Interval,
}

impl FetchRequest {
    pub fn new(token: impl Into<String>, start_ms: i64, end_ms: i64, interval: Interval) -> Self {
        Self {
            token: token.into(),
            start_ms,
            end_ms,
            interval,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.token.trim().is_empty() {
            return Err(DataError::InvalidRequest("token must not be empty".into()));
        }
        if self.end_ms < self.start_ms {
            return Err(DataError::InvalidRequest(format!(
                "end ({}) precedes start ({})",
                self.end_ms, self.start_ms
            )));
        }
        Ok(())
    }
}

/// Result of a successful fetch for a single token.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub token: String,
    pub payload: SourcePayload,
    pub source: DataSource,
}

/// Trait for candle providers.
///
/// Implementations handle the specifics of talking to one source and return
/// raw records. Normalization into canonical bars happens in `fetch_bars`.
pub trait CandleSource: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError>;
}

/// Canonical bars plus the report of what the aggregator dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    pub report: AggregationReport,
}

/// Fetch a token's bars and normalize them.
///
/// Output is strictly increasing in timestamp and restricted to
/// `[start_ms, end_ms]`. An empty result means "no data" and is not an error.
pub fn fetch_bars(
    source: &dyn CandleSource,
    request: &FetchRequest,
) -> Result<LoadedBars, DataError> {
    request.validate()?;
    let fetched = source.fetch(request)?;
    debug!(
        source = source.name(),
        token = %fetched.token,
        records = fetched.payload.len(),
        "fetched raw records"
    );

    let (bars, report) = Canonicalizer::aggregate(fetched.payload, request.interval);
    let bars = bars
        .into_iter()
        .filter(|b| b.timestamp >= request.start_ms && b.timestamp <= request.end_ms)
        .collect();
    Ok(LoadedBars { bars, report })
}
