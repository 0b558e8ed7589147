//! Candle sources and bar aggregation

pub mod birdeye;
pub mod canonicalize;
pub mod file;
pub mod provider;
pub mod synthetic;

pub use birdeye::BirdeyeSource;
pub use canonicalize::{AggregationReport, Canonicalizer};
pub use file::FileSource;
pub use provider::{
    fetch_bars, CandleSource, DataError, DataSource, FetchRequest, FetchResult, LoadedBars,
    RawCandle, RawTrade, SourcePayload,
};
pub use synthetic::SyntheticSource;
