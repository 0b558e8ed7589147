//! Bar loading for the runner.
//!
//! Resolves the `[data]` table into a concrete candle source, fetches the
//! requested window and normalizes it through the aggregator. An empty
//! window is returned as-is; the caller decides whether that is fatal.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use trailstop_core::data::{
    fetch_bars, AggregationReport, BirdeyeSource, CandleSource, DataError, DataSource,
    FetchRequest, FileSource, SyntheticSource,
};
use trailstop_core::domain::Bar;

use crate::config::{ConfigError, DataSection, SourceKind};

/// Environment variable consulted for the Birdeye API key.
pub const API_KEY_ENV: &str = "BIRDEYE_API_KEY";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data.path is required for file sources")]
    MissingPath,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options that do not belong in a config file.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Birdeye API key. Falls back to `BIRDEYE_API_KEY` when `None`.
    pub api_key: Option<String>,
    /// Reference time for relative windows.
    pub now: DateTime<Utc>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            now: Utc::now(),
        }
    }
}

/// Bars for one token, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub report: AggregationReport,
    pub source: DataSource,
    pub request: FetchRequest,
}

/// Build the candle source described by `data`.
pub fn build_source(
    data: &DataSection,
    opts: &LoadOptions,
) -> Result<(Box<dyn CandleSource>, DataSource), LoadError> {
    match data.source {
        SourceKind::File => {
            let path = data.path.as_ref().ok_or(LoadError::MissingPath)?;
            Ok((Box::new(FileSource::new(path)), DataSource::File))
        }
        SourceKind::Birdeye => {
            let key = opts
                .api_key
                .clone()
                .or_else(|| std::env::var(API_KEY_ENV).ok())
                .unwrap_or_default();
            let mut source = BirdeyeSource::new(key)?;
            if let Some(url) = &data.base_url {
                source = source.with_base_url(url);
            }
            if let Some(chain) = &data.chain {
                source = source.with_chain(chain);
            }
            Ok((Box::new(source), DataSource::Birdeye))
        }
        SourceKind::Synthetic => Ok((
            Box::new(SyntheticSource::new(data.seed)),
            DataSource::Synthetic,
        )),
    }
}

/// Fetch and normalize the configured window.
pub fn load_bars(data: &DataSection, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let (start_ms, end_ms) = data.time_range(opts.now)?;
    let request = FetchRequest::new(data.token.clone(), start_ms, end_ms, data.interval);
    let (source, kind) = build_source(data, opts)?;

    let loaded = fetch_bars(source.as_ref(), &request)?;
    if loaded.report.dropped() > 0 {
        warn!(
            token = %request.token,
            dropped_missing = loaded.report.dropped_missing,
            dropped_invalid = loaded.report.dropped_invalid,
            "records dropped during aggregation"
        );
    }
    info!(
        source = source.name(),
        token = %request.token,
        interval = %request.interval,
        bars = loaded.bars.len(),
        "bars loaded"
    );

    Ok(LoadedData {
        bars: loaded.bars,
        report: loaded.report,
        source: kind,
        request,
    })
}
