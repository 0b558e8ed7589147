//! Local file source: JSON or CSV exports of provider data.
//!
//! JSON files hold either `{"candles": [...]}`, `{"trades": [...]}` or a bare
//! array of candles. CSV files need a `timestamp,open,high,low,close,volume`
//! header; empty cells become missing fields and are dropped by the aggregator.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::provider::{
    CandleSource, DataError, DataSource, FetchRequest, FetchResult, RawCandle, SourcePayload,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum FileContents {
    Tagged(SourcePayload),
    Bare(Vec<RawCandle>),
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file. The request window is applied later by `fetch_bars`.
    pub fn load(&self) -> Result<SourcePayload, DataError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| DataError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let is_csv = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            parse_csv(&text)
        } else {
            parse_json(&text)
        }
    }
}

impl CandleSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
        Ok(FetchResult {
            token: request.token.clone(),
            payload: self.load()?,
            source: DataSource::File,
        })
    }
}

pub fn parse_json(text: &str) -> Result<SourcePayload, DataError> {
    let contents: FileContents =
        serde_json::from_str(text).map_err(|e| DataError::Parse(format!("invalid JSON: {e}")))?;
    Ok(match contents {
        FileContents::Tagged(payload) => payload,
        FileContents::Bare(candles) => SourcePayload::Candles(candles),
    })
}

pub fn parse_csv(text: &str) -> Result<SourcePayload, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut candles = Vec::new();
    for (line, record) in reader.deserialize::<RawCandle>().enumerate() {
        let candle =
            record.map_err(|e| DataError::Parse(format!("CSV record {}: {e}", line + 1)))?;
        candles.push(candle);
    }
    Ok(SourcePayload::Candles(candles))
}
