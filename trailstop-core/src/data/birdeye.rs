//! Birdeye OHLCV provider.
//!
//! `GET {base}/defi/ohlcv?address=..&type=..&time_from=..&time_to=..` with the
//! API key in `X-API-KEY`. Timestamps travel in seconds and are converted to
//! milliseconds. No retries: a transport failure surfaces as
//! `DataError::Network` and the caller decides whether to try again.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use super::provider::{
    CandleSource, DataError, DataSource, FetchRequest, FetchResult, RawCandle, SourcePayload,
};
use crate::domain::Interval;

pub const DEFAULT_BASE_URL: &str = "https://public-api.birdeye.so";
pub const DEFAULT_CHAIN: &str = "solana";

#[derive(Debug, Deserialize)]
struct OhlcvResponse {
    data: Option<OhlcvData>,
    success: Option<bool>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OhlcvData {
    items: Vec<OhlcvItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OhlcvItem {
    unix_time: Option<i64>,
    o: Option<serde_json::Number>,
    h: Option<serde_json::Number>,
    l: Option<serde_json::Number>,
    c: Option<serde_json::Number>,
    v: Option<serde_json::Number>,
}

pub struct BirdeyeSource {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    chain: String,
}

impl BirdeyeSource {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DataError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::AuthenticationRequired(
                "Birdeye API key is empty".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            chain: DEFAULT_CHAIN.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = chain.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Birdeye spells hour and day intervals in upper case.
    pub fn interval_param(interval: Interval) -> &'static str {
        match interval {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1H",
            Interval::FourHours => "4H",
            Interval::OneDay => "1D",
        }
    }

    /// Parse a response body into raw candles.
    pub fn parse_response(body: &str) -> Result<Vec<RawCandle>, DataError> {
        let resp: OhlcvResponse = serde_json::from_str(body)
            .map_err(|e| DataError::ResponseFormat(format!("failed to parse OHLCV body: {e}")))?;

        if resp.success == Some(false) {
            return Err(DataError::ResponseFormat(
                resp.message.unwrap_or_else(|| "provider reported failure".into()),
            ));
        }
        let data = resp
            .data
            .ok_or_else(|| DataError::ResponseFormat("missing 'data' object".into()))?;

        Ok(data
            .items
            .into_iter()
            .map(|item| RawCandle {
                timestamp: item.unix_time.and_then(|s| s.checked_mul(1_000)),
                open: item.o.as_ref().and_then(number_to_decimal),
                high: item.h.as_ref().and_then(number_to_decimal),
                low: item.l.as_ref().and_then(number_to_decimal),
                close: item.c.as_ref().and_then(number_to_decimal),
                volume: item.v.as_ref().and_then(number_to_decimal),
            })
            .collect())
    }
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

impl CandleSource for BirdeyeSource {
    fn name(&self) -> &str {
        "birdeye"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
        let url = format!("{}/defi/ohlcv", self.base_url.trim_end_matches('/'));
        let time_from = request.start_ms.div_euclid(1_000).to_string();
        let time_to = request.end_ms.div_euclid(1_000).to_string();
        debug!(token = %request.token, interval = %request.interval, "requesting Birdeye OHLCV");

        let resp = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("X-Chain", &self.chain)
            .header("Accept", "application/json")
            .query(&[
                ("address", request.token.as_str()),
                ("type", Self::interval_param(request.interval)),
                ("time_from", time_from.as_str()),
                ("time_to", time_to.as_str()),
            ])
            .send()
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::AuthenticationRequired(
                "Birdeye rejected the API key".into(),
            ));
        }
        let body = resp
            .text()
            .map_err(|e| DataError::Network(format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let candles = Self::parse_response(&body)?;
        info!(token = %request.token, candles = candles.len(), "received Birdeye candles");
        Ok(FetchResult {
            token: request.token.clone(),
            payload: SourcePayload::Candles(candles),
            source: DataSource::Birdeye,
        })
    }
}
