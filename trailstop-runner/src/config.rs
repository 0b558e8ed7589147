//! TOML run configuration.
//!
//! A config file has one required `[backtest]` table and optional `[data]`,
//! `[sweep]` and `[signal]` tables. Decimals may be written as strings
//! (`"0.05"`) or bare numbers.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use trailstop_core::domain::{Bar, Interval, Side};
use trailstop_core::position_management::{PositionError, PositionParams};
use trailstop_core::signals::OversoldEntry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub sweep: Option<SweepSection>,
    #[serde(default)]
    pub signal: OversoldEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub trading_pair: String,
    pub side: Side,
    pub amount: Decimal,
    /// Defaults to the first bar's close.
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    pub take_profit_pct: Decimal,
    pub trailing_activation_delta: Decimal,
    pub trailing_delta: Decimal,
}

/// Where bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    File,
    Birdeye,
    #[default]
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub source: SourceKind,
    pub token: String,
    pub interval: Interval,
    /// Required for `source = "file"`.
    pub path: Option<PathBuf>,
    /// `YYYY-MM-DD` or RFC 3339. Defaults to `end - lookback_days`.
    pub start: Option<String>,
    /// Defaults to now.
    pub end: Option<String>,
    pub lookback_days: u32,
    pub seed: u64,
    pub base_url: Option<String>,
    pub chain: Option<String>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            token: "SYNTH".into(),
            interval: Interval::FiveMinutes,
            path: None,
            start: None,
            end: None,
            lookback_days: 3,
            seed: 42,
            base_url: None,
            chain: None,
        }
    }
}

impl DataSection {
    /// Resolve `[start, end]` in epoch milliseconds.
    pub fn time_range(&self, now: DateTime<Utc>) -> Result<(i64, i64), ConfigError> {
        let end = match &self.end {
            Some(s) => parse_timestamp(s)?,
            None => now,
        };
        let start = match &self.start {
            Some(s) => parse_timestamp(s)?,
            None => end - Duration::days(i64::from(self.lookback_days)),
        };
        if end < start {
            return Err(ConfigError::Invalid(format!(
                "data.end ({end}) precedes data.start ({start})"
            )));
        }
        Ok((start.timestamp_millis(), end.timestamp_millis()))
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ConfigError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ConfigError::Invalid(format!("unrecognized timestamp '{s}'")))
}

/// Parameter ranges for a sweep. Each axis must be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSection {
    pub take_profit_pct: Vec<Decimal>,
    pub trailing_activation_delta: Vec<Decimal>,
    pub trailing_delta: Vec<Decimal>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject anything a run would fail on before any data is loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.trading_pair.trim().is_empty() {
            return Err(ConfigError::Invalid("backtest.trading_pair is empty".into()));
        }
        let fields = [
            ("amount", Some(b.amount)),
            ("entry_price", b.entry_price),
            ("take_profit_pct", Some(b.take_profit_pct)),
            ("trailing_activation_delta", Some(b.trailing_activation_delta)),
            ("trailing_delta", Some(b.trailing_delta)),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                if value <= Decimal::ZERO {
                    return Err(PositionError::NonPositive { field, value }.into());
                }
            }
        }
        if b.side == Side::Sell && b.take_profit_pct >= Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "backtest.take_profit_pct must be < 1 for a sell (got {})",
                b.take_profit_pct
            )));
        }

        if let Some(sweep) = &self.sweep {
            let axes = [
                ("take_profit_pct", &sweep.take_profit_pct),
                ("trailing_activation_delta", &sweep.trailing_activation_delta),
                ("trailing_delta", &sweep.trailing_delta),
            ];
            for (name, axis) in axes {
                if axis.is_empty() {
                    return Err(ConfigError::Invalid(format!("sweep.{name} is empty")));
                }
            }
        }

        let indicators = &self.signal.indicators;
        let periods = [
            ("rsi_period", indicators.rsi_period),
            ("bb_period", indicators.bb_period),
            ("ema_period", indicators.ema_period),
        ];
        for (name, period) in periods {
            if period == 0 {
                return Err(ConfigError::Invalid(format!(
                    "signal.indicators.{name} must be >= 1"
                )));
            }
        }
        if indicators.bb_multiplier < Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "signal.indicators.bb_multiplier must be >= 0 (got {})",
                indicators.bb_multiplier
            )));
        }

        if self.data.source == SourceKind::File && self.data.path.is_none() {
            return Err(ConfigError::Invalid(
                "data.path is required when data.source = \"file\"".into(),
            ));
        }
        Ok(())
    }

    /// Position parameters for these bars. The entry price falls back to the
    /// first close; `None` when it is unset and there are no bars.
    pub fn position_params(&self, bars: &[Bar]) -> Option<PositionParams> {
        let b = &self.backtest;
        let entry_price = b.entry_price.or_else(|| bars.first().map(|bar| bar.close))?;
        Some(PositionParams {
            side: b.side,
            entry_price,
            amount: b.amount,
            take_profit_pct: b.take_profit_pct,
            trailing_activation_delta: b.trailing_activation_delta,
            trailing_delta: b.trailing_delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
[backtest]
trading_pair = "AI16Z-USDC"
side = "buy"
amount = "10"
entry_price = "0.52"
take_profit_pct = "0.05"
trailing_activation_delta = "0.01"
trailing_delta = "0.005"

[data]
token = "HeLp6NuQkmYB4pYWo2zYs22mESHXPQYzXbB8n4V98jwC"
interval = "5m"

[sweep]
take_profit_pct = ["0.02", "0.05"]
trailing_activation_delta = ["0.01"]
trailing_delta = ["0.003", "0.005"]
parallel = true
"#;

    #[test]
    fn parses_full_config() {
        let config = BacktestConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.backtest.side, Side::Buy);
        assert_eq!(config.backtest.amount, dec!(10));
        assert_eq!(config.backtest.entry_price, Some(dec!(0.52)));
        assert_eq!(config.data.interval, Interval::FiveMinutes);
        let sweep = config.sweep.unwrap();
        assert_eq!(sweep.take_profit_pct, vec![dec!(0.02), dec!(0.05)]);
        assert!(sweep.parallel);
        assert_eq!(config.signal, OversoldEntry::default());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BacktestConfig::from_toml(
            r#"
[backtest]
trading_pair = "X-Y"
side = "sell"
amount = 1
take_profit_pct = 0.05
trailing_activation_delta = 0.01
trailing_delta = 0.005
"#,
        )
        .unwrap();
        assert_eq!(config.backtest.side, Side::Sell);
        assert_eq!(config.backtest.entry_price, None);
        assert_eq!(config.data, DataSection::default());
        assert!(config.sweep.is_none());
    }

    #[test]
    fn side_alias_long_is_buy() {
        let toml = SAMPLE.replace("side = \"buy\"", "side = \"long\"");
        let config = BacktestConfig::from_toml(&toml).unwrap();
        assert_eq!(config.backtest.side, Side::Buy);
    }

    #[test]
    fn unknown_side_is_parse_error() {
        let toml = SAMPLE.replace("side = \"buy\"", "side = \"hold\"");
        let err = BacktestConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn non_positive_amount_rejected() {
        let toml = SAMPLE.replace("amount = \"10\"", "amount = \"0\"");
        let err = BacktestConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Position(PositionError::NonPositive { field: "amount", .. })
        ));
    }

    #[test]
    fn empty_sweep_axis_rejected() {
        let toml = SAMPLE.replace("trailing_delta = [\"0.003\", \"0.005\"]", "trailing_delta = []");
        let err = BacktestConfig::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("sweep.trailing_delta"));
    }

    #[test]
    fn zero_indicator_period_rejected() {
        for name in ["rsi_period", "bb_period", "ema_period"] {
            let toml = format!("{SAMPLE}\n[signal.indicators]\n{name} = 0\n");
            let err = BacktestConfig::from_toml(&toml).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid(msg) if msg.contains(name)),
                "unexpected error for {name}: {err}"
            );
        }
        let toml = format!("{SAMPLE}\n[signal.indicators]\nrsi_period = 1\n");
        assert_eq!(BacktestConfig::from_toml(&toml).unwrap().signal.indicators.rsi_period, 1);
    }

    #[test]
    fn sell_take_profit_must_stay_below_one() {
        let toml = SAMPLE
            .replace("side = \"buy\"", "side = \"sell\"")
            .replace("take_profit_pct = \"0.05\"", "take_profit_pct = \"1\"");
        let err = BacktestConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");

        let buy = SAMPLE.replace("take_profit_pct = \"0.05\"", "take_profit_pct = \"1\"");
        assert!(BacktestConfig::from_toml(&buy).is_ok());
    }

    #[test]
    fn file_source_requires_path() {
        let mut config = BacktestConfig::from_toml(SAMPLE).unwrap();
        config.data.source = SourceKind::File;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.data.path = Some(PathBuf::from("bars.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn entry_price_defaults_to_first_close() {
        let mut config = BacktestConfig::from_toml(SAMPLE).unwrap();
        config.backtest.entry_price = None;
        let bars = vec![Bar {
            timestamp: 0,
            open: dec!(1),
            high: dec!(1.2),
            low: dec!(0.9),
            close: dec!(1.1),
            volume: dec!(5),
        }];
        assert_eq!(config.position_params(&bars).unwrap().entry_price, dec!(1.1));
        assert!(config.position_params(&[]).is_none());
    }

    #[test]
    fn time_range_defaults_to_lookback() {
        let data = DataSection::default();
        let now = DateTime::parse_from_rfc3339("2024-01-04T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let (start, end) = data.time_range(now).unwrap();
        assert_eq!(end - start, 3 * 86_400_000);
    }

    #[test]
    fn time_range_accepts_dates() {
        let data = DataSection {
            start: Some("2024-01-01".into()),
            end: Some("2024-01-02T00:00:00Z".into()),
            ..DataSection::default()
        };
        let (start, end) = data.time_range(Utc::now()).unwrap();
        assert_eq!(start, 1_704_067_200_000);
        assert_eq!(end, 1_704_153_600_000);
    }

    #[test]
    fn time_range_rejects_reversed() {
        let data = DataSection {
            start: Some("2024-01-02".into()),
            end: Some("2024-01-01".into()),
            ..DataSection::default()
        };
        assert!(data.time_range(Utc::now()).is_err());
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = BacktestConfig::from_file(Path::new("/no/such/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
