//! Backtest runner: wires configuration, data loading, simulation and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads bars from the configured source, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. Used by the sweep and tests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use trailstop_core::data::AggregationReport;
use trailstop_core::domain::{Bar, RunId};
use trailstop_core::engine::{analyze, simulate, BacktestEvent, BacktestMetrics};
use trailstop_core::fingerprint::run_id;
use trailstop_core::position_management::{PositionError, PositionParams};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars, LoadError, LoadOptions};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Data(#[from] LoadError),
    #[error("position error: {0}")]
    Position(#[from] PositionError),
    #[error("insufficient data for '{0}': no bars to replay")]
    InsufficientData(String),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub trading_pair: String,
    pub params: PositionParams,
    pub metrics: BacktestMetrics,
    pub events: Vec<BacktestEvent>,
    pub bar_count: usize,
    /// Present when the bars went through the aggregator in this run.
    #[serde(default)]
    pub aggregation: Option<AggregationReport>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load bars per `config.data`, then run.
pub fn run_single_backtest(
    config: &BacktestConfig,
    opts: &LoadOptions,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.data, opts)?;
    let mut report = run_backtest_from_data(config, &loaded.bars)?;
    report.aggregation = Some(loaded.report);
    Ok(report)
}

/// Run with pre-loaded bars. No I/O.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    bars: &[Bar],
) -> Result<BacktestReport, RunError> {
    let pair = &config.backtest.trading_pair;
    let params = config
        .position_params(bars)
        .ok_or_else(|| RunError::InsufficientData(pair.clone()))?;
    run_with_params(pair, &params, bars)
}

/// Simulate one parameter set and summarize it.
pub fn run_with_params(
    trading_pair: &str,
    params: &PositionParams,
    bars: &[Bar],
) -> Result<BacktestReport, RunError> {
    let simulation = simulate(bars, trading_pair, params)?;
    let metrics = analyze(&simulation.events)?
        .ok_or_else(|| RunError::InsufficientData(trading_pair.to_string()))?;

    let id = run_id(trading_pair, params);
    info!(
        run_id = id.short(),
        pair = trading_pair,
        exit = %metrics.exit_reason,
        final_pnl = %metrics.final_pnl,
        final_pnl_pct = %metrics.final_pnl_pct,
        "backtest complete"
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id: id,
        trading_pair: trading_pair.to_string(),
        params: params.clone(),
        metrics,
        events: simulation.events,
        bar_count: bars.len(),
        aggregation: None,
    })
}

/// Plain-text results block for terminals and logs.
pub fn format_summary(report: &BacktestReport) -> String {
    let p = &report.params;
    let m = &report.metrics;
    let duration_secs = (m.end_ts - m.start_ts) / 1000;
    let lines = [
        "Backtest Results:".to_string(),
        "================".to_string(),
        format!("Run ID: {}", report.run_id.short()),
        format!("Trading Pair: {}", report.trading_pair),
        format!("Side: {}", p.side),
        format!("Entry Price: {}", p.entry_price.normalize()),
        format!("Amount: {}", p.amount.normalize()),
        format!("Bars: {}", report.bar_count),
        String::new(),
        "Strategy Parameters:".to_string(),
        format!("Take Profit: {}", p.take_profit_pct.normalize()),
        format!(
            "Trailing Stop Activation: {}",
            p.trailing_activation_delta.normalize()
        ),
        format!("Trailing Stop Delta: {}", p.trailing_delta.normalize()),
        String::new(),
        "Performance Metrics:".to_string(),
        format!("Final PnL: {}", round(m.final_pnl)),
        format!("Final PnL %: {}%", round(m.final_pnl_pct)),
        format!("Max PnL: {}", round(m.max_pnl)),
        format!("Min PnL: {}", round(m.min_pnl)),
        format!("Max Drawdown: {}", round(m.max_drawdown)),
        format!("Exit Reason: {}", m.exit_reason),
        format!("Duration: {duration_secs}s"),
    ];
    lines.join("\n")
}

fn round(value: Decimal) -> Decimal {
    value.round_dp(6).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BacktestSection, DataSection};
    use rust_decimal_macros::dec;
    use trailstop_core::domain::{ExitReason, Side};
    use trailstop_core::signals::OversoldEntry;

    fn bars(closes: &[Decimal]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: i as i64 * 60_000,
                open: c,
                high: c,
                low: c,
                close: c,
                volume: dec!(1),
            })
            .collect()
    }

    fn config(entry_price: Option<Decimal>) -> BacktestConfig {
        BacktestConfig {
            backtest: BacktestSection {
                trading_pair: "TEST-USD".into(),
                side: Side::Buy,
                amount: dec!(10),
                entry_price,
                take_profit_pct: dec!(0.05),
                trailing_activation_delta: dec!(0.01),
                trailing_delta: dec!(0.005),
            },
            data: DataSection::default(),
            sweep: None,
            signal: OversoldEntry::default(),
        }
    }

    #[test]
    fn runs_reference_scenario() {
        let bars = bars(&[dec!(100), dec!(102), dec!(101.4), dec!(99)]);
        let report = run_backtest_from_data(&config(None), &bars).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.bar_count, 4);
        assert_eq!(report.events.len(), 3);
        assert_eq!(report.metrics.exit_reason, ExitReason::TrailingStop);
        assert_eq!(report.metrics.final_pnl, dec!(14));
        assert!(report.aggregation.is_none());
    }

    #[test]
    fn empty_bars_are_insufficient_data() {
        let err = run_backtest_from_data(&config(None), &[]).unwrap_err();
        assert!(matches!(err, RunError::InsufficientData(_)));

        let err = run_backtest_from_data(&config(Some(dec!(1))), &[]).unwrap_err();
        assert!(matches!(err, RunError::InsufficientData(_)));
    }

    #[test]
    fn invalid_params_are_position_errors() {
        let mut cfg = config(None);
        cfg.backtest.trailing_delta = dec!(0);
        let err = run_backtest_from_data(&cfg, &bars(&[dec!(1)])).unwrap_err();
        assert!(matches!(err, RunError::Position(_)));
    }

    #[test]
    fn run_id_is_stable_across_runs() {
        let bars = bars(&[dec!(100), dec!(101)]);
        let a = run_backtest_from_data(&config(None), &bars).unwrap();
        let b = run_backtest_from_data(&config(Some(dec!(100.00))), &bars).unwrap();
        assert_eq!(a.run_id, b.run_id);
    }

    #[test]
    fn summary_mentions_key_metrics() {
        let bars = bars(&[dec!(100), dec!(102), dec!(101.4), dec!(99)]);
        let report = run_backtest_from_data(&config(None), &bars).unwrap();
        let text = format_summary(&report);
        assert!(text.starts_with("Backtest Results:"));
        assert!(text.contains("Final PnL: 14"));
        assert!(text.contains("Final PnL %: 1.4%"));
        assert!(text.contains("Exit Reason: trailing_stop"));
        assert!(text.contains("Duration: 120s"));
    }

    #[test]
    fn single_backtest_on_synthetic_data_carries_aggregation() {
        let opts = LoadOptions {
            api_key: None,
            now: chrono::DateTime::parse_from_rfc3339("2024-01-04T00:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        };
        let report = run_single_backtest(&config(None), &opts).unwrap();
        let aggregation = report.aggregation.unwrap();
        assert!(aggregation.output_bars >= report.bar_count);
        assert!(!report.events.is_empty());
    }
}
