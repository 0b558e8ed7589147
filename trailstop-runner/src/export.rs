//! Reporting and export: JSON and CSV artifact generation.
//!
//! Single runs export as a JSON manifest plus an events CSV; sweeps export as
//! a JSON report plus a ranking CSV. All persisted single-run artifacts carry
//! a `schema_version`; unknown versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use trailstop_core::engine::BacktestEvent;

use crate::runner::{BacktestReport, SCHEMA_VERSION};
use crate::sweep::{SweepOutcome, SweepReport};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_sweep_json(report: &SweepReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SweepReport to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the event log, one row per processed bar.
///
/// Columns: timestamp, kind, price, pnl, pnl_pct, trailing_active, trailing_price
pub fn export_events_csv(events: &[BacktestEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "kind",
        "price",
        "pnl",
        "pnl_pct",
        "trailing_active",
        "trailing_price",
    ])?;

    for e in events {
        wtr.write_record([
            e.timestamp.to_string(),
            e.kind.as_str().to_string(),
            e.price.normalize().to_string(),
            e.pnl.normalize().to_string(),
            e.pnl_pct.round_dp(8).normalize().to_string(),
            e.trailing_active.to_string(),
            e.trailing_price
                .map(|p| p.normalize().to_string())
                .unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the sweep ranking. Failed and cancelled combinations keep their
/// rows with empty metric columns.
pub fn export_sweep_csv(report: &SweepReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "run_id",
        "take_profit_pct",
        "trailing_activation_delta",
        "trailing_delta",
        "status",
        "final_pnl",
        "final_pnl_pct",
        "max_drawdown",
        "exit_reason",
        "error",
    ])?;

    for (rank, entry) in report.entries.iter().enumerate() {
        let p = &entry.params;
        let (pnl, pnl_pct, drawdown, exit) = match entry.outcome.metrics() {
            Some(m) => (
                m.final_pnl.normalize().to_string(),
                m.final_pnl_pct.round_dp(8).normalize().to_string(),
                m.max_drawdown.normalize().to_string(),
                m.exit_reason.to_string(),
            ),
            None => Default::default(),
        };
        let error = match &entry.outcome {
            SweepOutcome::Failed { error } => error.clone(),
            _ => String::new(),
        };
        wtr.write_record([
            (rank + 1).to_string(),
            entry.run_id.short().to_string(),
            p.take_profit_pct.normalize().to_string(),
            p.trailing_activation_delta.normalize().to_string(),
            p.trailing_delta.normalize().to_string(),
            entry.outcome.as_str().to_string(),
            pnl,
            pnl_pct,
            drawdown,
            exit,
            error,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{trading_pair}_{run_id}/` under `output_dir` containing
/// `manifest.json` (the full report) and `events.csv`.
/// Returns the path to the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", dir_safe(&report.trading_pair), report.run_id.short());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(report)?;
    std::fs::write(run_dir.join("manifest.json"), &json)?;

    let events_csv = export_events_csv(&report.events)?;
    std::fs::write(run_dir.join("events.csv"), &events_csv)?;

    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

/// Save `sweep.json` and `ranking.csv` under
/// `{output_dir}/{trading_pair}_sweep_{timestamp}/`.
pub fn save_sweep_artifacts(report: &SweepReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_sweep_{}",
        dir_safe(&report.trading_pair),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("sweep.json"), export_sweep_json(report)?)?;
    std::fs::write(run_dir.join("ranking.csv"), export_sweep_csv(report)?)?;

    Ok(run_dir)
}

fn dir_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trailstop_core::engine::EventKind;

    #[test]
    fn events_csv_has_header_and_rows() {
        let events = vec![
            BacktestEvent {
                timestamp: 0,
                kind: EventKind::Update,
                price: dec!(100.0),
                pnl: dec!(0),
                pnl_pct: dec!(0),
                trailing_active: false,
                trailing_price: None,
            },
            BacktestEvent {
                timestamp: 60_000,
                kind: EventKind::TrailingStop,
                price: dec!(101.4),
                pnl: dec!(14.0),
                pnl_pct: dec!(1.4),
                trailing_active: true,
                trailing_price: Some(dec!(102)),
            },
        ];
        let csv = export_events_csv(&events).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "timestamp,kind,price,pnl,pnl_pct,trailing_active,trailing_price"
        );
        assert_eq!(lines[1], "0,update,100,0,0,false,");
        assert_eq!(lines[2], "60000,trailing_stop,101.4,14,1.4,true,102");
    }

    #[test]
    fn pair_separators_do_not_nest_directories() {
        assert_eq!(dir_safe("AI16Z/USDC"), "AI16Z_USDC");
        assert_eq!(dir_safe("SOL-USDC"), "SOL-USDC");
    }

    #[test]
    fn import_rejects_future_schema() {
        let json = r#"{"schema_version": 99}"#;
        assert!(import_json(json).is_err());
    }
}
