//! Parameter sweep over take-profit and trailing-stop settings.
//!
//! Every combination replays the same immutable bar slice. Combinations are
//! independent: a failing one is recorded and never aborts its siblings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use trailstop_core::domain::{Bar, RunId};
use trailstop_core::engine::BacktestMetrics;
use trailstop_core::fingerprint::run_id;
use trailstop_core::position_management::PositionParams;
use trailstop_core::status::{ComponentStatus, StatusReport};

use crate::config::{BacktestConfig, ConfigError, SweepSection};
use crate::runner::{run_with_params, RunError};

/// Ranges for each swept parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub take_profit_pct: Vec<Decimal>,
    pub trailing_activation_delta: Vec<Decimal>,
    pub trailing_delta: Vec<Decimal>,
}

impl From<&SweepSection> for SweepGrid {
    fn from(section: &SweepSection) -> Self {
        Self {
            take_profit_pct: section.take_profit_pct.clone(),
            trailing_activation_delta: section.trailing_activation_delta.clone(),
            trailing_delta: section.trailing_delta.clone(),
        }
    }
}

impl SweepGrid {
    /// Returns the total number of combinations in this grid.
    pub fn size(&self) -> usize {
        self.take_profit_pct.len() * self.trailing_activation_delta.len() * self.trailing_delta.len()
    }

    /// Every combination applied to `base`, in grid order: take-profit
    /// outermost, trailing delta innermost.
    pub fn combinations(&self, base: &PositionParams) -> Vec<PositionParams> {
        let mut out = Vec::with_capacity(self.size());
        for &tp in &self.take_profit_pct {
            for &activation in &self.trailing_activation_delta {
                for &trailing in &self.trailing_delta {
                    out.push(PositionParams {
                        take_profit_pct: tp,
                        trailing_activation_delta: activation,
                        trailing_delta: trailing,
                        ..base.clone()
                    });
                }
            }
        }
        out
    }
}

/// Cooperative cancellation shared between the sweep and its caller.
///
/// Checked before each combination starts; a running simulation always
/// finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed { metrics: BacktestMetrics },
    Failed { error: String },
    Cancelled,
}

impl SweepOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepOutcome::Completed { .. } => "completed",
            SweepOutcome::Failed { .. } => "failed",
            SweepOutcome::Cancelled => "cancelled",
        }
    }

    pub fn metrics(&self) -> Option<&BacktestMetrics> {
        match self {
            SweepOutcome::Completed { metrics } => Some(metrics),
            _ => None,
        }
    }
}

/// One combination, tagged with the parameters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    /// Position in grid order.
    pub index: usize,
    pub run_id: RunId,
    pub params: PositionParams,
    pub outcome: SweepOutcome,
}

/// Ranked sweep results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub trading_pair: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Completed entries by descending `final_pnl_pct`, then failed, then
    /// cancelled. Ties keep grid order.
    pub entries: Vec<SweepEntry>,
}

impl SweepReport {
    fn new(trading_pair: &str, mut entries: Vec<SweepEntry>) -> Self {
        entries.sort_by(|a, b| {
            let rank = |e: &SweepEntry| match e.outcome {
                SweepOutcome::Completed { .. } => 0,
                SweepOutcome::Failed { .. } => 1,
                SweepOutcome::Cancelled => 2,
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| match (a.outcome.metrics(), b.outcome.metrics()) {
                    (Some(ma), Some(mb)) => mb.final_pnl_pct.cmp(&ma.final_pnl_pct),
                    _ => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.index.cmp(&b.index))
        });
        let count = |status: &str| entries.iter().filter(|e| e.outcome.as_str() == status).count();
        let (succeeded, failed, cancelled) = (count("completed"), count("failed"), count("cancelled"));
        Self {
            trading_pair: trading_pair.to_string(),
            total: entries.len(),
            succeeded,
            failed,
            cancelled,
            entries,
        }
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first().filter(|e| e.outcome.metrics().is_some())
    }

    /// Up to `n` completed entries, best first.
    pub fn top_n(&self, n: usize) -> Vec<&SweepEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome.metrics().is_some())
            .take(n)
            .collect()
    }
}

impl StatusReport for SweepReport {
    fn status(&self) -> ComponentStatus {
        let status = ComponentStatus::new("sweep", self.cancelled == 0)
            .with("total", self.total)
            .with("succeeded", self.succeeded)
            .with("failed", self.failed)
            .with("cancelled", self.cancelled);
        match self.best().and_then(|e| e.outcome.metrics()) {
            Some(m) => status.with("best_pnl_pct", m.final_pnl_pct.round_dp(4).normalize()),
            None => status,
        }
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
    cancel: CancelToken,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self {
            parallel: true,
            cancel: CancelToken::new(),
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run every combination of `grid` over `bars`.
    pub fn run(
        &self,
        trading_pair: &str,
        base: &PositionParams,
        grid: &SweepGrid,
        bars: &[Bar],
    ) -> SweepReport {
        let combos = grid.combinations(base);
        let run_one = |(index, params): (usize, &PositionParams)| {
            self.run_combination(index, trading_pair, params, bars)
        };

        let entries: Vec<SweepEntry> = if self.parallel {
            combos.par_iter().enumerate().map(run_one).collect()
        } else {
            combos.iter().enumerate().map(run_one).collect()
        };

        let report = SweepReport::new(trading_pair, entries);
        info!(
            pair = trading_pair,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            "sweep complete"
        );
        report
    }

    fn run_combination(
        &self,
        index: usize,
        trading_pair: &str,
        params: &PositionParams,
        bars: &[Bar],
    ) -> SweepEntry {
        let id = run_id(trading_pair, params);
        let outcome = if self.cancel.is_cancelled() {
            SweepOutcome::Cancelled
        } else {
            match run_with_params(trading_pair, params, bars) {
                Ok(report) => SweepOutcome::Completed {
                    metrics: report.metrics,
                },
                Err(e) => {
                    warn!(run_id = id.short(), index, error = %e, "combination failed");
                    SweepOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };
        SweepEntry {
            index,
            run_id: id,
            params: params.clone(),
            outcome,
        }
    }
}

/// Sweep the grid in `config.sweep` over pre-loaded bars.
pub fn run_sweep(
    config: &BacktestConfig,
    bars: &[Bar],
    cancel: Option<CancelToken>,
) -> Result<SweepReport, RunError> {
    let section = config
        .sweep
        .as_ref()
        .ok_or_else(|| ConfigError::Invalid("no [sweep] table in config".into()))?;
    let pair = &config.backtest.trading_pair;
    let base = config
        .position_params(bars)
        .ok_or_else(|| RunError::InsufficientData(pair.clone()))?;
    if bars.is_empty() {
        return Err(RunError::InsufficientData(pair.clone()));
    }

    let mut sweep = ParamSweep::new().with_parallelism(section.parallel);
    if let Some(token) = cancel {
        sweep = sweep.with_cancel_token(token);
    }
    Ok(sweep.run(pair, &base, &SweepGrid::from(section), bars))
}
