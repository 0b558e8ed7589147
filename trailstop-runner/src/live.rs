//! Bar-by-bar replay of the live position controller.
//!
//! Feeds each growing prefix of the bar sequence to a `PositionController`,
//! exactly as a live loop would after every closed bar, and records the
//! decisions that called for an action.

use serde::{Deserialize, Serialize};
use tracing::info;

use trailstop_core::domain::Bar;
use trailstop_core::position_management::{ControllerConfig, Decision, PositionController};
use trailstop_core::status::{ComponentStatus, StatusReport};

use crate::config::BacktestConfig;
use crate::runner::RunError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStep {
    pub bar_index: usize,
    pub timestamp: i64,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerReplay {
    /// Only `Enter` and `Exit` decisions.
    pub steps: Vec<ReplayStep>,
    pub bars_seen: usize,
    pub status: ComponentStatus,
}

impl ControllerReplay {
    pub fn entries(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.decision, Decision::Enter { .. }))
            .count()
    }

    pub fn exits(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.decision, Decision::Exit { .. }))
            .count()
    }
}

pub fn controller_config(config: &BacktestConfig) -> ControllerConfig {
    let b = &config.backtest;
    ControllerConfig {
        trading_pair: b.trading_pair.clone(),
        amount: b.amount,
        take_profit_pct: b.take_profit_pct,
        trailing_activation_delta: b.trailing_activation_delta,
        trailing_delta: b.trailing_delta,
    }
}

/// Replay `bars` through a controller driven by the configured entry signal.
pub fn replay_controller(config: &BacktestConfig, bars: &[Bar]) -> Result<ControllerReplay, RunError> {
    let mut controller =
        PositionController::new(controller_config(config), Box::new(config.signal.clone()))?;

    let mut steps = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        let decision = controller.on_bars(&bars[..=i])?;
        if decision != Decision::NoAction {
            steps.push(ReplayStep {
                bar_index: i,
                timestamp: bar.timestamp,
                decision,
            });
        }
    }

    let replay = ControllerReplay {
        steps,
        bars_seen: bars.len(),
        status: controller.status(),
    };
    info!(
        pair = %config.backtest.trading_pair,
        bars = replay.bars_seen,
        entries = replay.entries(),
        exits = replay.exits(),
        "controller replay complete"
    );
    Ok(replay)
}
