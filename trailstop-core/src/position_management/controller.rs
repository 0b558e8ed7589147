//! Live position controller.
//!
//! Owns at most one position. Each call to `on_bars` hands it the latest bar
//! window and gets back a `Decision`; placing orders and observing fills is
//! the caller's job.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::{PositionError, PositionParams, PositionState};
use crate::domain::{Bar, ExitReason, Side};
use crate::signals::Signal;
use crate::status::{ComponentStatus, StatusReport};

/// What the caller should do after the latest bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    NoAction,
    Enter {
        side: Side,
        amount: Decimal,
        price: Decimal,
    },
    Exit {
        reason: ExitReason,
        price: Decimal,
        pnl: Decimal,
    },
}

/// Sizing and risk parameters applied to every position the controller opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub trading_pair: String,
    pub amount: Decimal,
    pub take_profit_pct: Decimal,
    pub trailing_activation_delta: Decimal,
    pub trailing_delta: Decimal,
}

impl ControllerConfig {
    fn params(&self, side: Side, entry_price: Decimal) -> PositionParams {
        PositionParams {
            side,
            entry_price,
            amount: self.amount,
            take_profit_pct: self.take_profit_pct,
            trailing_activation_delta: self.trailing_activation_delta,
            trailing_delta: self.trailing_delta,
        }
    }
}

pub struct PositionController {
    config: ControllerConfig,
    signal: Box<dyn Signal>,
    position: Option<PositionState>,
    last_exit: Option<ExitReason>,
}

impl PositionController {
    /// Fails fast on sizing or risk parameters that could never open a position.
    pub fn new(config: ControllerConfig, signal: Box<dyn Signal>) -> Result<Self, PositionError> {
        config.params(Side::Buy, Decimal::ONE).validate()?;
        if config.trading_pair.trim().is_empty() {
            return Err(PositionError::InvalidConfig("trading_pair must not be empty".into()));
        }
        Ok(Self {
            config,
            signal,
            position: None,
            last_exit: None,
        })
    }

    pub fn position(&self) -> Option<&PositionState> {
        self.position.as_ref()
    }

    /// Process the latest bar window. The last bar is the current one.
    pub fn on_bars(&mut self, bars: &[Bar]) -> Result<Decision, PositionError> {
        let Some(last) = bars.last() else {
            return Ok(Decision::NoAction);
        };

        if let Some(position) = self.position.as_mut() {
            position.update_price(last.close)?;
            let Some(reason) = position.exit_signal() else {
                return Ok(Decision::NoAction);
            };
            let pnl = position.unrealized_pnl()?;
            position.close(reason);
            info!(pair = %self.config.trading_pair, reason = %reason, price = %last.close, pnl = %pnl, "exit");
            self.position = None;
            self.last_exit = Some(reason);
            return Ok(Decision::Exit {
                reason,
                price: last.close,
                pnl,
            });
        }

        let Some(event) = self.signal.evaluate(bars) else {
            return Ok(Decision::NoAction);
        };
        let params = self.config.params(event.side, event.price);
        let position = PositionState::open(self.config.trading_pair.clone(), &params)?;
        info!(
            pair = %self.config.trading_pair,
            signal = self.signal.name(),
            side = %event.side,
            price = %event.price,
            "entry"
        );
        self.position = Some(position);
        Ok(Decision::Enter {
            side: event.side,
            amount: self.config.amount,
            price: event.price,
        })
    }
}

impl StatusReport for PositionController {
    fn status(&self) -> ComponentStatus {
        let status = ComponentStatus::new("position_controller", true)
            .with("trading_pair", &self.config.trading_pair)
            .with("signal", self.signal.name());
        let status = match self.last_exit {
            Some(reason) => status.with("last_exit", reason),
            None => status,
        };
        match &self.position {
            None => status.with("phase", "idle"),
            Some(pos) => {
                let status = status
                    .with("phase", pos.phase().as_str())
                    .with("side", pos.side())
                    .with("entry_price", pos.entry_price())
                    .with("current_price", pos.current_price())
                    .with("take_profit_price", pos.take_profit_price());
                let status = match pos.trailing_stop_price() {
                    Some(p) => status.with("trailing_stop_price", p),
                    None => status,
                };
                match pos.unrealized_pnl() {
                    Ok(pnl) => status.with("unrealized_pnl", pnl),
                    Err(_) => status,
                }
            }
        }
    }
}
