//! Trailing-stop / take-profit position state machine.
//!
//! `Idle → Open → Closed`, where `Open` is either not trailing or trailing-armed.
//! A position is opened from validated `PositionParams`, fed one price per bar
//! through `update_price`, and closed on the first bar where an exit condition
//! holds (take-profit is checked before the trailing stop) or at end of data.
//!
//! The trailing reference (`trailing_stop_price`) is the best price seen since
//! arming. The exit trigger sits `trailing_delta` behind it:
//! `reference * (1 - delta)` for a buy, `reference * (1 + delta)` for a sell.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::ratchet::RatchetState;
use crate::domain::{ExitReason, Side};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("{field} must be > 0 (got {value})")]
    NonPositive { field: &'static str, value: Decimal },

    #[error("price update must be > 0 (got {0})")]
    InvalidPrice(Decimal),

    #[error("position on {0} is already closed")]
    Closed(String),

    #[error("decimal overflow computing {0}")]
    Overflow(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Everything needed to open one position.
///
/// Percentages are fractions: `0.05` means five percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionParams {
    pub side: Side,
    pub entry_price: Decimal,
    pub amount: Decimal,
    pub take_profit_pct: Decimal,
    pub trailing_activation_delta: Decimal,
    pub trailing_delta: Decimal,
}

impl PositionParams {
    /// Every numeric parameter must be strictly positive, and a sell target
    /// below 100% so the take-profit price stays above zero.
    pub fn validate(&self) -> Result<(), PositionError> {
        let fields = [
            ("entry_price", self.entry_price),
            ("amount", self.amount),
            ("take_profit_pct", self.take_profit_pct),
            ("trailing_activation_delta", self.trailing_activation_delta),
            ("trailing_delta", self.trailing_delta),
        ];
        for (field, value) in fields {
            if value <= Decimal::ZERO {
                return Err(PositionError::NonPositive { field, value });
            }
        }
        if self.side == Side::Sell && self.take_profit_pct >= Decimal::ONE {
            return Err(PositionError::InvalidConfig(format!(
                "take_profit_pct must be < 1 for a sell (got {})",
                self.take_profit_pct
            )));
        }
        Ok(())
    }

    /// Canonical text used for run fingerprints. Trailing zeros are stripped
    /// so `0.050` and `0.05` identify the same run.
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.side,
            self.entry_price.normalize(),
            self.amount.normalize(),
            self.take_profit_pct.normalize(),
            self.trailing_activation_delta.normalize(),
            self.trailing_delta.normalize(),
        )
    }
}

/// Coarse lifecycle phase, for status reporting and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionPhase {
    Open,
    Trailing,
    Closed,
}

impl PositionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionPhase::Open => "open",
            PositionPhase::Trailing => "trailing",
            PositionPhase::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    trading_pair: String,
    side: Side,
    entry_price: Decimal,
    amount: Decimal,
    current_price: Decimal,
    take_profit_price: Decimal,
    trailing_stop_activation_delta: Decimal,
    trailing_delta: Decimal,
    trailing: RatchetState,
    trailing_trigger_price: Option<Decimal>,
    is_trailing_stop_activated: bool,
    exit_reason: Option<ExitReason>,
}

fn checked(value: Option<Decimal>, what: &'static str) -> Result<Decimal, PositionError> {
    value.ok_or(PositionError::Overflow(what))
}

impl PositionState {
    /// `Idle → Open`. Validates `params` and fixes the take-profit price.
    pub fn open(trading_pair: impl Into<String>, params: &PositionParams) -> Result<Self, PositionError> {
        params.validate()?;
        let entry = params.entry_price;
        let tp_factor = match params.side {
            Side::Buy => Decimal::ONE.checked_add(params.take_profit_pct),
            Side::Sell => Decimal::ONE.checked_sub(params.take_profit_pct),
        };
        let take_profit_price = checked(
            checked(tp_factor, "take-profit factor")?.checked_mul(entry),
            "take-profit price",
        )?;

        let trading_pair = trading_pair.into();
        debug!(
            pair = %trading_pair,
            side = %params.side,
            entry = %entry,
            take_profit = %take_profit_price,
            "position opened"
        );
        Ok(Self {
            trading_pair,
            side: params.side,
            entry_price: entry,
            amount: params.amount,
            current_price: entry,
            take_profit_price,
            trailing_stop_activation_delta: params.trailing_activation_delta,
            trailing_delta: params.trailing_delta,
            trailing: RatchetState::new(params.side),
            trailing_trigger_price: None,
            is_trailing_stop_activated: false,
            exit_reason: None,
        })
    }

    /// Apply one price observation.
    ///
    /// Before arming, the favourable move since entry is compared with the
    /// activation delta; reaching it arms the stop and seeds the reference at
    /// `new_price`. After arming, the reference ratchets toward the favourable
    /// extreme and never retreats.
    pub fn update_price(&mut self, new_price: Decimal) -> Result<(), PositionError> {
        if self.exit_reason.is_some() {
            return Err(PositionError::Closed(self.trading_pair.clone()));
        }
        if new_price <= Decimal::ZERO {
            return Err(PositionError::InvalidPrice(new_price));
        }
        self.current_price = new_price;

        if !self.is_trailing_stop_activated {
            let move_since_entry = match self.side {
                Side::Buy => new_price - self.entry_price,
                Side::Sell => self.entry_price - new_price,
            };
            let change = checked(move_since_entry.checked_div(self.entry_price), "price change")?;
            if change < self.trailing_stop_activation_delta {
                return Ok(());
            }
            self.is_trailing_stop_activated = true;
            debug!(pair = %self.trading_pair, price = %new_price, change = %change, "trailing stop armed");
        }

        let reference = self.trailing.apply(new_price);
        let trigger_factor = match self.side {
            Side::Buy => Decimal::ONE.checked_sub(self.trailing_delta),
            Side::Sell => Decimal::ONE.checked_add(self.trailing_delta),
        };
        self.trailing_trigger_price = Some(checked(
            checked(trigger_factor, "trailing factor")?.checked_mul(reference),
            "trailing trigger",
        )?);
        Ok(())
    }

    pub fn should_take_profit(&self) -> bool {
        match self.side {
            Side::Buy => self.current_price >= self.take_profit_price,
            Side::Sell => self.current_price <= self.take_profit_price,
        }
    }

    /// True once armed and price has retraced to the trigger level.
    pub fn should_stop_loss(&self) -> bool {
        let Some(trigger) = self.trailing_trigger_price else {
            return false;
        };
        match self.side {
            Side::Buy => self.current_price <= trigger,
            Side::Sell => self.current_price >= trigger,
        }
    }

    /// Exit condition for the current price, take-profit first.
    pub fn exit_signal(&self) -> Option<ExitReason> {
        if self.should_take_profit() {
            Some(ExitReason::TakeProfit)
        } else if self.should_stop_loss() {
            Some(ExitReason::TrailingStop)
        } else {
            None
        }
    }

    /// `Open → Closed`. Closing twice keeps the first reason.
    pub fn close(&mut self, reason: ExitReason) {
        if self.exit_reason.is_none() {
            debug!(pair = %self.trading_pair, reason = %reason, price = %self.current_price, "position closed");
            self.exit_reason = Some(reason);
        }
    }

    pub fn unrealized_pnl(&self) -> Result<Decimal, PositionError> {
        let diff = match self.side {
            Side::Buy => self.current_price - self.entry_price,
            Side::Sell => self.entry_price - self.current_price,
        };
        checked(diff.checked_mul(self.amount), "pnl")
    }

    /// PnL as a percentage of notional (`entry_price * amount`), scaled by 100.
    pub fn unrealized_pnl_pct(&self) -> Result<Decimal, PositionError> {
        let notional = checked(self.entry_price.checked_mul(self.amount), "notional")?;
        let ratio = checked(self.unrealized_pnl()?.checked_div(notional), "pnl ratio")?;
        checked(ratio.checked_mul(Decimal::ONE_HUNDRED), "pnl percentage")
    }

    pub fn phase(&self) -> PositionPhase {
        if self.exit_reason.is_some() {
            PositionPhase::Closed
        } else if self.is_trailing_stop_activated {
            PositionPhase::Trailing
        } else {
            PositionPhase::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.exit_reason.is_none()
    }

    pub fn trading_pair(&self) -> &str {
        &self.trading_pair
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn current_price(&self) -> Decimal {
        self.current_price
    }

    pub fn take_profit_price(&self) -> Decimal {
        self.take_profit_price
    }

    pub fn trailing_stop_activation_delta(&self) -> Decimal {
        self.trailing_stop_activation_delta
    }

    pub fn trailing_delta(&self) -> Decimal {
        self.trailing_delta
    }

    /// Favourable watermark since arming; `None` until armed.
    pub fn trailing_stop_price(&self) -> Option<Decimal> {
        self.trailing.current_level()
    }

    pub fn trailing_trigger_price(&self) -> Option<Decimal> {
        self.trailing_trigger_price
    }

    pub fn is_trailing_stop_activated(&self) -> bool {
        self.is_trailing_stop_activated
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }
}
