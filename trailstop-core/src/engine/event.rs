use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Update,
    TakeProfit,
    TrailingStop,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Update => "update",
            EventKind::TakeProfit => "take_profit",
            EventKind::TrailingStop => "trailing_stop",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventKind::Update)
    }

    /// Exit reason implied by the final event of a log. A log that ends on an
    /// `Update` ran out of bars.
    pub fn exit_reason(&self) -> ExitReason {
        match self {
            EventKind::Update => ExitReason::EndOfData,
            EventKind::TakeProfit => ExitReason::TakeProfit,
            EventKind::TrailingStop => ExitReason::TrailingStop,
        }
    }
}

impl From<ExitReason> for EventKind {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::TakeProfit => EventKind::TakeProfit,
            ExitReason::TrailingStop => EventKind::TrailingStop,
            ExitReason::EndOfData => EventKind::Update,
        }
    }
}

/// One processed bar. `pnl_pct` is scaled by 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestEvent {
    pub timestamp: i64,
    pub kind: EventKind,
    pub price: Decimal,
    pub pnl: Decimal,
    pub pnl_pct: Decimal,
    pub trailing_active: bool,
    pub trailing_price: Option<Decimal>,
}
