//! Historical replay of one position.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::{BacktestEvent, EventKind};
use crate::domain::{Bar, ExitReason};
use crate::position_management::{PositionError, PositionParams, PositionState};

/// Final position plus one event per processed bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    /// `None` only for empty input.
    pub position: Option<PositionState>,
    pub events: Vec<BacktestEvent>,
}

/// Replay `bars` against a position opened at `params.entry_price`.
///
/// Per bar, in order: feed the close to `update_price`, then check take-profit,
/// then the trailing stop. The first terminal condition closes the position
/// and ends the replay. Running out of bars closes it with `EndOfData`.
/// Sequential and deterministic: the same input yields the same log.
pub fn simulate(
    bars: &[Bar],
    trading_pair: &str,
    params: &PositionParams,
) -> Result<Simulation, PositionError> {
    params.validate()?;
    if bars.is_empty() {
        return Ok(Simulation {
            position: None,
            events: Vec::new(),
        });
    }

    let mut position = PositionState::open(trading_pair, params)?;
    let mut events = Vec::with_capacity(bars.len());

    for bar in bars {
        position.update_price(bar.close)?;
        let exit = position.exit_signal();
        events.push(BacktestEvent {
            timestamp: bar.timestamp,
            kind: exit.map(EventKind::from).unwrap_or(EventKind::Update),
            price: bar.close,
            pnl: position.unrealized_pnl()?,
            pnl_pct: position.unrealized_pnl_pct()?,
            trailing_active: position.is_trailing_stop_activated(),
            trailing_price: position.trailing_stop_price(),
        });
        if let Some(reason) = exit {
            position.close(reason);
            break;
        }
    }

    if position.is_open() {
        position.close(ExitReason::EndOfData);
    }
    debug!(
        pair = trading_pair,
        events = events.len(),
        exit = ?position.exit_reason(),
        "simulation finished"
    );
    Ok(Simulation {
        position: Some(position),
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::indicators::make_bars;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn params(side: Side) -> PositionParams {
        PositionParams {
            side,
            entry_price: dec!(100),
            amount: dec!(10),
            take_profit_pct: dec!(0.05),
            trailing_activation_delta: dec!(0.01),
            trailing_delta: dec!(0.005),
        }
    }

    #[test]
    fn empty_input_yields_no_position() {
        let sim = simulate(&[], "X", &params(Side::Buy)).unwrap();
        assert!(sim.position.is_none());
        assert!(sim.events.is_empty());
    }

    #[test]
    fn take_profit_ends_replay() {
        let bars = make_bars(&[dec!(100), dec!(103), dec!(106), dec!(90)]);
        let sim = simulate(&bars, "X", &params(Side::Buy)).unwrap();
        assert_eq!(sim.events.len(), 3);
        assert_eq!(sim.events[2].kind, EventKind::TakeProfit);
        assert_eq!(sim.events[2].pnl, dec!(60));
        let pos = sim.position.unwrap();
        assert_eq!(pos.exit_reason(), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn end_of_data_keeps_update_kind() {
        let bars = make_bars(&[dec!(100), dec!(100.2), dec!(100.4)]);
        let sim = simulate(&bars, "X", &params(Side::Buy)).unwrap();
        assert_eq!(sim.events.len(), 3);
        assert!(sim.events.iter().all(|e| e.kind == EventKind::Update));
        assert_eq!(
            sim.position.unwrap().exit_reason(),
            Some(ExitReason::EndOfData)
        );
    }

    #[test]
    fn sell_trailing_stop() {
        let bars = make_bars(&[dec!(100), dec!(97), dec!(96), dec!(96.6)]);
        let sim = simulate(&bars, "X", &params(Side::Sell)).unwrap();
        // armed at 97, reference 96, trigger 96.48; 96.6 >= 96.48 exits
        let last = sim.events.last().unwrap();
        assert_eq!(last.kind, EventKind::TrailingStop);
        assert_eq!(last.trailing_price, Some(dec!(96)));
        assert_eq!(last.pnl, dec!(34.0));
    }

    #[test]
    fn invalid_params_fail_before_replay() {
        let mut p = params(Side::Buy);
        p.trailing_delta = Decimal::ZERO;
        assert!(simulate(&[], "X", &p).is_err());
    }

    #[test]
    fn events_record_trailing_fields() {
        let bars = make_bars(&[dec!(100), dec!(101.5)]);
        let sim = simulate(&bars, "X", &params(Side::Buy)).unwrap();
        assert!(!sim.events[0].trailing_active);
        assert_eq!(sim.events[0].trailing_price, None);
        assert!(sim.events[1].trailing_active);
        assert_eq!(sim.events[1].trailing_price, Some(dec!(101.5)));
    }
}
