//! Summary metrics over an event log.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::BacktestEvent;
use crate::domain::ExitReason;
use crate::position_management::PositionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub start_ts: i64,
    pub end_ts: i64,
    pub final_pnl: Decimal,
    pub final_pnl_pct: Decimal,
    pub max_pnl: Decimal,
    pub min_pnl: Decimal,
    /// Largest peak-to-trough decline in PnL, in quote units.
    pub max_drawdown: Decimal,
    pub exit_reason: ExitReason,
}

/// `Ok(None)` for an empty log (insufficient data). A drawdown that does not
/// fit in a `Decimal` is an overflow error for this run only.
pub fn analyze(events: &[BacktestEvent]) -> Result<Option<BacktestMetrics>, PositionError> {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Ok(None);
    };

    let mut max_pnl = first.pnl;
    let mut min_pnl = first.pnl;
    let mut peak: Option<Decimal> = None;
    let mut max_drawdown = Decimal::ZERO;

    for event in events {
        max_pnl = max_pnl.max(event.pnl);
        min_pnl = min_pnl.min(event.pnl);
        let p = peak.map_or(event.pnl, |p| p.max(event.pnl));
        peak = Some(p);
        let drawdown = p
            .checked_sub(event.pnl)
            .ok_or(PositionError::Overflow("drawdown"))?;
        max_drawdown = max_drawdown.max(drawdown);
    }

    Ok(Some(BacktestMetrics {
        start_ts: first.timestamp,
        end_ts: last.timestamp,
        final_pnl: last.pnl,
        final_pnl_pct: last.pnl_pct,
        max_pnl,
        min_pnl,
        max_drawdown,
        exit_reason: last.kind.exit_reason(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::event::EventKind;
    use rust_decimal_macros::dec;

    fn event(ts: i64, kind: EventKind, pnl: Decimal) -> BacktestEvent {
        BacktestEvent {
            timestamp: ts,
            kind,
            price: dec!(100) + pnl,
            pnl,
            pnl_pct: pnl,
            trailing_active: false,
            trailing_price: None,
        }
    }

    #[test]
    fn empty_log_is_insufficient() {
        assert_eq!(analyze(&[]), Ok(None));
    }

    #[test]
    fn drawdown_is_peak_to_trough() {
        let events = vec![
            event(1, EventKind::Update, dec!(0)),
            event(2, EventKind::Update, dec!(5)),
            event(3, EventKind::Update, dec!(-2)),
            event(4, EventKind::Update, dec!(8)),
            event(5, EventKind::TrailingStop, dec!(3)),
        ];
        let m = analyze(&events).unwrap().unwrap();
        assert_eq!(m.start_ts, 1);
        assert_eq!(m.end_ts, 5);
        assert_eq!(m.max_pnl, dec!(8));
        assert_eq!(m.min_pnl, dec!(-2));
        assert_eq!(m.max_drawdown, dec!(7));
        assert_eq!(m.final_pnl, dec!(3));
        assert_eq!(m.exit_reason, ExitReason::TrailingStop);
    }

    #[test]
    fn monotonic_gains_have_no_drawdown() {
        let events = vec![
            event(1, EventKind::Update, dec!(1)),
            event(2, EventKind::TakeProfit, dec!(4)),
        ];
        let m = analyze(&events).unwrap().unwrap();
        assert_eq!(m.max_drawdown, Decimal::ZERO);
        assert_eq!(m.exit_reason, ExitReason::TakeProfit);
    }

    #[test]
    fn trailing_update_maps_to_end_of_data() {
        let m = analyze(&[event(1, EventKind::Update, dec!(-1))]).unwrap().unwrap();
        assert_eq!(m.exit_reason, ExitReason::EndOfData);
        assert_eq!(m.max_drawdown, Decimal::ZERO);
    }

    #[test]
    fn overflowing_drawdown_is_an_error() {
        let at = |ts: i64, pnl: Decimal| BacktestEvent {
            timestamp: ts,
            kind: EventKind::Update,
            price: dec!(1),
            pnl,
            pnl_pct: Decimal::ZERO,
            trailing_active: false,
            trailing_price: None,
        };
        let events = [at(1, Decimal::MAX), at(2, Decimal::MIN)];
        assert_eq!(analyze(&events), Err(PositionError::Overflow("drawdown")));
    }
}
