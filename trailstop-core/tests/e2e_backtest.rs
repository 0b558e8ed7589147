//! End-to-end scenarios: bars in, metrics out.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trailstop_core::data::{fetch_bars, FetchRequest, SyntheticSource};
use trailstop_core::domain::{Bar, ExitReason, Interval, Side};
use trailstop_core::engine::{analyze, simulate, EventKind};
use trailstop_core::indicators::{Indicator, Rsi};
use trailstop_core::position_management::{PositionParams, PositionState};

fn bars(closes: &[Decimal]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: 1_700_000_000_000 + i as i64 * 300_000,
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1000),
        })
        .collect()
}

fn buy_params() -> PositionParams {
    PositionParams {
        side: Side::Buy,
        entry_price: dec!(100),
        amount: dec!(10),
        take_profit_pct: dec!(0.05),
        trailing_activation_delta: dec!(0.01),
        trailing_delta: dec!(0.005),
    }
}

#[test]
fn trailing_exit_before_take_profit() {
    let input = bars(&[dec!(100), dec!(102), dec!(101.4), dec!(99)]);
    let sim = simulate(&input, "AI16Z-USDC", &buy_params()).unwrap();

    // t0: below activation
    assert_eq!(sim.events[0].kind, EventKind::Update);
    assert!(!sim.events[0].trailing_active);
    // t1: armed, reference seeded at 102
    assert!(sim.events[1].trailing_active);
    assert_eq!(sim.events[1].trailing_price, Some(dec!(102)));
    // t2: 101.4 <= 102 * 0.995 = 101.49
    assert_eq!(sim.events.len(), 3);
    assert_eq!(sim.events[2].kind, EventKind::TrailingStop);
    assert_eq!(sim.events[2].pnl, dec!(14));
    assert_eq!(sim.events[2].pnl_pct, dec!(1.4));

    let metrics = analyze(&sim.events).unwrap().unwrap();
    assert_eq!(metrics.exit_reason, ExitReason::TrailingStop);
    assert_eq!(metrics.final_pnl, dec!(14));
    assert_eq!(metrics.max_pnl, dec!(20));
    assert_eq!(metrics.max_drawdown, dec!(6));
    assert_eq!(metrics.start_ts, input[0].timestamp);
    assert_eq!(metrics.end_ts, input[2].timestamp);
}

#[test]
fn sell_pnl_sign() {
    let params = PositionParams {
        side: Side::Sell,
        ..buy_params()
    };
    let mut pos = PositionState::open("X", &params).unwrap();
    pos.update_price(dec!(90)).unwrap();
    assert_eq!(pos.unrealized_pnl().unwrap(), dec!(100));
    assert_eq!(pos.unrealized_pnl_pct().unwrap(), dec!(10));
}

#[test]
fn arming_threshold() {
    let mut pos = PositionState::open("X", &buy_params()).unwrap();
    pos.update_price(dec!(100.5)).unwrap();
    assert!(!pos.is_trailing_stop_activated());
    pos.update_price(dec!(101)).unwrap();
    assert!(pos.is_trailing_stop_activated());
}

#[test]
fn empty_input() {
    let sim = simulate(&[], "X", &buy_params()).unwrap();
    assert!(sim.position.is_none());
    assert!(sim.events.is_empty());
    assert_eq!(analyze(&sim.events), Ok(None));
}

#[test]
fn indicator_warmup() {
    let ten: Vec<Decimal> = (0..10).map(|i| Decimal::from(100 + i)).collect();
    assert!(Rsi::new(14).compute(&ten).iter().all(Option::is_none));

    let twenty: Vec<Decimal> = (0..20).map(|i| Decimal::from(100 + (i % 4))).collect();
    let rsi = Rsi::new(14).compute(&twenty);
    assert!(rsi[..14].iter().all(Option::is_none));
    assert!(rsi[14..].iter().all(Option::is_some));
}

#[test]
fn synthetic_fetch_feeds_simulation() {
    let source = SyntheticSource::new(11);
    let request = FetchRequest::new("SYN", 0, 499 * 300_000, Interval::FiveMinutes);
    let loaded = fetch_bars(&source, &request).unwrap();
    assert_eq!(loaded.bars.len(), 500);

    let params = PositionParams {
        entry_price: loaded.bars[0].close,
        ..buy_params()
    };
    let a = simulate(&loaded.bars, "SYN-USDC", &params).unwrap();
    let b = simulate(&loaded.bars, "SYN-USDC", &params).unwrap();
    assert_eq!(a, b);
    assert!(!a.events.is_empty());
    let metrics = analyze(&a.events).unwrap().unwrap();
    assert!(metrics.max_pnl >= metrics.final_pnl);
    assert!(metrics.min_pnl <= metrics.final_pnl);
}
