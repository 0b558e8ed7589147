//! Trailstop Core: bars, aggregation, indicators, the trailing-stop position
//! state machine and its backtest replay.
//!
//! This crate contains the engine:
//! - Domain types (bars, sides, intervals, run ids)
//! - Candle sources and the bar aggregator
//! - Indicator engine (RSI, Bollinger, EMA)
//! - Position state machine with ratchet invariant
//! - Entry signals and the live position controller
//! - Backtest simulation and metrics

pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod indicators;
pub mod position_management;
pub mod signals;
pub mod status;
