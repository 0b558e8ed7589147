//! Backtest engine: bar-by-bar replay of one position and its summary metrics.
//!
//! `simulate` produces one `BacktestEvent` per processed bar; `analyze`
//! reduces that log to `BacktestMetrics`. Both are pure and single-threaded;
//! parallelism lives one level up, across parameter combinations.

pub mod analyze;
pub mod event;
pub mod simulate;

pub use analyze::{analyze, BacktestMetrics};
pub use event::{BacktestEvent, EventKind};
pub use simulate::{simulate, Simulation};
