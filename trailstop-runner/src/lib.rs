//! Trailstop Runner: backtest orchestration, parameter sweeps, artifact export.
//!
//! This crate builds on `trailstop-core` to provide:
//! - TOML run configuration
//! - Data loading from file, Birdeye or synthetic sources
//! - Single-backtest runner with a text summary
//! - Parallel parameter sweep with cancellation
//! - Bar-by-bar replay of the live position controller
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod live;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, BacktestSection, ConfigError, DataSection, SourceKind, SweepSection};
pub use data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
pub use live::{replay_controller, ControllerReplay, ReplayStep};
pub use runner::{
    format_summary, run_backtest_from_data, run_single_backtest, run_with_params, BacktestReport,
    RunError, SCHEMA_VERSION,
};
pub use sweep::{
    run_sweep, CancelToken, ParamSweep, SweepEntry, SweepGrid, SweepOutcome, SweepReport,
};
