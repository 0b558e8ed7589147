//! Domain types for trailstop

pub mod bar;
pub mod ids;
pub mod interval;
pub mod side;

pub use bar::Bar;
pub use ids::RunId;
pub use interval::{Interval, ParseIntervalError};
pub use side::{ExitReason, ParseSideError, Side};

/// Trading pair label, e.g. `AI16Z-USDC`.
pub type TradingPair = String;
