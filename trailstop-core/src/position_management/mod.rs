/// Position management: the trailing-stop state machine and its live controller.
///
/// **Module Structure:**
/// - `ratchet`: favourable-only watermark enforcement
/// - `state`: `PositionState` lifecycle, exit checks, PnL
/// - `controller`: signal-driven single-position controller emitting decisions
pub mod controller;
pub mod ratchet;
pub mod state;

pub use controller::{ControllerConfig, Decision, PositionController};
pub use ratchet::RatchetState;
pub use state::{PositionError, PositionParams, PositionPhase, PositionState};
