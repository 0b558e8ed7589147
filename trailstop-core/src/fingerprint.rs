//! Run fingerprinting: deterministic identification of a parameter set.
//!
//! The canonical encoding normalizes decimals, so two configurations that
//! differ only in trailing zeros share a `RunId`.

use crate::domain::RunId;
use crate::position_management::PositionParams;

pub fn canonical_run_key(trading_pair: &str, params: &PositionParams) -> String {
    format!("{}|{}", trading_pair, params.canonical())
}

pub fn run_id(trading_pair: &str, params: &PositionParams) -> RunId {
    RunId::from_canonical(&canonical_run_key(trading_pair, params))
}
