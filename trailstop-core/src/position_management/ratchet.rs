/// Ratchet invariant enforcement
///
/// **Core Rule:** the trailing reference may move in the position's favour, never back.
///
/// Once armed, the reference is the best price seen since arming: the running
/// maximum for a buy, the running minimum for a sell. The trigger level is
/// derived from it, so the trigger inherits the same monotonicity.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Ratchet state for the trailing reference price.
///
/// - Buy positions: level can only rise
/// - Sell positions: level can only fall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatchetState {
    /// Favourable watermark (`None` until the first `apply`)
    current_level: Option<Decimal>,

    side: Side,
}

impl RatchetState {
    pub fn new(side: Side) -> Self {
        Self {
            current_level: None,
            side,
        }
    }

    pub fn with_initial_level(side: Side, initial_level: Decimal) -> Self {
        Self {
            current_level: Some(initial_level),
            side,
        }
    }

    /// Apply ratchet to a proposed level and return the resulting level.
    ///
    /// # Rules
    /// - Buy: max of current and proposed
    /// - Sell: min of current and proposed
    /// - If no current level exists, initializes to the proposed level
    ///
    /// # Example
    /// ```
    /// use rust_decimal::Decimal;
    /// use trailstop_core::domain::Side;
    /// use trailstop_core::position_management::RatchetState;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(Side::Buy, Decimal::from(95));
    ///
    /// // Favourable: 95 → 100 (allowed)
    /// assert_eq!(ratchet.apply(Decimal::from(100)), Decimal::from(100));
    ///
    /// // Adverse: 100 → 90 (blocked, stays at 100)
    /// assert_eq!(ratchet.apply(Decimal::from(90)), Decimal::from(100));
    /// ```
    pub fn apply(&mut self, proposed: Decimal) -> Decimal {
        let ratcheted = match self.current_level {
            None => proposed,
            Some(current) => match self.side {
                Side::Buy => current.max(proposed),
                Side::Sell => current.min(proposed),
            },
        };
        self.current_level = Some(ratcheted);
        ratcheted
    }

    pub fn current_level(&self) -> Option<Decimal> {
        self.current_level
    }

    pub fn side(&self) -> Side {
        self.side
    }
}
