//! Ladder side: Buy or Sell

use std::fmt;

/// Side of a ladder rung.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Sign applied to the share count when a rung at this side fills.
    #[inline]
    pub fn quantity_sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    /// Sign applied to the pool when a rung at this side fills.
    #[inline]
    pub fn cash_sign(self) -> i64 {
        -self.quantity_sign()
    }

    /// Price multiplier for the rung `steps` steps of `step_pct` away from the
    /// anchor: buys step down, sells step up.
    #[inline]
    pub fn step_factor(self, step_pct: f64, steps: usize) -> f64 {
        1.0 + self.quantity_sign() as f64 * -step_pct * steps as f64
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}
