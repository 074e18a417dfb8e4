//! Account state carried from one cycle to the next.

use std::fmt;

use crate::error::ConfigError;
use crate::types::{Price, Quantity};

/// Investment style, which caps how much of the pool a single cycle may commit to buys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InvestStyle {
    /// Regular deposits: up to 75% of the pool per cycle.
    #[default]
    Accumulate,
    /// One-off lump sum, no further deposits: 50%.
    Lump,
    /// Drawing down the account: 25%.
    Withdraw,
}

impl InvestStyle {
    /// Maximum share of the pool committed to buy orders in one cycle.
    pub fn pool_cap_ratio(self) -> f64 {
        match self {
            InvestStyle::Accumulate => 0.75,
            InvestStyle::Lump => 0.50,
            InvestStyle::Withdraw => 0.25,
        }
    }
}

impl fmt::Display for InvestStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvestStyle::Accumulate => "accumulate",
            InvestStyle::Lump => "lump",
            InvestStyle::Withdraw => "withdraw",
        };
        write!(f, "{name} (pool {:.0}%)", self.pool_cap_ratio() * 100.0)
    }
}

/// Holdings, cash and strategy parameters for one account.
///
/// All money fields are in cents. The target value only ever comes out of
/// [`crate::growth`]; nothing else in the engine writes it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountState {
    /// Shares held.
    pub quantity: Quantity,
    /// Uninvested cash.
    pub pool_cents: i64,
    /// Cumulative capital ever contributed.
    pub principal_cents: i64,
    /// Target value "V".
    pub target_value_cents: i64,
    /// "G": larger values slow V's growth. Must be >= 1.
    pub growth_divisor: i64,
    /// Half-width of the band around V, as a fraction in (0, 1).
    pub band_width: f64,
    /// Share of the pool that may back buy orders this cycle, in (0, 1].
    pub pool_cap_ratio: f64,
}

impl AccountState {
    /// An empty account with the given parameters and the style's pool cap.
    pub fn new(growth_divisor: i64, band_width: f64, style: InvestStyle) -> Self {
        Self {
            quantity: 0,
            pool_cents: 0,
            principal_cents: 0,
            target_value_cents: 0,
            growth_divisor,
            band_width,
            pool_cap_ratio: style.pool_cap_ratio(),
        }
    }

    /// Check the configured parameters.
    ///
    /// Money fields are not checked here; the engine clamps negatives to zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.growth_divisor < 1 {
            return Err(ConfigError::GrowthDivisor(self.growth_divisor));
        }
        if !self.band_width.is_finite() || self.band_width <= 0.0 || self.band_width >= 1.0 {
            return Err(ConfigError::BandWidth(self.band_width));
        }
        if !self.pool_cap_ratio.is_finite()
            || self.pool_cap_ratio <= 0.0
            || self.pool_cap_ratio > 1.0
        {
            return Err(ConfigError::PoolCapRatio(self.pool_cap_ratio));
        }
        Ok(())
    }

    /// Copy with negative money fields clamped to zero.
    pub fn clamped(&self) -> Self {
        Self {
            pool_cents: self.pool_cents.max(0),
            principal_cents: self.principal_cents.max(0),
            target_value_cents: self.target_value_cents.max(0),
            ..self.clone()
        }
    }

    /// Market value of the held shares.
    pub fn position_value_cents(&self, price: Price) -> i64 {
        Price(price.0.max(0)).notional(self.quantity)
    }

    /// Position value plus pool.
    pub fn total_value_cents(&self, price: Price) -> i64 {
        self.position_value_cents(price)
            .saturating_add(self.pool_cents.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountState {
        AccountState {
            quantity: 100,
            pool_cents: 2_000_00,
            principal_cents: 7_000_00,
            target_value_cents: 5_000_00,
            growth_divisor: 10,
            band_width: 0.15,
            pool_cap_ratio: 0.75,
        }
    }

    #[test]
    fn style_caps() {
        assert_eq!(InvestStyle::Accumulate.pool_cap_ratio(), 0.75);
        assert_eq!(InvestStyle::Lump.pool_cap_ratio(), 0.50);
        assert_eq!(InvestStyle::Withdraw.pool_cap_ratio(), 0.25);
        assert_eq!(InvestStyle::default(), InvestStyle::Accumulate);
    }

    #[test]
    fn style_display() {
        assert_eq!(format!("{}", InvestStyle::Lump), "lump (pool 50%)");
    }

    #[test]
    fn valid_account_passes() {
        assert!(account().validate().is_ok());
    }

    #[test]
    fn rejects_zero_divisor() {
        let mut a = account();
        a.growth_divisor = 0;
        assert_eq!(a.validate(), Err(ConfigError::GrowthDivisor(0)));
        a.growth_divisor = -3;
        assert_eq!(a.validate(), Err(ConfigError::GrowthDivisor(-3)));
    }

    #[test]
    fn rejects_bad_band_width() {
        let mut a = account();
        for bad in [0.0, 1.0, -0.1, f64::NAN] {
            a.band_width = bad;
            assert!(matches!(a.validate(), Err(ConfigError::BandWidth(_))));
        }
    }

    #[test]
    fn rejects_bad_pool_cap() {
        let mut a = account();
        a.pool_cap_ratio = 0.0;
        assert!(matches!(a.validate(), Err(ConfigError::PoolCapRatio(_))));
        a.pool_cap_ratio = 1.01;
        assert!(matches!(a.validate(), Err(ConfigError::PoolCapRatio(_))));
        a.pool_cap_ratio = 1.0;
        assert!(a.validate().is_ok());
    }

    #[test]
    fn clamps_negative_money() {
        let mut a = account();
        a.pool_cents = -5;
        a.target_value_cents = -10;
        let c = a.clamped();
        assert_eq!(c.pool_cents, 0);
        assert_eq!(c.target_value_cents, 0);
        assert_eq!(c.principal_cents, 7_000_00);
    }

    #[test]
    fn values() {
        let a = account();
        assert_eq!(a.position_value_cents(Price(50_00)), 5_000_00);
        assert_eq!(a.total_value_cents(Price(50_00)), 7_000_00);
    }

    #[test]
    fn new_uses_style_cap() {
        let a = AccountState::new(10, 0.15, InvestStyle::Withdraw);
        assert_eq!(a.pool_cap_ratio, 0.25);
        assert_eq!(a.quantity, 0);
    }
}
