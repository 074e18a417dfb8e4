//! Target value growth.
//!
//! Each cycle V grows by `pool / G` plus whatever was deposited:
//!
//! ```
//! use vrbook::growth::next_target;
//!
//! // $5,000 target, $1,000 pool, G = 10, $200 deposit
//! let v = next_target(5_000_00, 1_000_00, 10, 200_00).unwrap();
//! assert_eq!(v, 5_300_00);
//! ```
//!
//! The first cycle has no previous V; [`initial_setup`] seeds it from the
//! position bought with part of the principal.

use crate::error::ConfigError;
use crate::types::{Price, Quantity};

/// Share of the principal spent on the opening position by default.
pub const DEFAULT_INVEST_RATIO: f64 = 0.5;

/// Next target value in cents.
///
/// `next = prev + ceil(pool / G) + deposit`, with the growth term zero when the
/// pool is empty. The growth term rounds up to the next cent so any cash at all
/// moves V. Negative inputs are clamped to zero.
///
/// # Errors
///
/// [`ConfigError::GrowthDivisor`] if `growth_divisor < 1`.
pub fn next_target(
    prev_target_cents: i64,
    pool_cents: i64,
    growth_divisor: i64,
    new_deposit_cents: i64,
) -> Result<i64, ConfigError> {
    if growth_divisor < 1 {
        return Err(ConfigError::GrowthDivisor(growth_divisor));
    }

    let prev = prev_target_cents.max(0);
    let pool = pool_cents.max(0);
    let deposit = new_deposit_cents.max(0);

    let growth = if pool > 0 {
        pool / growth_divisor + i64::from(pool % growth_divisor != 0)
    } else {
        0
    };

    Ok(prev.saturating_add(growth).saturating_add(deposit))
}

/// Account values right after the opening purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InitialSetup {
    pub quantity: Quantity,
    pub pool_cents: i64,
    pub target_value_cents: i64,
    pub principal_cents: i64,
}

/// Split a fresh principal into an opening position and a cash pool.
///
/// Buys `floor(principal * invest_ratio / price)` shares; the rest stays in the
/// pool and V starts at the position's market value. A zero price buys nothing.
///
/// # Errors
///
/// [`ConfigError::InvestRatio`] if `invest_ratio` is not in (0, 1].
pub fn initial_setup(
    principal_cents: i64,
    price: Price,
    invest_ratio: f64,
) -> Result<InitialSetup, ConfigError> {
    if !invest_ratio.is_finite() || invest_ratio <= 0.0 || invest_ratio > 1.0 {
        return Err(ConfigError::InvestRatio(invest_ratio));
    }

    let principal = principal_cents.max(0);
    if !price.is_positive() {
        return Ok(InitialSetup {
            quantity: 0,
            pool_cents: principal,
            target_value_cents: 0,
            principal_cents: principal,
        });
    }

    let budget = (principal as f64 * invest_ratio).floor() as i64;
    let quantity = budget / price.0;
    let cost = quantity * price.0;

    Ok(InitialSetup {
        quantity: quantity as Quantity,
        pool_cents: principal - cost,
        target_value_cents: cost,
        principal_cents: principal,
    })
}
