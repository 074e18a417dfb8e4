// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # vrbook
//!
//! A deterministic Value-Rebalancing (VR) engine for accumulating a leveraged ETF.
//!
//! Every cycle (typically two weeks) the engine grows a target value "V",
//! draws a band around it, and generates two ladders of resting limit orders:
//! buys below the price, funded from the cash pool, and sells above it.
//! Deep drawdowns gate new buying on market sentiment.
//!
//! ## Features
//!
//! - **Growth**: `V_next = V + pool / G + deposit`, never decreasing
//! - **Safety quota**: drawdown × sentiment table that throttles or blocks buys
//! - **Ladders**: evenly budgeted buy rungs; uniform or pyramid-weighted sell rungs
//! - **Degrades, never panics**: missing prices or empty pools give empty ladders and a warning
//! - **Fixed-point money**: every amount is integer cents
//!
//! ## Quick Start
//!
//! ```
//! use vrbook::{plan_cycle, CycleInput, CycleMode, LadderParams, MarketSnapshot, Price, SellLadderPolicy};
//!
//! let input = CycleInput {
//!     mode: CycleMode::Update {
//!         prev_target_cents: 5_000_00,
//!         prev_principal_cents: 7_000_00,
//!         base_pool_cents: 2_000_00,
//!         deposit_cents: 0,
//!     },
//!     quantity: 100,
//!     growth_divisor: 10,
//!     band_width: 0.15,
//!     pool_cap_ratio: 0.75,
//!     ladder: LadderParams::default(),
//!     sell_policy: SellLadderPolicy::pyramid(),
//! };
//! let snapshot = MarketSnapshot {
//!     price: Price(50_00),
//!     fx_rate: 1400.0,
//!     drawdown_pct: -3.0,
//!     sentiment_index: 45.0,
//!     is_uptrend: true,
//! };
//!
//! let plan = plan_cycle(&input, &snapshot).unwrap();
//! assert_eq!(plan.account.target_value_cents, 5_200_00);
//! assert!(plan.band.contains(5_200_00));
//! assert!(plan.buy.rungs().iter().all(|r| r.price < Price(50_00)));
//! ```
//!
//! ## Safety Quota
//!
//! | drawdown     | sentiment | quota |
//! |--------------|-----------|-------|
//! | > -10%       | any       | 100%  |
//! | (-20%, -10%] | <= 15     | 50%   |
//! | <= -20%      | <= 10     | 30%   |
//! | otherwise    |           | blocked |
//!
//! ```
//! use vrbook::quota::{evaluate, Regime};
//!
//! let d = evaluate(-25.0, 5.0);
//! assert_eq!(d.regime, Regime::Crash);
//! assert_eq!(d.quota_fraction, 0.3);
//!
//! assert!(!evaluate(-12.0, 40.0).allowed);
//! ```
//!
//! ## Price Representation
//!
//! Prices are stored as [`i64`] cents:
//!
//! ```
//! use vrbook::Price;
//!
//! let price = Price(100_50);  // $100.50
//! assert_eq!(format!("{}", price), "$100.50");
//! ```

pub mod account;
pub mod band;
pub mod cycle;
mod error;
pub mod growth;
pub mod ladder;
pub mod market;
pub mod quota;
mod side;
mod types;

// Re-export public API
pub use account::{AccountState, InvestStyle};
pub use band::{Band, BandPosition};
pub use cycle::{advance_account, plan_cycle, CycleInput, CycleMode, CyclePlan};
#[cfg(feature = "parallel")]
pub use cycle::plan_many;
pub use error::ConfigError;
pub use growth::{initial_setup, next_target, InitialSetup};
pub use ladder::{build_buy_ladder, build_sell_ladder, Ladder, LadderParams, Rung, SellLadderPolicy};
pub use market::{
    CachedMarketData, DataUnavailable, Fetched, MarketDataSource, MarketSnapshot, SnapshotOrigin,
};
pub use quota::{QuotaDecision, Regime};
pub use side::Side;
pub use types::{cents_to_dollars, dollars_to_cents, fmt_cents, signed_quantity, Price, Quantity};
