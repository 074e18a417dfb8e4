//! One full cycle: quota → growth → band → ladders.
//!
//! [`plan_cycle`] is a pure function of its inputs. Only invalid parameters
//! ([`ConfigError`]) stop it; degenerate market or account state produces a
//! plan with empty ladders and a warning instead.

use crate::account::AccountState;
use crate::band::{self, Band, BandPosition};
use crate::error::ConfigError;
use crate::growth::{self, initial_setup};
use crate::ladder::{build_buy_ladder, build_sell_ladder, Ladder, LadderParams, SellLadderPolicy};
use crate::market::MarketSnapshot;
use crate::quota::{self, QuotaDecision};
use crate::types::{cents_to_dollars, Price, Quantity};

/// How the account's V, pool and principal are obtained this cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CycleMode {
    /// First cycle: buy an opening position with part of the principal.
    Initial {
        principal_cents: i64,
        invest_ratio: f64,
    },
    /// Regular cycle seeded from the previous cycle's record.
    Update {
        prev_target_cents: i64,
        prev_principal_cents: i64,
        /// Cash in the account before this cycle's deposit.
        base_pool_cents: i64,
        deposit_cents: i64,
    },
}

/// Everything one cycle needs besides the market snapshot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CycleInput {
    pub mode: CycleMode,
    /// Shares held. Ignored by [`CycleMode::Initial`], which computes it.
    pub quantity: Quantity,
    pub growth_divisor: i64,
    pub band_width: f64,
    pub pool_cap_ratio: f64,
    pub ladder: LadderParams,
    pub sell_policy: SellLadderPolicy,
}

/// Output of one cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CyclePlan {
    /// Account after this cycle's growth (or initial setup).
    pub account: AccountState,
    pub snapshot: MarketSnapshot,
    /// How much V moved this cycle (zero on initial setup).
    pub growth_cents: i64,
    pub quota: QuotaDecision,
    pub band: Band,
    pub band_position: BandPosition,
    /// Advisory width for the current regime; the plan itself uses the account's width.
    pub recommended_band_width: f64,
    pub buy: Ladder,
    pub sell: Ladder,
    pub position_value_cents: i64,
    pub total_value_cents: i64,
    /// Degenerate-state and blocked-regime notes for the operator.
    pub warnings: Vec<String>,
}

impl CyclePlan {
    /// Convert an amount to the snapshot's quote currency (e.g. KRW).
    pub fn to_quote_currency(&self, cents: i64) -> f64 {
        cents_to_dollars(cents) * self.snapshot.fx_rate
    }

    /// True if buying is allowed and the buy ladder has rungs.
    pub fn has_buys(&self) -> bool {
        self.quota.allowed && !self.buy.is_empty()
    }
}

/// Resolve the account for this cycle from the mode's seed values.
///
/// Initial setup sizes the opening position at `price`; an update adds the
/// deposit to pool and principal and grows V. Returns the account and the
/// growth term added to V (zero on initial setup).
pub fn advance_account(
    input: &CycleInput,
    price: Price,
) -> Result<(AccountState, i64), ConfigError> {
    let mut account = AccountState {
        quantity: input.quantity,
        pool_cents: 0,
        principal_cents: 0,
        target_value_cents: 0,
        growth_divisor: input.growth_divisor,
        band_width: input.band_width,
        pool_cap_ratio: input.pool_cap_ratio,
    };
    account.validate()?;

    match input.mode {
        CycleMode::Initial {
            principal_cents,
            invest_ratio,
        } => {
            let setup = initial_setup(principal_cents, price, invest_ratio)?;
            account.quantity = setup.quantity;
            account.pool_cents = setup.pool_cents;
            account.principal_cents = setup.principal_cents;
            account.target_value_cents = setup.target_value_cents;
            Ok((account, 0))
        }
        CycleMode::Update {
            prev_target_cents,
            prev_principal_cents,
            base_pool_cents,
            deposit_cents,
        } => {
            let deposit = deposit_cents.max(0);
            let pool = base_pool_cents.max(0).saturating_add(deposit);
            let prev_target = prev_target_cents.max(0);
            let target = growth::next_target(prev_target, pool, input.growth_divisor, deposit)?;

            account.pool_cents = pool;
            account.principal_cents = prev_principal_cents.max(0).saturating_add(deposit);
            account.target_value_cents = target;
            Ok((account, target.saturating_sub(prev_target).saturating_sub(deposit)))
        }
    }
}

/// Run one cycle.
///
/// # Errors
///
/// [`ConfigError`] for an invalid growth divisor, band width, pool cap,
/// invest ratio or ladder parameters. Nothing else fails.
pub fn plan_cycle(
    input: &CycleInput,
    snapshot: &MarketSnapshot,
) -> Result<CyclePlan, ConfigError> {
    input.ladder.validate()?;
    let snapshot = snapshot.normalized();
    let price = snapshot.price;

    let quota = quota::evaluate(snapshot.drawdown_pct, snapshot.sentiment_index);
    let (account, growth_cents) = advance_account(input, price)?;
    let band = band::band(account.target_value_cents, account.band_width);
    let recommended_band_width = band::recommend_width(snapshot.drawdown_pct, snapshot.is_uptrend);

    let mut warnings = Vec::new();
    if !price.is_positive() {
        warnings.push("price unavailable: ladders not generated".to_string());
    } else if account.quantity == 0 {
        warnings.push("no shares held: ladders not generated".to_string());
    }
    if account.pool_cents <= 0 {
        warnings.push("pool is empty: buy ladder not generated".to_string());
    }
    if let Some(reason) = quota.blocking_reason() {
        warnings.push(reason);
    }

    let buy = build_buy_ladder(
        price,
        account.quantity,
        account.pool_cents,
        quota.quota_fraction,
        account.pool_cap_ratio,
        &input.ladder,
    );
    let sell = build_sell_ladder(
        price,
        account.quantity,
        account.pool_cents,
        account.target_value_cents,
        band.upper_cents,
        &input.ladder,
        &input.sell_policy,
    );

    let position_value_cents = account.position_value_cents(price);
    let total_value_cents = account.total_value_cents(price);

    Ok(CyclePlan {
        band_position: band.classify(position_value_cents),
        account,
        snapshot,
        growth_cents,
        quota,
        band,
        recommended_band_width,
        buy,
        sell,
        position_value_cents,
        total_value_cents,
        warnings,
    })
}

/// Plan independent cycles (e.g. several accounts) in parallel.
///
/// Output order matches input order and each entry equals what
/// [`plan_cycle`] returns for it.
#[cfg(feature = "parallel")]
pub fn plan_many(
    cycles: &[(CycleInput, MarketSnapshot)],
) -> Vec<Result<CyclePlan, ConfigError>> {
    use rayon::prelude::*;

    cycles
        .par_iter()
        .map(|(input, snapshot)| plan_cycle(input, snapshot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::Regime;

    fn snapshot(price: i64, drawdown_pct: f64, sentiment_index: f64) -> MarketSnapshot {
        MarketSnapshot {
            price: Price(price),
            fx_rate: 1400.0,
            drawdown_pct,
            sentiment_index,
            is_uptrend: true,
        }
    }

    fn update_input(quantity: Quantity, base_pool_cents: i64, deposit_cents: i64) -> CycleInput {
        CycleInput {
            mode: CycleMode::Update {
                prev_target_cents: 5_000_00,
                prev_principal_cents: 7_000_00,
                base_pool_cents,
                deposit_cents,
            },
            quantity,
            growth_divisor: 10,
            band_width: 0.15,
            pool_cap_ratio: 0.75,
            ladder: LadderParams::default(),
            sell_policy: SellLadderPolicy::pyramid(),
        }
    }

    #[test]
    fn update_grows_target_and_principal() {
        let plan = plan_cycle(&update_input(100, 1_800_00, 200_00), &snapshot(50_00, 0.0, 50.0))
            .unwrap();
        // pool 2000 → growth 200; deposit 200
        assert_eq!(plan.account.pool_cents, 2_000_00);
        assert_eq!(plan.account.principal_cents, 7_200_00);
        assert_eq!(plan.account.target_value_cents, 5_400_00);
        assert_eq!(plan.growth_cents, 200_00);
        assert_eq!(plan.band.lower_cents, 4_590_00);
        assert_eq!(plan.band.upper_cents, 6_210_00);
        assert!(plan.warnings.is_empty());
        assert!(plan.has_buys());
        assert!(!plan.sell.is_empty());
    }

    #[test]
    fn initial_setup_plan() {
        let input = CycleInput {
            mode: CycleMode::Initial {
                principal_cents: 5_000_00,
                invest_ratio: 0.5,
            },
            quantity: 999,
            ..update_input(0, 0, 0)
        };
        let plan = plan_cycle(&input, &snapshot(50_00, 0.0, 50.0)).unwrap();
        assert_eq!(plan.account.quantity, 50);
        assert_eq!(plan.account.target_value_cents, 2_500_00);
        assert_eq!(plan.account.pool_cents, 2_500_00);
        assert_eq!(plan.growth_cents, 0);
        assert_eq!(plan.band_position, BandPosition::Inside);
    }

    #[test]
    fn blocked_regime_warns_and_has_no_buys() {
        let plan =
            plan_cycle(&update_input(100, 2_000_00, 0), &snapshot(50_00, -15.0, 40.0)).unwrap();
        assert_eq!(plan.quota.regime, Regime::CorrectionBlocked);
        assert!(plan.buy.is_empty());
        assert!(!plan.has_buys());
        assert!(plan.warnings.iter().any(|w| w.contains("blocked")));
        // selling is unaffected by the quota
        assert!(!plan.sell.is_empty());
    }

    #[test]
    fn zero_price_is_degenerate_not_fatal() {
        let plan = plan_cycle(&update_input(100, 2_000_00, 0), &snapshot(0, 0.0, 50.0)).unwrap();
        assert!(plan.buy.is_empty());
        assert!(plan.sell.is_empty());
        assert!(plan.warnings.iter().any(|w| w.contains("price")));
    }

    #[test]
    fn zero_quantity_is_degenerate_not_fatal() {
        let plan = plan_cycle(&update_input(0, 2_000_00, 0), &snapshot(50_00, 0.0, 50.0)).unwrap();
        assert!(plan.buy.is_empty());
        assert!(plan.sell.is_empty());
        assert!(plan.warnings.iter().any(|w| w.contains("no shares")));
    }

    #[test]
    fn empty_pool_warns() {
        let plan = plan_cycle(&update_input(100, 0, 0), &snapshot(50_00, 0.0, 50.0)).unwrap();
        assert!(plan.buy.is_empty());
        assert_eq!(plan.account.target_value_cents, 5_000_00);
        assert!(plan.warnings.iter().any(|w| w.contains("pool")));
    }

    #[test]
    fn configuration_errors_are_fatal() {
        let mut input = update_input(100, 2_000_00, 0);
        input.growth_divisor = 0;
        assert_eq!(
            plan_cycle(&input, &snapshot(50_00, 0.0, 50.0)),
            Err(ConfigError::GrowthDivisor(0))
        );

        let mut input = update_input(100, 2_000_00, 0);
        input.ladder.step_count = 0;
        assert_eq!(
            plan_cycle(&input, &snapshot(50_00, 0.0, 50.0)),
            Err(ConfigError::StepCount)
        );

        let mut input = update_input(100, 2_000_00, 0);
        input.pool_cap_ratio = 0.0;
        assert!(plan_cycle(&input, &snapshot(50_00, 0.0, 50.0)).is_err());
    }

    #[test]
    fn position_above_band_is_flagged() {
        // 100 shares at $70 = $7,000, well above the ~$5,750 upper edge
        let plan = plan_cycle(&update_input(100, 1_70, 0), &snapshot(70_00, 0.0, 50.0)).unwrap();
        assert_eq!(plan.band_position, BandPosition::Above);
        assert_eq!(plan.sell.rungs()[0].price, Price(70_00));
    }

    #[test]
    fn quote_currency_conversion() {
        let plan = plan_cycle(&update_input(100, 2_000_00, 0), &snapshot(50_00, 0.0, 50.0)).unwrap();
        assert_eq!(plan.to_quote_currency(100_00), 140_000.0);
        assert_eq!(plan.total_value_cents, 7_000_00);
        assert_eq!(plan.position_value_cents, 5_000_00);
    }

    #[test]
    fn plan_is_deterministic() {
        let input = update_input(100, 2_000_00, 100_00);
        let snap = snapshot(50_00, -12.0, 10.0);
        assert_eq!(plan_cycle(&input, &snap), plan_cycle(&input, &snap));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let cycles: Vec<(CycleInput, MarketSnapshot)> = (1..=8)
            .map(|i| {
                (
                    update_input(10 * i, 1_000_00 * i as i64, 0),
                    snapshot(50_00, -3.0 * i as f64, 8.0),
                )
            })
            .collect();
        let parallel = plan_many(&cycles);
        for ((input, snap), got) in cycles.iter().zip(parallel) {
            assert_eq!(got, plan_cycle(input, snap));
        }
    }
}
