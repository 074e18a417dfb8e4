//! Buy and sell ladders: the resting limit orders that pull the account back
//! toward V.
//!
//! A ladder is regenerated from scratch every cycle. Each rung carries the
//! running share count and running pool after that rung (and every rung
//! before it) fills, which is what the operator reads off the table.
//!
//! ```
//! use vrbook::ladder::{build_buy_ladder, LadderParams};
//! use vrbook::Price;
//!
//! let params = LadderParams { step_count: 5, step_pct: 0.02 };
//! let buy = build_buy_ladder(Price(50_00), 100, 2_000_00, 1.0, 0.75, &params);
//!
//! // $1,500 usable, $300 per rung, first rung 2% below $50
//! assert_eq!(buy.rungs()[0].price, Price(49_00));
//! assert_eq!(buy.rungs()[0].quantity, 6);
//! ```

use std::fmt;

use crate::error::ConfigError;
use crate::side::Side;
use crate::types::{fmt_cents, signed_quantity, Price, Quantity};

/// Weights for the pyramid sell policy: later (higher) rungs sell more.
pub const DEFAULT_PYRAMID_WEIGHTS: [u32; 10] = [1, 1, 2, 2, 3, 3, 4, 4, 5, 5];

/// Default number of rungs per ladder.
pub const DEFAULT_STEP_COUNT: usize = 10;

/// Default price step between rungs (1.5%).
pub const DEFAULT_STEP_PCT: f64 = 0.015;

/// One resting order and the account state once it (and all before it) fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rung {
    pub side: Side,
    pub price: Price,
    /// Shares in this order, always > 0.
    pub quantity: Quantity,
    /// Shares held after this rung fills.
    pub running_quantity: i64,
    /// Pool after this rung fills, in cents.
    pub running_pool_cents: i64,
}

impl Rung {
    /// Cash that changes hands when this rung fills.
    pub fn notional_cents(&self) -> i64 {
        self.price.notional(self.quantity)
    }
}

impl fmt::Display for Rung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} -> {} shares, pool {}",
            self.side,
            self.quantity,
            self.price,
            self.running_quantity,
            fmt_cents(self.running_pool_cents),
        )
    }
}

/// An ordered sequence of rungs on one side.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ladder {
    side: Side,
    rungs: Vec<Rung>,
}

impl Ladder {
    /// An empty ladder for the given side.
    pub fn empty(side: Side) -> Self {
        Self {
            side,
            rungs: Vec::new(),
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    /// Sum of shares across all rungs.
    pub fn total_quantity(&self) -> Quantity {
        self.rungs.iter().map(|r| r.quantity).sum()
    }

    /// Sum of rung notionals, in cents.
    pub fn total_notional_cents(&self) -> i64 {
        self.rungs
            .iter()
            .map(Rung::notional_cents)
            .fold(0, i64::saturating_add)
    }

    /// Size of the first rung ("N shares per rung" in the operator display).
    pub fn step_quantity(&self) -> Option<Quantity> {
        self.rungs.first().map(|r| r.quantity)
    }

    fn push(
        &mut self,
        price: Price,
        quantity: Quantity,
        running_quantity: i64,
        running_pool_cents: i64,
    ) {
        self.rungs.push(Rung {
            side: self.side,
            price,
            quantity,
            running_quantity,
            running_pool_cents,
        });
    }
}

impl<'a> IntoIterator for &'a Ladder {
    type Item = &'a Rung;
    type IntoIter = std::slice::Iter<'a, Rung>;

    fn into_iter(self) -> Self::IntoIter {
        self.rungs.iter()
    }
}

/// Rung count and spacing shared by both ladders.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LadderParams {
    pub step_count: usize,
    /// Price step between rungs as a fraction (0.015 = 1.5%).
    pub step_pct: f64,
}

impl Default for LadderParams {
    fn default() -> Self {
        Self {
            step_count: DEFAULT_STEP_COUNT,
            step_pct: DEFAULT_STEP_PCT,
        }
    }
}

impl LadderParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_count == 0 {
            return Err(ConfigError::StepCount);
        }
        if !self.step_pct.is_finite() || self.step_pct <= 0.0 || self.step_pct >= 1.0 {
            return Err(ConfigError::StepPct(self.step_pct));
        }
        Ok(())
    }
}

/// How the sell ladder splits the position across rungs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SellLadderPolicy {
    /// `quantity / step_count` shares per rung, starting one step above the price.
    Uniform,
    /// Weighted rungs starting where the position value reaches the band's
    /// upper edge; heavier weights sell faster as price runs further above V.
    Pyramid(Vec<u32>),
}

impl SellLadderPolicy {
    /// Pyramid with [`DEFAULT_PYRAMID_WEIGHTS`].
    pub fn pyramid() -> Self {
        SellLadderPolicy::Pyramid(DEFAULT_PYRAMID_WEIGHTS.to_vec())
    }
}

impl Default for SellLadderPolicy {
    fn default() -> Self {
        Self::pyramid()
    }
}

impl fmt::Display for SellLadderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellLadderPolicy::Uniform => write!(f, "uniform"),
            SellLadderPolicy::Pyramid(w) => write!(f, "pyramid {w:?}"),
        }
    }
}

/// Buy ladder below the current price.
///
/// Usable budget is `pool * pool_cap_ratio * quota_fraction`, split evenly
/// into `step_count` rung budgets. Rung `i` (1-indexed) sits at
/// `price * (1 - step_pct * i)` and buys `floor(rung_budget / rung_price)`
/// shares; rungs that would buy nothing are skipped. Generation stops if the
/// next rung would push cumulative spend past the usable budget, or once the
/// rung price would reach zero.
///
/// Returns an empty ladder when there are no shares held, the price or pool
/// is not positive, or the quota is zero (blocked regime).
pub fn build_buy_ladder(
    current_price: Price,
    quantity: Quantity,
    pool_cents: i64,
    quota_fraction: f64,
    pool_cap_ratio: f64,
    params: &LadderParams,
) -> Ladder {
    let mut ladder = Ladder::empty(Side::Buy);

    let quota = sanitize_fraction(quota_fraction);
    let cap = sanitize_fraction(pool_cap_ratio);
    if quantity == 0 || !current_price.is_positive() || pool_cents <= 0 || quota == 0.0 {
        return ladder;
    }
    if params.step_count == 0 || !params.step_pct.is_finite() || params.step_pct <= 0.0 {
        return ladder;
    }

    let usable = (pool_cents as f64 * cap * quota).floor() as i64;
    let rung_budget = usable / params.step_count as i64;
    if rung_budget <= 0 {
        return ladder;
    }

    let mut spent = 0_i64;
    let mut running_quantity = signed_quantity(quantity);
    let mut running_pool = pool_cents;
    let mut last_price = current_price;

    for i in 1..=params.step_count {
        let factor = Side::Buy.step_factor(params.step_pct, i);
        if factor <= 0.0 {
            break;
        }
        let price = current_price.scale(factor);
        if !price.is_positive() {
            break;
        }
        // Rounding to the cent can collapse neighbouring rungs at low prices.
        if price >= last_price {
            continue;
        }
        last_price = price;

        let rung_quantity = rung_budget / price.0;
        if rung_quantity == 0 {
            continue;
        }
        let cost = rung_quantity.saturating_mul(price.0);
        if spent.saturating_add(cost) > usable {
            break;
        }

        spent = spent.saturating_add(cost);
        running_quantity =
            running_quantity.saturating_add(Side::Buy.quantity_sign() * rung_quantity);
        running_pool = running_pool.saturating_add(Side::Buy.cash_sign() * cost);
        ladder.push(price, rung_quantity as Quantity, running_quantity, running_pool);
    }

    ladder
}

/// Sell ladder at and above the current price.
///
/// See [`SellLadderPolicy`] for how rungs are sized and priced. `band_upper_cents`
/// anchors the pyramid's first rung; when it is not positive the target value
/// is used instead. Both policies stop before cumulative sold quantity would
/// exceed the holdings.
///
/// Returns an empty ladder when no shares are held or the price is not positive.
pub fn build_sell_ladder(
    current_price: Price,
    quantity: Quantity,
    pool_cents: i64,
    target_value_cents: i64,
    band_upper_cents: i64,
    params: &LadderParams,
    policy: &SellLadderPolicy,
) -> Ladder {
    let mut ladder = Ladder::empty(Side::Sell);
    if quantity == 0 || !current_price.is_positive() || params.step_count == 0 {
        return ladder;
    }
    let step_pct = if params.step_pct.is_finite() {
        params.step_pct.max(0.0)
    } else {
        0.0
    };

    let plan: Vec<(Price, Quantity)> = match policy {
        SellLadderPolicy::Uniform => {
            let per_rung = (quantity / params.step_count as Quantity).max(1);
            (1..=params.step_count)
                .map(|i| (current_price.scale(Side::Sell.step_factor(step_pct, i)), per_rung))
                .collect()
        }
        SellLadderPolicy::Pyramid(weights) => {
            let used = &weights[..params.step_count.min(weights.len())];
            let weight_sum: u64 = used.iter().map(|&w| u64::from(w)).sum();
            if weight_sum == 0 {
                return ladder;
            }
            let unit_share = quantity as f64 / weight_sum as f64;

            let anchor = if band_upper_cents > 0 {
                band_upper_cents
            } else {
                target_value_cents.max(0)
            };
            let band_price = Price((anchor as f64 / quantity as f64).round() as i64);
            let start = current_price.max(band_price);

            used.iter()
                .enumerate()
                .filter(|&(_, &w)| w > 0)
                .map(|(i, &w)| {
                    let price = start.scale(Side::Sell.step_factor(step_pct, i));
                    let rung_quantity = ((unit_share * f64::from(w)).floor() as Quantity).max(1);
                    (price, rung_quantity)
                })
                .collect()
        }
    };

    let mut sold: Quantity = 0;
    let mut running_quantity = signed_quantity(quantity);
    let mut running_pool = pool_cents;

    for (price, rung_quantity) in plan {
        if sold.saturating_add(rung_quantity) > quantity {
            break;
        }
        sold += rung_quantity;
        running_quantity = running_quantity
            .saturating_add(Side::Sell.quantity_sign() * signed_quantity(rung_quantity));
        let proceeds = Side::Sell.cash_sign().saturating_mul(price.notional(rung_quantity));
        running_pool = running_pool.saturating_add(proceeds);
        ladder.push(price, rung_quantity, running_quantity, running_pool);
    }

    ladder
}

fn sanitize_fraction(x: f64) -> f64 {
    if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
}
