//! Rebalancing band around the target value.

use crate::quota::{CORRECTION_DRAWDOWN_PCT, CRASH_DRAWDOWN_PCT};

/// Band width used in a crash (drawdown <= -20%).
pub const CRASH_BAND_WIDTH: f64 = 0.10;
/// Band width used in a correction (-20% < drawdown <= -10%).
pub const CORRECTION_BAND_WIDTH: f64 = 0.12;
/// Band width in a normal market that is trending down.
pub const DEFAULT_BAND_WIDTH: f64 = 0.15;
/// Band width in a normal market that is trending up.
pub const UPTREND_BAND_WIDTH: f64 = 0.20;

/// `[lower, upper]` around V, in cents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Band {
    pub lower_cents: i64,
    pub upper_cents: i64,
}

/// Where a position value sits relative to the band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BandPosition {
    /// Under the lower edge: the buy ladder should be filling.
    Below,
    Inside,
    /// Over the upper edge: the sell ladder should be filling.
    Above,
}

impl std::fmt::Display for BandPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandPosition::Below => write!(f, "below band"),
            BandPosition::Inside => write!(f, "inside band"),
            BandPosition::Above => write!(f, "above band"),
        }
    }
}

impl Band {
    /// True if a position value lies inside the band (inclusive).
    pub fn contains(&self, value_cents: i64) -> bool {
        value_cents >= self.lower_cents && value_cents <= self.upper_cents
    }

    pub fn classify(&self, value_cents: i64) -> BandPosition {
        if value_cents < self.lower_cents {
            BandPosition::Below
        } else if value_cents > self.upper_cents {
            BandPosition::Above
        } else {
            BandPosition::Inside
        }
    }

    /// Distance between the edges.
    pub fn width_cents(&self) -> i64 {
        self.upper_cents - self.lower_cents
    }
}

/// `lower = V * (1 - w)`, `upper = V * (1 + w)`.
///
/// Edges round to the nearest cent and never cross V. Negative V is treated as zero.
pub fn band(target_value_cents: i64, band_width: f64) -> Band {
    let v = target_value_cents.max(0);
    let lower = (v as f64 * (1.0 - band_width)).round() as i64;
    let upper = (v as f64 * (1.0 + band_width)).round() as i64;
    Band {
        lower_cents: lower.clamp(0, v),
        upper_cents: upper.max(v),
    }
}

/// Advisory band width for the market regime.
///
/// Uses the same drawdown breakpoints as the quota table. Deep drawdowns and
/// downtrends narrow the band (smaller, more frequent trades); an uptrend in a
/// normal market widens it.
pub fn recommend_width(drawdown_pct: f64, is_uptrend: bool) -> f64 {
    if drawdown_pct <= CRASH_DRAWDOWN_PCT {
        CRASH_BAND_WIDTH
    } else if drawdown_pct <= CORRECTION_DRAWDOWN_PCT {
        CORRECTION_BAND_WIDTH
    } else if is_uptrend {
        UPTREND_BAND_WIDTH
    } else {
        DEFAULT_BAND_WIDTH
    }
}
