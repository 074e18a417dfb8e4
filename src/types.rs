//! Core types: Price, Quantity, and cent/dollar conversion helpers.

use std::fmt;

/// Price in smallest units (cents).
///
/// `Price(4900)` represents $49.00.
/// Using fixed-point avoids floating-point drift when ladders are summed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Convert a dollar amount to the nearest cent.
    pub fn from_dollars(dollars: f64) -> Self {
        Price(dollars_to_cents(dollars))
    }

    /// Dollar value as a float (display and ratio math only).
    #[inline]
    pub fn to_dollars(self) -> f64 {
        cents_to_dollars(self.0)
    }

    /// Multiply by a factor, rounding to the nearest cent.
    ///
    /// `Price(50_00).scale(0.98) == Price(49_00)`.
    #[inline]
    pub fn scale(self, factor: f64) -> Self {
        Price((self.0 as f64 * factor).round() as i64)
    }

    /// Cash for `quantity` shares at this price, saturating on overflow.
    #[inline]
    pub fn notional(self, quantity: Quantity) -> i64 {
        signed_quantity(quantity).saturating_mul(self.0)
    }

    /// True if the price can be divided by (strictly positive).
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / 100;
        let cents = (self.0 % 100).abs();
        if self.0 < 0 {
            write!(f, "-${}.{:02}", dollars.abs(), cents)
        } else {
            write!(f, "${}.{:02}", dollars, cents)
        }
    }
}

/// Quantity of shares. Always non-negative.
pub type Quantity = u64;

/// Shares as a signed count, saturating at `i64::MAX`.
#[inline]
pub fn signed_quantity(quantity: Quantity) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}

/// Round a dollar amount to integer cents. Non-finite input maps to 0.
pub fn dollars_to_cents(dollars: f64) -> i64 {
    if !dollars.is_finite() {
        return 0;
    }
    (dollars * 100.0).round() as i64
}

/// Cents to dollars as a float.
#[inline]
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Format cents as dollars with thousands separators: `123456789` → `$1,234,567.89`.
pub fn fmt_cents(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let frac = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}.{frac:02}")
    } else {
        format!("${grouped}.{frac:02}")
    }
}
