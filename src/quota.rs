//! Safety quota: how much of the pool a cycle may deploy, given the market regime.
//!
//! | drawdown          | sentiment | allowed | quota | regime             |
//! |-------------------|-----------|---------|-------|--------------------|
//! | > -10%            | any       | yes     | 1.00  | normal             |
//! | (-20%, -10%]      | <= 15     | yes     | 0.50  | correction         |
//! | (-20%, -10%]      | > 15      | no      | 0.00  | correction-blocked |
//! | <= -20%           | <= 10     | yes     | 0.30  | crash              |
//! | <= -20%           | > 10      | no      | 0.00  | crash-blocked      |
//!
//! Deeper drawdowns demand more fear before new capital goes in.

use std::fmt;

/// Drawdown at or below which the market is in correction.
pub const CORRECTION_DRAWDOWN_PCT: f64 = -10.0;
/// Drawdown at or below which the market is in a crash.
pub const CRASH_DRAWDOWN_PCT: f64 = -20.0;
/// Highest sentiment that still unlocks buying in a correction.
pub const CORRECTION_MAX_SENTIMENT: f64 = 15.0;
/// Highest sentiment that still unlocks buying in a crash.
pub const CRASH_MAX_SENTIMENT: f64 = 10.0;

/// Market regime as seen by the quota table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Regime {
    Normal,
    Correction,
    CorrectionBlocked,
    Crash,
    CrashBlocked,
}

impl Regime {
    /// Operator-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Regime::Normal => "normal",
            Regime::Correction => "correction",
            Regime::CorrectionBlocked => "correction-blocked",
            Regime::Crash => "crash",
            Regime::CrashBlocked => "crash-blocked",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of [`evaluate`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Fraction of the capped pool deployable this cycle, in [0, 1].
    pub quota_fraction: f64,
    pub regime: Regime,
}

impl QuotaDecision {
    /// Why buying is blocked, if it is.
    pub fn blocking_reason(&self) -> Option<String> {
        match self.regime {
            Regime::CorrectionBlocked => Some(format!(
                "buying blocked: correction regime needs sentiment <= {CORRECTION_MAX_SENTIMENT}"
            )),
            Regime::CrashBlocked => Some(format!(
                "buying blocked: crash regime needs sentiment <= {CRASH_MAX_SENTIMENT}"
            )),
            _ => None,
        }
    }
}

/// Apply the quota table, first match wins.
///
/// Pure function. NaN drawdown is treated as 0 and NaN sentiment as neutral (50).
pub fn evaluate(drawdown_pct: f64, sentiment_index: f64) -> QuotaDecision {
    let dd = if drawdown_pct.is_nan() { 0.0 } else { drawdown_pct };
    let sentiment = if sentiment_index.is_nan() {
        50.0
    } else {
        sentiment_index
    };

    let (allowed, quota_fraction, regime) = if dd > CORRECTION_DRAWDOWN_PCT {
        (true, 1.0, Regime::Normal)
    } else if dd > CRASH_DRAWDOWN_PCT {
        if sentiment <= CORRECTION_MAX_SENTIMENT {
            (true, 0.5, Regime::Correction)
        } else {
            (false, 0.0, Regime::CorrectionBlocked)
        }
    } else if sentiment <= CRASH_MAX_SENTIMENT {
        (true, 0.3, Regime::Crash)
    } else {
        (false, 0.0, Regime::CrashBlocked)
    };

    QuotaDecision {
        allowed,
        quota_fraction,
        regime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_ignores_sentiment() {
        for s in [0.0, 50.0, 100.0] {
            let d = evaluate(-9.99, s);
            assert!(d.allowed);
            assert_eq!(d.quota_fraction, 1.0);
            assert_eq!(d.regime, Regime::Normal);
        }
        assert_eq!(evaluate(0.0, 90.0).regime, Regime::Normal);
    }

    #[test]
    fn correction_boundaries() {
        // -10 exactly is a correction
        let d = evaluate(-10.0, 15.0);
        assert_eq!(d.regime, Regime::Correction);
        assert_eq!(d.quota_fraction, 0.5);

        let d = evaluate(-10.0, 15.01);
        assert_eq!(d.regime, Regime::CorrectionBlocked);
        assert!(!d.allowed);
        assert_eq!(d.quota_fraction, 0.0);

        assert_eq!(evaluate(-19.99, 5.0).regime, Regime::Correction);
    }

    #[test]
    fn crash_boundaries() {
        let d = evaluate(-20.0, 10.0);
        assert_eq!(d.regime, Regime::Crash);
        assert!(d.allowed);
        assert_eq!(d.quota_fraction, 0.3);

        let d = evaluate(-45.0, 11.0);
        assert_eq!(d.regime, Regime::CrashBlocked);
        assert!(!d.allowed);
    }

    #[test]
    fn crash_with_extreme_fear() {
        let d = evaluate(-25.0, 5.0);
        assert_eq!(
            d,
            QuotaDecision {
                allowed: true,
                quota_fraction: 0.30,
                regime: Regime::Crash,
            }
        );
        assert_eq!(d.regime.label(), "crash");
    }

    #[test]
    fn sentiment_that_unlocks_correction_may_not_unlock_crash() {
        assert!(evaluate(-15.0, 12.0).allowed);
        assert!(!evaluate(-25.0, 12.0).allowed);
    }

    #[test]
    fn blocking_reasons() {
        assert!(evaluate(0.0, 50.0).blocking_reason().is_none());
        assert!(evaluate(-25.0, 5.0).blocking_reason().is_none());
        let reason = evaluate(-12.0, 40.0).blocking_reason().unwrap();
        assert!(reason.contains("correction"));
        let reason = evaluate(-30.0, 40.0).blocking_reason().unwrap();
        assert!(reason.contains("crash"));
    }

    #[test]
    fn nan_inputs_are_neutral() {
        assert_eq!(evaluate(f64::NAN, 50.0).regime, Regime::Normal);
        assert_eq!(evaluate(-15.0, f64::NAN).regime, Regime::CorrectionBlocked);
    }

    #[test]
    fn labels() {
        assert_eq!(Regime::CorrectionBlocked.to_string(), "correction-blocked");
        assert_eq!(Regime::CrashBlocked.label(), "crash-blocked");
    }
}
