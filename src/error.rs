//! Configuration errors: the only failures that stop a cycle.

/// Invalid engine parameters. Any of these blocks cycle computation.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigError {
    /// Growth divisor must be at least 1.
    #[error("growth divisor must be >= 1, got {0}")]
    GrowthDivisor(i64),
    /// Band width must be a finite fraction in (0, 1).
    #[error("band width must be in (0, 1), got {0}")]
    BandWidth(f64),
    /// Pool cap ratio must be a finite fraction in (0, 1].
    #[error("pool cap ratio must be in (0, 1], got {0}")]
    PoolCapRatio(f64),
    /// Initial invest ratio must be a finite fraction in (0, 1].
    #[error("initial invest ratio must be in (0, 1], got {0}")]
    InvestRatio(f64),
    /// Ladder needs at least one rung.
    #[error("ladder step count must be >= 1")]
    StepCount,
    /// Ladder step must be a finite fraction in (0, 1).
    #[error("ladder step must be in (0, 1), got {0}")]
    StepPct(f64),
}
