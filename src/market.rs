//! Market snapshot and the caching wrapper around market data sources.
//!
//! Sources can fail; the engine never sees that as a crash. [`CachedMarketData`]
//! hands back, in order of preference, a fresh cached snapshot, a live one,
//! the last good one, or a hardcoded fallback, and tells the caller which.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::types::Price;

/// FX rate used when nothing better is known (KRW per USD).
pub const FALLBACK_FX_RATE: f64 = 1450.0;

/// Default cache lifetime for fetched snapshots.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Market inputs for one cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketSnapshot {
    /// Last price of the traded instrument. Zero means unknown.
    pub price: Price,
    /// Quote currency per account currency (e.g. KRW per USD).
    pub fx_rate: f64,
    /// Percent below the reference index's trailing high (<= 0).
    pub drawdown_pct: f64,
    /// Fear/greed style index in [0, 100]; lower means more fear.
    pub sentiment_index: f64,
    pub is_uptrend: bool,
}

impl MarketSnapshot {
    /// Hardcoded snapshot used when no source has ever answered.
    ///
    /// The price is unknown (zero), so a plan built from it has empty ladders.
    pub fn fallback() -> Self {
        Self {
            price: Price::ZERO,
            fx_rate: FALLBACK_FX_RATE,
            drawdown_pct: 0.0,
            sentiment_index: 50.0,
            is_uptrend: true,
        }
    }

    /// Copy with every field forced into its documented range.
    ///
    /// Positive drawdowns become 0, sentiment is clamped to [0, 100], and
    /// non-finite numbers are replaced by the fallback values.
    pub fn normalized(&self) -> Self {
        let fallback = Self::fallback();
        let drawdown_pct = if self.drawdown_pct.is_finite() {
            self.drawdown_pct.min(0.0)
        } else {
            fallback.drawdown_pct
        };
        let sentiment_index = if self.sentiment_index.is_finite() {
            self.sentiment_index.clamp(0.0, 100.0)
        } else {
            fallback.sentiment_index
        };
        let fx_rate = if self.fx_rate.is_finite() && self.fx_rate > 0.0 {
            self.fx_rate
        } else {
            fallback.fx_rate
        };
        Self {
            price: Price(self.price.0.max(0)),
            fx_rate,
            drawdown_pct,
            sentiment_index,
            is_uptrend: self.is_uptrend,
        }
    }
}

impl Default for MarketSnapshot {
    fn default() -> Self {
        Self::fallback()
    }
}

/// A market data source failed to produce a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("market data unavailable: {0}")]
pub struct DataUnavailable(pub String);

/// Anything that can produce a market snapshot.
pub trait MarketDataSource {
    fn fetch(&self) -> Result<MarketSnapshot, DataUnavailable>;
}

impl<S: MarketDataSource + ?Sized> MarketDataSource for Box<S> {
    fn fetch(&self) -> Result<MarketSnapshot, DataUnavailable> {
        (**self).fetch()
    }
}

/// Where a snapshot handed out by [`CachedMarketData`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SnapshotOrigin {
    /// Fetched from the source just now.
    Live,
    /// Served from cache within the TTL.
    Cached,
    /// Source failed; last good snapshot reused past its TTL.
    Stale,
    /// Source failed and nothing was cached; hardcoded defaults.
    Fallback,
}

impl SnapshotOrigin {
    /// True if the snapshot reflects a successful fetch within the TTL.
    pub fn is_fresh(self) -> bool {
        matches!(self, SnapshotOrigin::Live | SnapshotOrigin::Cached)
    }
}

impl fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotOrigin::Live => write!(f, "live"),
            SnapshotOrigin::Cached => write!(f, "cached"),
            SnapshotOrigin::Stale => write!(f, "stale"),
            SnapshotOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// Result of [`CachedMarketData::fetch`]: always a snapshot, plus provenance.
#[derive(Clone, Debug)]
pub struct Fetched {
    pub snapshot: MarketSnapshot,
    pub origin: SnapshotOrigin,
    /// The source error, when the snapshot is stale or a fallback.
    pub error: Option<DataUnavailable>,
}

/// TTL cache with last-known-good and fallback substitution.
pub struct CachedMarketData<S> {
    source: S,
    ttl: Duration,
    fallback: MarketSnapshot,
    last_good: Option<(Instant, MarketSnapshot)>,
}

impl<S: MarketDataSource> CachedMarketData<S> {
    /// Wrap a source with the default 5-minute TTL and hardcoded fallback.
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            fallback: MarketSnapshot::fallback(),
            last_good: None,
        }
    }

    /// Replace the snapshot returned when nothing has ever been fetched.
    pub fn with_fallback(mut self, fallback: MarketSnapshot) -> Self {
        self.fallback = fallback.normalized();
        self
    }

    /// Seed the last-known-good snapshot (e.g. restored from disk).
    pub fn seed(&mut self, snapshot: MarketSnapshot, fetched_at: Instant) {
        self.last_good = Some((fetched_at, snapshot.normalized()));
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch, using the current time.
    pub fn fetch(&mut self) -> Fetched {
        self.fetch_at(Instant::now())
    }

    /// Fetch as if the current time were `now`.
    pub fn fetch_at(&mut self, now: Instant) -> Fetched {
        if let Some((at, snapshot)) = &self.last_good {
            if now.saturating_duration_since(*at) < self.ttl {
                debug!("market snapshot served from cache");
                return Fetched {
                    snapshot: snapshot.clone(),
                    origin: SnapshotOrigin::Cached,
                    error: None,
                };
            }
        }

        match self.source.fetch() {
            Ok(snapshot) => {
                let snapshot = snapshot.normalized();
                self.last_good = Some((now, snapshot.clone()));
                Fetched {
                    snapshot,
                    origin: SnapshotOrigin::Live,
                    error: None,
                }
            }
            Err(e) => match &self.last_good {
                Some((_, snapshot)) => {
                    warn!("{e}; reusing last good snapshot");
                    Fetched {
                        snapshot: snapshot.clone(),
                        origin: SnapshotOrigin::Stale,
                        error: Some(e),
                    }
                }
                None => {
                    warn!("{e}; using fallback snapshot");
                    Fetched {
                        snapshot: self.fallback.clone(),
                        origin: SnapshotOrigin::Fallback,
                        error: Some(e),
                    }
                }
            },
        }
    }
}
