//! Market data sources for the planner.
//!
//! Every source implements [`vrbook::MarketDataSource`] and reports failure as
//! [`DataUnavailable`]; the session wraps the chosen source in
//! [`vrbook::CachedMarketData`] so a failure never stops a plan.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use vrbook::{DataUnavailable, MarketDataSource, MarketSnapshot, Price};

use crate::config::{MarketConfig, MarketSourceKind};
use crate::error::{Error, Result};

#[cfg(feature = "yahoo")]
mod yahoo;
#[cfg(feature = "yahoo")]
pub use yahoo::YahooSource;

/// Snapshot file layout. Price is in dollars.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    price: f64,
    #[serde(default = "default_fx")]
    fx_rate: f64,
    #[serde(default)]
    drawdown_pct: f64,
    #[serde(default = "default_sentiment")]
    sentiment_index: f64,
    #[serde(default = "default_uptrend")]
    is_uptrend: bool,
}

fn default_fx() -> f64 {
    vrbook::market::FALLBACK_FX_RATE
}
fn default_sentiment() -> f64 {
    50.0
}
fn default_uptrend() -> bool {
    true
}

/// Reads a snapshot from a JSON file, re-read on every fetch.
///
/// ```json
/// {"price": 50.0, "fx_rate": 1450.0, "drawdown_pct": -5.0, "sentiment_index": 40.0, "is_uptrend": true}
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarketDataSource for JsonFileSource {
    fn fetch(&self) -> std::result::Result<MarketSnapshot, DataUnavailable> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| DataUnavailable(format!("{}: {e}", self.path.display())))?;
        let file: SnapshotFile = serde_json::from_str(&text)
            .map_err(|e| DataUnavailable(format!("{}: {e}", self.path.display())))?;
        Ok(MarketSnapshot {
            price: Price::from_dollars(file.price),
            fx_rate: file.fx_rate,
            drawdown_pct: file.drawdown_pct,
            sentiment_index: file.sentiment_index,
            is_uptrend: file.is_uptrend,
        })
    }
}

/// Always returns the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticSource {
    snapshot: MarketSnapshot,
}

impl StaticSource {
    pub fn new(snapshot: MarketSnapshot) -> Self {
        Self { snapshot }
    }
}

impl MarketDataSource for StaticSource {
    fn fetch(&self) -> std::result::Result<MarketSnapshot, DataUnavailable> {
        Ok(self.snapshot.clone())
    }
}

/// Per-field overrides from the command line, applied after fetching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// Price in dollars.
    pub price: Option<f64>,
    pub fx_rate: Option<f64>,
    pub drawdown_pct: Option<f64>,
    pub sentiment_index: Option<f64>,
    pub is_uptrend: Option<bool>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, snapshot: &MarketSnapshot) -> MarketSnapshot {
        MarketSnapshot {
            price: self.price.map(Price::from_dollars).unwrap_or(snapshot.price),
            fx_rate: self.fx_rate.unwrap_or(snapshot.fx_rate),
            drawdown_pct: self.drawdown_pct.unwrap_or(snapshot.drawdown_pct),
            sentiment_index: self.sentiment_index.unwrap_or(snapshot.sentiment_index),
            is_uptrend: self.is_uptrend.unwrap_or(snapshot.is_uptrend),
        }
    }
}

/// Percent below the series high at the last close (0 at a new high).
pub fn drawdown_pct(closes: &[f64]) -> f64 {
    let valid = closes.iter().copied().filter(|c| c.is_finite() && *c > 0.0);
    let high = valid.clone().fold(f64::NAN, f64::max);
    match valid.last() {
        Some(last) if high > 0.0 => (last / high - 1.0) * 100.0,
        _ => 0.0,
    }
}

/// Last close above its 200-day simple moving average.
///
/// Closes that are not finite and positive are skipped, as in [`drawdown_pct`].
/// With fewer than 200 closes the average of the whole series is used. An
/// empty series counts as an uptrend.
pub fn is_uptrend(closes: &[f64]) -> bool {
    const WINDOW: usize = 200;
    let valid: Vec<f64> = closes
        .iter()
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect();
    let Some(&last) = valid.last() else {
        return true;
    };
    let window = &valid[valid.len().saturating_sub(WINDOW)..];
    let sma = window.iter().sum::<f64>() / window.len() as f64;
    last > sma
}

/// Build the configured source.
pub fn build(config: &MarketConfig) -> Result<Box<dyn MarketDataSource>> {
    match config.source {
        MarketSourceKind::File => Ok(Box::new(JsonFileSource::new(&config.snapshot_file))),
        MarketSourceKind::Static => Ok(Box::new(StaticSource::new(config.static_snapshot()))),
        MarketSourceKind::Yahoo => build_yahoo(config),
    }
}

#[cfg(feature = "yahoo")]
fn build_yahoo(config: &MarketConfig) -> Result<Box<dyn MarketDataSource>> {
    let source = YahooSource::new(config).map_err(|e| Error::Market(e.to_string()))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "yahoo"))]
fn build_yahoo(_config: &MarketConfig) -> Result<Box<dyn MarketDataSource>> {
    Err(Error::Market(
        "source \"yahoo\" requires building with the `yahoo` feature".into(),
    ))
}
