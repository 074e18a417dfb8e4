//! Yahoo Finance market source.
//!
//! Uses the v8 chart API: last close of the traded ticker, last close of the
//! FX ticker, and one year of the reference index for drawdown and trend.
//! Yahoo has no official API; when it fails the cache falls back.

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use vrbook::{DataUnavailable, MarketDataSource, MarketSnapshot, Price};

use super::{drawdown_pct, is_uptrend};
use crate::config::MarketConfig;

const BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

/// Live snapshot from Yahoo Finance.
pub struct YahooSource {
    client: Client,
    base_url: String,
    ticker: String,
    fx_ticker: String,
    reference_ticker: String,
    fallback_fx_rate: f64,
    sentiment_index: f64,
}

impl YahooSource {
    pub fn new(config: &MarketConfig) -> Result<Self, DataUnavailable> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            ticker: config.ticker.clone(),
            fx_ticker: config.fx_ticker.clone(),
            reference_ticker: config.reference_ticker.clone(),
            fallback_fx_rate: config.fallback_fx_rate,
            sentiment_index: config.sentiment_index,
        })
    }

    /// Point at a different host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn closes(&self, symbol: &str, range: &str) -> Result<Vec<f64>, DataUnavailable> {
        let url = format!(
            "{}/v8/finance/chart/{symbol}?range={range}&interval=1d",
            self.base_url
        );
        debug!("GET {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataUnavailable(format!("{symbol}: {e}")))?;
        if !resp.status().is_success() {
            return Err(DataUnavailable(format!("{symbol}: HTTP {}", resp.status())));
        }
        let chart: ChartResponse = resp
            .json()
            .map_err(|e| DataUnavailable(format!("{symbol}: unexpected response: {e}")))?;
        parse_closes(symbol, chart)
    }
}

fn parse_closes(symbol: &str, resp: ChartResponse) -> Result<Vec<f64>, DataUnavailable> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) => DataUnavailable(format!("{symbol}: {}: {}", err.code, err.description)),
        None => DataUnavailable(format!("{symbol}: empty result")),
    })?;

    let closes: Vec<f64> = result
        .into_iter()
        .next()
        .and_then(|d| d.indicators.quote.into_iter().next())
        .map(|q| q.close.into_iter().flatten().filter(|c| c.is_finite()).collect())
        .unwrap_or_default();

    if closes.is_empty() {
        return Err(DataUnavailable(format!("{symbol}: no closes")));
    }
    Ok(closes)
}

impl MarketDataSource for YahooSource {
    fn fetch(&self) -> Result<MarketSnapshot, DataUnavailable> {
        let price = self
            .closes(&self.ticker, "5d")?
            .last()
            .copied()
            .unwrap_or_default();

        let fx_rate = match self.closes(&self.fx_ticker, "5d") {
            Ok(c) => c.last().copied().unwrap_or(self.fallback_fx_rate),
            Err(e) => {
                warn!("{e}; using fallback FX rate {}", self.fallback_fx_rate);
                self.fallback_fx_rate
            }
        };

        let (drawdown, uptrend) = match self.closes(&self.reference_ticker, "1y") {
            Ok(c) => (drawdown_pct(&c), is_uptrend(&c)),
            Err(e) => {
                warn!("{e}; assuming no drawdown");
                (0.0, true)
            }
        };

        Ok(MarketSnapshot {
            price: Price::from_dollars(price),
            fx_rate,
            drawdown_pct: drawdown,
            sentiment_index: self.sentiment_index,
            is_uptrend: uptrend,
        })
    }
}
