//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use vrbook::ladder::{DEFAULT_PYRAMID_WEIGHTS, DEFAULT_STEP_COUNT, DEFAULT_STEP_PCT};
use vrbook::market::FALLBACK_FX_RATE;
use vrbook::{
    CycleInput, CycleMode, InvestStyle, LadderParams, MarketSnapshot, Price, Quantity,
    SellLadderPolicy,
};

use crate::error::{Error, Result};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub ladder: LadderConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub invest_style: InvestStyle,
    #[serde(default = "default_growth_divisor")]
    pub growth_divisor: i64,
    /// Band half-width in percent (15 = ±15%).
    #[serde(default = "default_band_width_pct")]
    pub band_width_pct: f64,
    #[serde(default = "default_invest_ratio")]
    pub initial_invest_ratio: f64,
}

fn default_growth_divisor() -> i64 {
    10
}
fn default_band_width_pct() -> f64 {
    15.0
}
fn default_invest_ratio() -> f64 {
    vrbook::growth::DEFAULT_INVEST_RATIO
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            invest_style: InvestStyle::default(),
            growth_divisor: default_growth_divisor(),
            band_width_pct: default_band_width_pct(),
            initial_invest_ratio: default_invest_ratio(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellPolicyKind {
    #[default]
    Pyramid,
    Uniform,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LadderConfig {
    #[serde(default = "default_step_count")]
    pub step_count: usize,
    #[serde(default = "default_step_pct")]
    pub step_pct: f64,
    #[serde(default)]
    pub sell_policy: SellPolicyKind,
    #[serde(default = "default_pyramid_weights")]
    pub pyramid_weights: Vec<u32>,
}

fn default_step_count() -> usize {
    DEFAULT_STEP_COUNT
}
fn default_step_pct() -> f64 {
    DEFAULT_STEP_PCT
}
fn default_pyramid_weights() -> Vec<u32> {
    DEFAULT_PYRAMID_WEIGHTS.to_vec()
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            step_count: default_step_count(),
            step_pct: default_step_pct(),
            sell_policy: SellPolicyKind::default(),
            pyramid_weights: default_pyramid_weights(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSourceKind {
    #[default]
    File,
    Static,
    Yahoo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub source: MarketSourceKind,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    #[serde(default = "default_ticker")]
    pub ticker: String,
    #[serde(default = "default_fx_ticker")]
    pub fx_ticker: String,
    #[serde(default = "default_reference_ticker")]
    pub reference_ticker: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_fallback_fx")]
    pub fallback_fx_rate: f64,
    /// Manual sentiment reading, used when the source has none.
    #[serde(default = "default_sentiment")]
    pub sentiment_index: f64,
    /// Last price in dollars for the `static` source.
    #[serde(default)]
    pub price: f64,
    /// Drawdown for the `static` source.
    #[serde(default)]
    pub drawdown_pct: f64,
    /// Trend flag for the `static` source.
    #[serde(default = "default_true")]
    pub is_uptrend: bool,
}

fn default_snapshot_file() -> String {
    "./market.json".into()
}
fn default_ticker() -> String {
    "TQQQ".into()
}
fn default_fx_ticker() -> String {
    "KRW=X".into()
}
fn default_reference_ticker() -> String {
    "^NDX".into()
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_fallback_fx() -> f64 {
    FALLBACK_FX_RATE
}
fn default_sentiment() -> f64 {
    50.0
}
fn default_true() -> bool {
    true
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            source: MarketSourceKind::default(),
            snapshot_file: default_snapshot_file(),
            ticker: default_ticker(),
            fx_ticker: default_fx_ticker(),
            reference_ticker: default_reference_ticker(),
            cache_ttl_secs: default_cache_ttl(),
            fallback_fx_rate: default_fallback_fx(),
            sentiment_index: default_sentiment(),
            price: 0.0,
            drawdown_pct: 0.0,
            is_uptrend: default_true(),
        }
    }
}

impl MarketConfig {
    /// Snapshot served when every source has failed.
    pub fn fallback_snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            fx_rate: self.fallback_fx_rate,
            sentiment_index: self.sentiment_index,
            ..MarketSnapshot::fallback()
        }
    }

    /// Snapshot described by the `static` source fields.
    pub fn static_snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            price: Price::from_dollars(self.price),
            fx_rate: self.fallback_fx_rate,
            drawdown_pct: self.drawdown_pct,
            sentiment_index: self.sentiment_index,
            is_uptrend: self.is_uptrend,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

fn default_ledger_path() -> String {
    "./ledger.csv".into()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    #[default]
    Log,
    File,
    Telegram,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub kind: NotifyKind,
    #[serde(default = "default_notify_file")]
    pub file: String,
    #[serde(default)]
    pub telegram_token: String,
    #[serde(default)]
    pub telegram_chat_id: String,
}

fn default_notify_file() -> String {
    "./notifications.log".into()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            kind: NotifyKind::default(),
            file: default_notify_file(),
            telegram_token: String::new(),
            telegram_chat_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load config from a TOML file, or use defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("{} not found, using default config", path.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.account.growth_divisor < 1 {
            return Err(Error::Config("growth_divisor must be >= 1".into()));
        }
        let w = self.account.band_width_pct;
        if !w.is_finite() || w <= 0.0 || w >= 100.0 {
            return Err(Error::Config("band_width_pct must be in (0, 100)".into()));
        }
        let r = self.account.initial_invest_ratio;
        if !r.is_finite() || r <= 0.0 || r > 1.0 {
            return Err(Error::Config(
                "initial_invest_ratio must be in (0.0, 1.0]".into(),
            ));
        }
        if self.ladder.step_count == 0 {
            return Err(Error::Config("step_count must be >= 1".into()));
        }
        let s = self.ladder.step_pct;
        if !s.is_finite() || s <= 0.0 || s >= 1.0 {
            return Err(Error::Config("step_pct must be in (0.0, 1.0)".into()));
        }
        if self.ladder.sell_policy == SellPolicyKind::Pyramid
            && self.ladder.pyramid_weights.iter().all(|&w| w == 0)
        {
            return Err(Error::Config(
                "pyramid_weights must contain a positive weight".into(),
            ));
        }
        if self.market.cache_ttl_secs == 0 {
            return Err(Error::Config("cache_ttl_secs must be > 0".into()));
        }
        if !self.market.fallback_fx_rate.is_finite() || self.market.fallback_fx_rate <= 0.0 {
            return Err(Error::Config("fallback_fx_rate must be > 0".into()));
        }
        Ok(())
    }

    /// Band half-width as a fraction.
    pub fn band_width(&self) -> f64 {
        self.account.band_width_pct / 100.0
    }

    pub fn ladder_params(&self) -> LadderParams {
        LadderParams {
            step_count: self.ladder.step_count,
            step_pct: self.ladder.step_pct,
        }
    }

    pub fn sell_policy(&self) -> SellLadderPolicy {
        match self.ladder.sell_policy {
            SellPolicyKind::Pyramid => SellLadderPolicy::Pyramid(self.ladder.pyramid_weights.clone()),
            SellPolicyKind::Uniform => SellLadderPolicy::Uniform,
        }
    }

    /// Engine input for one cycle with this config's parameters.
    pub fn cycle_input(&self, mode: CycleMode, quantity: Quantity) -> CycleInput {
        CycleInput {
            mode,
            quantity,
            growth_divisor: self.account.growth_divisor,
            band_width: self.band_width(),
            pool_cap_ratio: self.account.invest_style.pool_cap_ratio(),
            ladder: self.ladder_params(),
            sell_policy: self.sell_policy(),
        }
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.ledger.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[account]
invest_style = "lump"
growth_divisor = 13
band_width_pct = 12
initial_invest_ratio = 0.6

[ladder]
step_count = 8
step_pct = 0.02
sell_policy = "pyramid"
pyramid_weights = [1, 2, 3]

[market]
source = "static"
ticker = "SOXL"
cache_ttl_secs = 120
fallback_fx_rate = 1380.0
sentiment_index = 22.0
price = 31.5
drawdown_pct = -12.5
is_uptrend = false

[ledger]
path = "./data/ledger.csv"

[notify]
kind = "file"
file = "./data/notify.log"

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
"#
    }

    #[test]
    fn parse_example_config() {
        let config = Config::from_toml_str(example_toml()).unwrap();
        assert_eq!(config.account.invest_style, InvestStyle::Lump);
        assert_eq!(config.account.growth_divisor, 13);
        assert_eq!(config.band_width(), 0.12);
        assert_eq!(config.ladder.step_count, 8);
        assert_eq!(config.market.source, MarketSourceKind::Static);
        assert_eq!(config.market.ticker, "SOXL");
        assert_eq!(config.notify.kind, NotifyKind::File);
        assert_eq!(
            config.sell_policy(),
            SellLadderPolicy::Pyramid(vec![1, 2, 3])
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.account.invest_style, InvestStyle::Accumulate);
        assert_eq!(config.account.growth_divisor, 10);
        assert_eq!(config.band_width(), 0.15);
        assert_eq!(config.ladder_params(), LadderParams::default());
        assert_eq!(config.sell_policy(), SellLadderPolicy::pyramid());
        assert_eq!(config.market.source, MarketSourceKind::File);
        assert_eq!(config.market.fx_ticker, "KRW=X");
        assert_eq!(config.market.cache_ttl_secs, 300);
        assert_eq!(config.notify.kind, NotifyKind::Log);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::from_toml_str("[account]\ngrowth_divisor = 20\n").unwrap();
        assert_eq!(config.account.growth_divisor, 20);
        assert_eq!(config.account.band_width_pct, 15.0);
    }

    #[test]
    fn validate_catches_bad_divisor() {
        let mut config = Config::default();
        config.account.growth_divisor = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_catches_bad_band() {
        let mut config = Config::default();
        config.account.band_width_pct = -5.0;
        assert!(config.validate().is_err());
        config.account.band_width_pct = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_ladder() {
        let mut config = Config::default();
        config.ladder.step_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ladder.step_pct = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ladder.pyramid_weights = vec![0, 0];
        assert!(config.validate().is_err());
        config.ladder.sell_policy = SellPolicyKind::Uniform;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_catches_bad_market() {
        let mut config = Config::default();
        config.market.cache_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.market.fallback_fx_rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_style_is_parse_error() {
        let err = Config::from_toml_str("[account]\ninvest_style = \"yolo\"\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn cycle_input_uses_style_cap() {
        let config = Config::from_toml_str(example_toml()).unwrap();
        let input = config.cycle_input(
            CycleMode::Initial {
                principal_cents: 1_000_00,
                invest_ratio: 0.6,
            },
            0,
        );
        assert_eq!(input.pool_cap_ratio, 0.50);
        assert_eq!(input.growth_divisor, 13);
        assert_eq!(input.ladder.step_count, 8);
    }

    #[test]
    fn static_and_fallback_snapshots() {
        let config = Config::from_toml_str(example_toml()).unwrap();
        let s = config.market.static_snapshot();
        assert_eq!(s.price, Price(31_50));
        assert_eq!(s.fx_rate, 1380.0);
        assert_eq!(s.drawdown_pct, -12.5);
        assert!(!s.is_uptrend);

        let f = config.market.fallback_snapshot();
        assert_eq!(f.price, Price::ZERO);
        assert_eq!(f.fx_rate, 1380.0);
        assert_eq!(f.sentiment_index, 22.0);
    }

    #[test]
    fn paths() {
        let config = Config::default();
        assert_eq!(config.audit_path(), PathBuf::from("./logs/audit.jsonl"));
        assert_eq!(config.ledger_path(), PathBuf::from("./ledger.csv"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/vr.toml")).unwrap();
        assert_eq!(config.account.growth_divisor, 10);
        assert!(matches!(
            Config::load(Path::new("/nonexistent/vr.toml")),
            Err(Error::ConfigRead { .. })
        ));
    }
}
