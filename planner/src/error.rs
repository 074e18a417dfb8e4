//! Error types for the planner.

use std::path::PathBuf;

/// All errors that can occur while planning or recording a cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid engine parameters: {0}")]
    Engine(#[from] vrbook::ConfigError),

    #[error("ledger error at {path}: {source}")]
    Ledger {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ledger CSV error: {0}")]
    LedgerCsv(#[from] csv::Error),

    #[error("market data error: {0}")]
    Market(String),

    #[error("notifier error: {0}")]
    Notify(String),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    /// True for ledger read/write failures, which the plan path reports as warnings.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Ledger { .. } | Error::LedgerCsv(_))
    }

    /// True for errors that must stop cycle computation.
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::ConfigRead { .. } | Error::ConfigParse(_) | Error::Engine(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
