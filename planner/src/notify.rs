//! Operator notifications.
//!
//! Delivery is best effort: a failed notification is logged and audited but
//! never fails the cycle.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use log::{info, warn};
use vrbook::{fmt_cents, CyclePlan};

use crate::audit::{self, AuditLog};
use crate::config::{NotifyConfig, NotifyKind};
use crate::error::{Error, Result};

/// A notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// A channel that can deliver a text message.
pub trait Notifier {
    /// Short channel name for logs and the audit trail.
    fn name(&self) -> &str;

    fn send(&self, text: &str) -> std::result::Result<(), NotifyError>;
}

/// Writes the message to the log at `info`.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, text: &str) -> std::result::Result<(), NotifyError> {
        info!("{text}");
        Ok(())
    }
}

/// Appends timestamped messages to a file.
pub struct FileNotifier {
    path: PathBuf,
}

impl FileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Notifier for FileNotifier {
    fn name(&self) -> &str {
        "file"
    }

    fn send(&self, text: &str) -> std::result::Result<(), NotifyError> {
        let fail = |e: std::io::Error| NotifyError(format!("{}: {e}", self.path.display()));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(fail)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(fail)?;
        writeln!(file, "[{}]\n{text}\n", Local::now().format("%Y-%m-%d %H:%M:%S")).map_err(fail)
    }
}

/// Sends messages through a Telegram bot.
#[cfg(feature = "telegram")]
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

#[cfg(feature = "telegram")]
impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[cfg(feature = "telegram")]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    fn send(&self, text: &str) -> std::result::Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .map_err(|e| NotifyError(format!("telegram request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(NotifyError(format!("telegram returned {status}: {body}")));
        }
        Ok(())
    }
}

/// Build the configured notifier; `None` when notifications are off.
pub fn build(config: &NotifyConfig) -> Result<Option<Box<dyn Notifier>>> {
    match config.kind {
        NotifyKind::None => Ok(None),
        NotifyKind::Log => Ok(Some(Box::new(LogNotifier))),
        NotifyKind::File => Ok(Some(Box::new(FileNotifier::new(&config.file)))),
        NotifyKind::Telegram => build_telegram(config),
    }
}

#[cfg(feature = "telegram")]
fn build_telegram(config: &NotifyConfig) -> Result<Option<Box<dyn Notifier>>> {
    if config.telegram_token.is_empty() || config.telegram_chat_id.is_empty() {
        return Err(Error::Notify(
            "telegram needs telegram_token and telegram_chat_id".into(),
        ));
    }
    Ok(Some(Box::new(TelegramNotifier::new(
        &config.telegram_token,
        &config.telegram_chat_id,
    ))))
}

#[cfg(not(feature = "telegram"))]
fn build_telegram(_config: &NotifyConfig) -> Result<Option<Box<dyn Notifier>>> {
    Err(Error::Notify(
        "kind \"telegram\" requires building with the `telegram` feature".into(),
    ))
}

/// Send, logging and auditing any failure. Returns whether it was delivered.
pub fn send_best_effort(notifier: &dyn Notifier, text: &str, audit: Option<&mut AuditLog>) -> bool {
    match notifier.send(text) {
        Ok(()) => true,
        Err(e) => {
            warn!("{} notifier: {e}", notifier.name());
            if let Some(audit) = audit {
                if let Err(audit_err) = audit::log_notification_failed(audit, notifier.name(), &e.0)
                {
                    warn!("failed to audit notification failure: {audit_err}");
                }
            }
            false
        }
    }
}

/// Compact plain-text summary of a plan for chat channels.
pub fn format_plan_message(plan: &CyclePlan, ticker: &str) -> String {
    let mut lines = vec![
        format!("[VR] {ticker} @ {}", plan.snapshot.price),
        format!(
            "Regime: {} (quota {:.0}%)",
            plan.quota.regime,
            plan.quota.quota_fraction * 100.0
        ),
        format!(
            "V: {}  band {} ~ {}",
            fmt_cents(plan.account.target_value_cents),
            fmt_cents(plan.band.lower_cents),
            fmt_cents(plan.band.upper_cents)
        ),
        format!(
            "Position: {} ({})  pool {}",
            fmt_cents(plan.position_value_cents),
            plan.band_position,
            fmt_cents(plan.account.pool_cents)
        ),
    ];

    match plan.buy.rungs().first() {
        Some(r) => lines.push(format!(
            "Buy: {} rungs from {} ({} shares first)",
            plan.buy.len(),
            r.price,
            r.quantity
        )),
        None => lines.push("Buy: none".to_string()),
    }
    match plan.sell.rungs().first() {
        Some(r) => lines.push(format!(
            "Sell: {} rungs from {} ({} shares first)",
            plan.sell.len(),
            r.price,
            r.quantity
        )),
        None => lines.push("Sell: none".to_string()),
    }
    for w in &plan.warnings {
        lines.push(format!("! {w}"));
    }
    lines.join("\n")
}
