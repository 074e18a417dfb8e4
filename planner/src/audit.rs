//! JSONL audit trail logging.
//!
//! Each planner command appends events to an audit.jsonl file, one JSON
//! object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vrbook::{cents_to_dollars, CyclePlan, DataUnavailable, SnapshotOrigin};

use crate::error::Result;
use crate::ledger::CycleRecord;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Log a computed plan.
pub fn log_cycle_planned(
    audit: &mut AuditLog,
    plan: &CyclePlan,
    origin: SnapshotOrigin,
) -> Result<()> {
    audit.log(
        "cycle_planned",
        serde_json::json!({
            "price": plan.snapshot.price.to_dollars(),
            "market": origin.to_string(),
            "regime": plan.quota.regime.label(),
            "quota": plan.quota.quota_fraction,
            "target_value": cents_to_dollars(plan.account.target_value_cents),
            "pool": cents_to_dollars(plan.account.pool_cents),
            "qty": plan.account.quantity,
            "band": [
                cents_to_dollars(plan.band.lower_cents),
                cents_to_dollars(plan.band.upper_cents),
            ],
            "buy_rungs": plan.buy.len(),
            "sell_rungs": plan.sell.len(),
            "warnings": plan.warnings,
        }),
    )
}

/// Log a ledger append.
pub fn log_record_appended(audit: &mut AuditLog, record: &CycleRecord) -> Result<()> {
    let data = serde_json::to_value(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log("record_appended", data)
}

/// Log a notification that could not be delivered.
pub fn log_notification_failed(audit: &mut AuditLog, channel: &str, error: &str) -> Result<()> {
    audit.log(
        "notification_failed",
        serde_json::json!({
            "channel": channel,
            "error": error,
        }),
    )
}

/// Log a plan built on stale or fallback market data.
pub fn log_market_fallback(
    audit: &mut AuditLog,
    origin: SnapshotOrigin,
    error: Option<&DataUnavailable>,
) -> Result<()> {
    audit.log(
        "market_fallback",
        serde_json::json!({
            "origin": origin.to_string(),
            "error": error.map(|e| e.0.clone()),
        }),
    )
}
