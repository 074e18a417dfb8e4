//! Append-only cycle ledger.
//!
//! One row per saved cycle, in a CSV that is also meant to be edited by hand
//! (or exported from a spreadsheet). Reading is permissive: separators,
//! currency signs and blanks are handled here and the engine only sees typed
//! values.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ByteRecord, StringRecord};
use log::debug;
use serde::Serialize;
use vrbook::{cents_to_dollars, dollars_to_cents, CycleMode, CyclePlan, Price, Quantity};

use crate::error::{Error, Result};

/// Column order of the ledger file.
pub const HEADER: [&str; 7] = ["Date", "Qty", "Pool", "V_old", "Principal", "Price", "Band"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One saved cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleRecord {
    pub date: NaiveDate,
    pub quantity: Quantity,
    pub pool_cents: i64,
    /// V as computed for this cycle; the next cycle grows from it.
    pub target_value_cents: i64,
    pub principal_cents: i64,
    pub price: Price,
    /// Band half-width in whole percent.
    pub band_pct: u32,
}

impl CycleRecord {
    /// The row to save for a planned cycle.
    pub fn from_plan(plan: &CyclePlan, date: NaiveDate) -> Self {
        Self {
            date,
            quantity: plan.account.quantity,
            pool_cents: plan.account.pool_cents,
            target_value_cents: plan.account.target_value_cents,
            principal_cents: plan.account.principal_cents,
            price: plan.snapshot.price,
            band_pct: (plan.account.band_width * 100.0).round().max(0.0) as u32,
        }
    }

    /// Seed for the next cycle.
    ///
    /// `base_pool_cents` overrides the recorded pool (the account's actual
    /// cash may have moved since); the deposit is added on top.
    pub fn seed(&self, base_pool_cents: Option<i64>, deposit_cents: i64) -> CycleMode {
        CycleMode::Update {
            prev_target_cents: self.target_value_cents,
            prev_principal_cents: self.principal_cents,
            base_pool_cents: base_pool_cents.unwrap_or(self.pool_cents),
            deposit_cents,
        }
    }

    /// Position value at the recorded price.
    pub fn position_value_cents(&self) -> i64 {
        self.price.notional(self.quantity)
    }

    fn to_row(&self) -> [String; 7] {
        [
            self.date.format(DATE_FORMAT).to_string(),
            self.quantity.to_string(),
            money(self.pool_cents),
            money(self.target_value_cents),
            money(self.principal_cents),
            money(self.price.0),
            self.band_pct.to_string(),
        ]
    }
}

fn money(cents: i64) -> String {
    format!("{:.2}", cents_to_dollars(cents))
}

/// Parse a hand-entered number: `"5,000.00"`, `"$1,234"`, `" 12 "`.
///
/// Thousands separators, currency signs and whitespace are stripped. Anything
/// still unparseable (or non-finite) is `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '_') && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Decode a raw row field by field; invalid UTF-8 only spoils its own field.
fn lossy(record: &ByteRecord) -> StringRecord {
    record.iter().map(String::from_utf8_lossy).collect()
}

/// The date used when a row's date cannot be read: 1970-01-01.
pub fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

/// Map a CSV record onto a [`CycleRecord`] by header name.
///
/// Missing columns and malformed values become zero; a bad date becomes
/// [`epoch_date`].
pub fn parse_ledger_row(headers: &StringRecord, record: &StringRecord) -> CycleRecord {
    let field = |name: &str| -> &str {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .and_then(|i| record.get(i))
            .unwrap_or("")
    };

    let date = NaiveDate::parse_from_str(field("Date").trim(), DATE_FORMAT)
        .unwrap_or_else(|_| epoch_date());

    CycleRecord {
        date,
        quantity: parse_amount(field("Qty")).max(0.0).floor() as Quantity,
        pool_cents: dollars_to_cents(parse_amount(field("Pool"))),
        target_value_cents: dollars_to_cents(parse_amount(field("V_old"))),
        principal_cents: dollars_to_cents(parse_amount(field("Principal"))),
        price: Price::from_dollars(parse_amount(field("Price"))),
        band_pct: parse_amount(field("Band")).max(0.0).round() as u32,
    }
}

/// Persistent store of cycle records.
pub trait Ledger {
    /// All records, oldest first.
    fn read_all(&self) -> Result<Vec<CycleRecord>>;

    /// The most recent record, if any.
    fn read_last(&self) -> Result<Option<CycleRecord>> {
        Ok(self.read_all()?.pop())
    }

    /// Append one record. Existing rows are never rewritten.
    fn append(&mut self, record: &CycleRecord) -> Result<()>;
}

/// Ledger backed by a CSV file.
#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Ledger {
            path: self.path.clone(),
            source,
        }
    }

    fn is_empty_or_missing(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| m.is_file() && m.len() == 0)
            .unwrap_or(true)
    }
}

impl Ledger for CsvLedger {
    fn read_all(&self) -> Result<Vec<CycleRecord>> {
        if self.is_empty_or_missing() {
            debug!("ledger {} is empty", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let headers = lossy(reader.byte_headers()?);

        let mut records = Vec::new();
        for row in reader.byte_records() {
            let row = lossy(&row?);
            if row.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            records.push(parse_ledger_row(&headers, &row));
        }
        Ok(records)
    }

    fn append(&mut self, record: &CycleRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let write_header = self.is_empty_or_missing();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record(record.to_row())?;
        writer.flush().map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// In-memory ledger for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: Vec<CycleRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CycleRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CycleRecord] {
        &self.records
    }
}

impl Ledger for MemoryLedger {
    fn read_all(&self) -> Result<Vec<CycleRecord>> {
        Ok(self.records.clone())
    }

    fn read_last(&self) -> Result<Option<CycleRecord>> {
        Ok(self.records.last().cloned())
    }

    fn append(&mut self, record: &CycleRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
