// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Integration tests for the planner: config file, CSV ledger, audit trail and
//! a full plan → save → plan round.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use vrbook::{DataUnavailable, MarketDataSource, MarketSnapshot, Price, SnapshotOrigin};
use vrbook_planner::audit::AuditLog;
use vrbook_planner::config::{Config, MarketSourceKind, NotifyKind, SellPolicyKind};
use vrbook_planner::error::Error;
use vrbook_planner::feed::StaticSource;
use vrbook_planner::ledger::{CsvLedger, Ledger, MemoryLedger};
use vrbook_planner::notify::{FileNotifier, Notifier, NotifyError};
use vrbook_planner::report;
use vrbook_planner::session::{CycleArgs, Session};

struct Offline;

impl MarketDataSource for Offline {
    fn fetch(&self) -> Result<MarketSnapshot, DataUnavailable> {
        Err(DataUnavailable("connection refused".into()))
    }
}

struct Unreachable;

impl Notifier for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn send(&self, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError("host down".into()))
    }
}

fn market(price: i64) -> MarketSnapshot {
    MarketSnapshot {
        price: Price(price),
        fx_rate: 1400.0,
        drawdown_pct: -4.0,
        sentiment_index: 45.0,
        is_uptrend: true,
    }
}

fn write_ledger(path: &Path) {
    fs::write(
        path,
        "Date,Qty,Pool,V_old,Principal,Price,Band\n\
         2026-01-05,100,\"2,000.00\",\"5,000.00\",\"7,000.00\",50.00,15\n",
    )
    .unwrap();
}

fn audit_events(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect()
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn config_file_round() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[account]
invest_style = "lump"
growth_divisor = 13
band_width_pct = 10

[ladder]
step_count = 8
sell_policy = "uniform"

[market]
source = "static"
price = 52.5
drawdown_pct = -12

[notify]
kind = "none"
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.account.growth_divisor, 13);
    assert_eq!(config.band_width(), 0.10);
    assert_eq!(config.ladder.step_count, 8);
    assert_eq!(config.ladder.sell_policy, SellPolicyKind::Uniform);
    assert_eq!(config.market.source, MarketSourceKind::Static);
    assert_eq!(config.market.static_snapshot().price, Price(52_50));
    assert_eq!(config.notify.kind, NotifyKind::None);
    // untouched sections keep their defaults
    assert_eq!(config.market.cache_ttl_secs, 300);
    assert_eq!(config.ledger.path, "./ledger.csv");
}

#[test]
fn missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.account.growth_divisor, 10);
}

#[test]
fn invalid_config_is_rejected() {
    let err = Config::from_toml_str("[account]\ngrowth_divisor = 0\n").unwrap_err();
    assert!(err.is_fatal_config());
}

// ============================================================================
// CSV ledger
// ============================================================================

#[test]
fn hand_written_ledger_plans() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.csv");
    write_ledger(&path);

    let mut session = Session::new(
        Config::default(),
        CsvLedger::new(&path),
        Box::new(StaticSource::new(market(50_00))),
    );
    let out = session.plan(&CycleArgs::default()).unwrap();
    assert_eq!(out.origin, SnapshotOrigin::Live);
    assert_eq!(out.plan.account.target_value_cents, 5_200_00);
    assert_eq!(out.plan.account.quantity, 100);
    assert!(!out.plan.buy.is_empty());
    assert!(!out.plan.sell.is_empty());
}

#[test]
fn save_then_plan_continues() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("ledger.csv");
    let audit_path = dir.path().join("audit.jsonl");

    let mut session = Session::new(
        Config::default(),
        CsvLedger::new(&path),
        Box::new(StaticSource::new(market(50_00))),
    )
    .with_audit(AuditLog::open(&audit_path).unwrap());

    let args = CycleArgs {
        initial_principal_cents: Some(10_000_00),
        ..CycleArgs::default()
    };
    let opening = session.plan(&args).unwrap();
    session
        .save(&opening, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
        .unwrap();

    let args = CycleArgs {
        deposit_cents: 250_00,
        ..CycleArgs::default()
    };
    let next = session.plan(&args).unwrap();
    // 5000 + 5250/10 + 250
    assert_eq!(next.plan.account.target_value_cents, 5_775_00);
    assert_eq!(next.plan.account.pool_cents, 5_250_00);
    session
        .save(&next, NaiveDate::from_ymd_opt(2026, 1, 19).unwrap())
        .unwrap();

    let history = session.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].principal_cents, 10_250_00);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Date,Qty,Pool,V_old,Principal,Price,Band\n"));
    assert_eq!(text.lines().count(), 3);

    drop(session);
    assert_eq!(
        audit_events(&audit_path),
        vec![
            "cycle_planned",
            "record_appended",
            "cycle_planned",
            "record_appended"
        ]
    );
}

#[test]
fn damaged_ledger_byte_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.csv");
    let mut bytes = b"Date,Qty,Pool,V_old,Principal,Price,Band\n\
        2026-01-05,100,2000.00,5000.00,7000.00,50.00,15\n\
        2026-01-19,100,2000.00,5200.00,7000.00,50.00,15"
        .to_vec();
    bytes.push(0xff);
    bytes.push(b'\n');
    fs::write(&path, bytes).unwrap();

    let mut session = Session::new(
        Config::default(),
        CsvLedger::new(&path),
        Box::new(StaticSource::new(market(50_00))),
    );
    let out = session.plan(&CycleArgs::default()).unwrap();
    assert!(!out.ledger_unreadable);
    assert!(out.notes.is_empty());
    // 5200 + 2000/10
    assert_eq!(out.plan.account.target_value_cents, 5_400_00);
    assert_eq!(out.plan.account.principal_cents, 7_000_00);

    let saved = session
        .save(&out, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap())
        .unwrap();
    assert_eq!(saved.target_value_cents, 5_400_00);
    assert_eq!(saved.quantity, 100);
}

#[test]
fn unreadable_ledger_blocks_save() {
    let dir = tempfile::tempdir().unwrap();
    // a directory where the ledger file should be
    let path = dir.path().join("ledger.csv");
    fs::create_dir(&path).unwrap();

    let mut session = Session::new(
        Config::default(),
        CsvLedger::new(&path),
        Box::new(StaticSource::new(market(50_00))),
    );
    let out = session.plan(&CycleArgs::default()).unwrap();
    assert!(out.notes[0].starts_with("ledger unreadable"));
    assert_eq!(out.plan.account.target_value_cents, 0);

    let err = session
        .save(&out, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Aborted(_)));
    assert!(path.is_dir());
}

// ============================================================================
// Degraded market data and notifications
// ============================================================================

#[test]
fn offline_market_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");

    let mut session = Session::new(
        Config::default(),
        MemoryLedger::new(),
        Box::new(Offline),
    )
    .with_audit(AuditLog::open(&audit_path).unwrap());

    let out = session.plan(&CycleArgs::default()).unwrap();
    assert_eq!(out.origin, SnapshotOrigin::Fallback);
    assert_eq!(out.plan.snapshot.fx_rate, 1450.0);
    assert!(out.plan.buy.is_empty());

    let text = report::render_summary(&out, "TQQQ");
    assert!(text.contains("WARNING: market data unavailable"));

    drop(session);
    assert_eq!(
        audit_events(&audit_path),
        vec!["market_fallback", "cycle_planned"]
    );
}

#[test]
fn failed_notification_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");

    let mut session = Session::new(
        Config::default(),
        MemoryLedger::new(),
        Box::new(StaticSource::new(market(50_00))),
    )
    .with_notifier(Box::new(Unreachable))
    .with_audit(AuditLog::open(&audit_path).unwrap());

    let out = session.plan(&CycleArgs::default()).unwrap();
    assert!(!session.notify(&out));

    drop(session);
    let events = audit_events(&audit_path);
    assert_eq!(events.last().map(String::as_str), Some("notification_failed"));
}

#[test]
fn file_notification_is_delivered() {
    let dir = tempfile::tempdir().unwrap();
    let notify_path = dir.path().join("notes").join("vr.log");

    let mut session = Session::new(
        Config::default(),
        MemoryLedger::new(),
        Box::new(StaticSource::new(market(61_25))),
    )
    .with_notifier(Box::new(FileNotifier::new(&notify_path)));

    let out = session.plan(&CycleArgs::default()).unwrap();
    assert!(session.notify(&out));

    let text = fs::read_to_string(&notify_path).unwrap();
    assert!(text.contains("[VR] TQQQ @ $61.25"));
}

// ============================================================================
// History rendering
// ============================================================================

#[test]
fn history_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.csv");
    write_ledger(&path);

    let records = CsvLedger::new(&path).read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pool_cents, 2_000_00);

    let text = report::render_history(&records);
    assert!(text.contains("2026-01-05"));
    assert!(text.contains("$5,000.00"));
    assert!(text.contains('*'));
}
