//! Cycle orchestration: ledger → market → engine → audit → ledger.
//!
//! A [`Session`] owns everything one planner command touches. Planning never
//! fails on missing data: an unreadable ledger, a dead market source or a
//! broken audit file all degrade to warnings. Only invalid parameters stop it.

use std::time::Duration;

use chrono::NaiveDate;
use log::{info, warn};
use vrbook::{
    plan_cycle, CachedMarketData, CycleMode, CyclePlan, MarketDataSource, Quantity, SnapshotOrigin,
};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{self, Overrides};
use crate::ledger::{CsvLedger, CycleRecord, Ledger};
use crate::notify::{self, Notifier};
use crate::report;

/// Operator inputs for one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleArgs {
    /// Cash added this cycle, in cents.
    pub deposit_cents: i64,
    /// Actual pool before the deposit; defaults to the last recorded pool.
    pub pool_cents: Option<i64>,
    /// Actual shares held; defaults to the last recorded quantity.
    pub quantity: Option<Quantity>,
    /// Start a new account with this principal instead of continuing the ledger.
    pub initial_principal_cents: Option<i64>,
    pub overrides: Overrides,
}

/// A computed plan and how it was obtained.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: CyclePlan,
    pub origin: SnapshotOrigin,
    /// Session-level warnings (ledger, market data), ahead of the plan's own.
    pub notes: Vec<String>,
    /// The ledger existed but could not be read, so the plan was seeded from zero.
    pub ledger_unreadable: bool,
}

impl PlanOutcome {
    /// Every warning for the operator, session notes first.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.notes
            .iter()
            .chain(self.plan.warnings.iter())
            .map(String::as_str)
    }
}

pub struct Session<L: Ledger> {
    config: Config,
    ledger: L,
    market: CachedMarketData<Box<dyn MarketDataSource>>,
    notifier: Option<Box<dyn Notifier>>,
    audit: Option<AuditLog>,
}

impl Session<CsvLedger> {
    /// Wire up the CSV ledger, market source, notifier and audit log from config.
    pub fn open(config: Config) -> Result<Self> {
        let source = feed::build(&config.market)?;
        let notifier = notify::build(&config.notify)?;
        let ledger = CsvLedger::new(config.ledger_path());

        let audit_path = config.audit_path();
        let audit = match AuditLog::open(&audit_path) {
            Ok(log) => Some(log),
            Err(e) => {
                warn!("audit log {} unavailable: {e}", audit_path.display());
                None
            }
        };

        let mut session = Session::new(config, ledger, source);
        session.notifier = notifier;
        session.audit = audit;
        Ok(session)
    }
}

impl<L: Ledger> Session<L> {
    /// A session without notifier or audit log.
    pub fn new(config: Config, ledger: L, source: Box<dyn MarketDataSource>) -> Self {
        let ttl = Duration::from_secs(config.market.cache_ttl_secs);
        let market =
            CachedMarketData::with_ttl(source, ttl).with_fallback(config.market.fallback_snapshot());
        Self {
            config,
            ledger,
            market,
            notifier: None,
            audit: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Compute this cycle's plan. Nothing is written to the ledger.
    pub fn plan(&mut self, args: &CycleArgs) -> Result<PlanOutcome> {
        let mut notes = Vec::new();
        let mut ledger_unreadable = false;

        let (mode, quantity) = match args.initial_principal_cents {
            Some(principal_cents) => (
                CycleMode::Initial {
                    principal_cents,
                    invest_ratio: self.config.account.initial_invest_ratio,
                },
                0,
            ),
            None => {
                let last = match self.ledger.read_last() {
                    Ok(last) => last,
                    Err(e) if e.is_persistence() => {
                        warn!("{e}");
                        notes.push(format!("ledger unreadable ({e}): starting from zero"));
                        ledger_unreadable = true;
                        None
                    }
                    Err(e) => return Err(e),
                };
                match last {
                    Some(record) => {
                        let quantity = args.quantity.unwrap_or(record.quantity);
                        (record.seed(args.pool_cents, args.deposit_cents), quantity)
                    }
                    None => {
                        if notes.is_empty() {
                            notes.push("no ledger history: starting from zero".to_string());
                        }
                        let mode = CycleMode::Update {
                            prev_target_cents: 0,
                            prev_principal_cents: 0,
                            base_pool_cents: args.pool_cents.unwrap_or(0),
                            deposit_cents: args.deposit_cents,
                        };
                        (mode, args.quantity.unwrap_or(0))
                    }
                }
            }
        };

        let fetched = self.market.fetch();
        if let Some(note) = report::origin_note(fetched.origin) {
            notes.push(note.to_string());
            self.audit_event(|audit| {
                audit::log_market_fallback(audit, fetched.origin, fetched.error.as_ref())
            });
        }
        let snapshot = args.overrides.apply(&fetched.snapshot);

        let input = self.config.cycle_input(mode, quantity);
        let plan = plan_cycle(&input, &snapshot)?;
        info!(
            "planned cycle: V {} regime {} ({} buy / {} sell rungs)",
            vrbook::fmt_cents(plan.account.target_value_cents),
            plan.quota.regime,
            plan.buy.len(),
            plan.sell.len()
        );
        self.audit_event(|audit| audit::log_cycle_planned(audit, &plan, fetched.origin));

        Ok(PlanOutcome {
            plan,
            origin: fetched.origin,
            notes,
            ledger_unreadable,
        })
    }

    /// Append the plan's account state to the ledger.
    ///
    /// A plan seeded from zero because the ledger could not be read is never
    /// appended; it would reset V and principal.
    pub fn save(&mut self, outcome: &PlanOutcome, date: NaiveDate) -> Result<CycleRecord> {
        if outcome.ledger_unreadable {
            return Err(Error::Aborted(
                "ledger could not be read; fix it or start over with --init".into(),
            ));
        }
        let record = CycleRecord::from_plan(&outcome.plan, date);
        self.ledger.append(&record)?;
        info!("recorded cycle for {}", record.date);
        self.audit_event(|audit| audit::log_record_appended(audit, &record));
        Ok(record)
    }

    /// Send the plan summary to the configured channel. Returns whether it was delivered.
    pub fn notify(&mut self, outcome: &PlanOutcome) -> bool {
        let Some(notifier) = &self.notifier else {
            return false;
        };
        let text = notify::format_plan_message(&outcome.plan, &self.config.market.ticker);
        notify::send_best_effort(notifier.as_ref(), &text, self.audit.as_mut())
    }

    /// Every saved cycle, oldest first.
    pub fn history(&self) -> Result<Vec<CycleRecord>> {
        self.ledger.read_all()
    }

    fn audit_event(&mut self, write: impl FnOnce(&mut AuditLog) -> Result<()>) {
        if let Some(audit) = self.audit.as_mut() {
            if let Err(e) = write(audit) {
                warn!("audit write failed: {e}");
            }
        }
    }
}
