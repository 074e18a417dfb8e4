//! vrbook-planner: runs value-rebalancing cycles for a single account.
//!
//! Reads the last saved cycle from a CSV ledger, fetches a market snapshot
//! (JSON file, static config or Yahoo), asks the engine for a plan, prints the
//! buy and sell ladders, and optionally records the cycle and notifies the
//! operator. Every step is written to a JSONL audit trail.

pub mod audit;
pub mod config;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod notify;
pub mod report;
pub mod session;
