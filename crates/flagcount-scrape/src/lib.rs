//! flagcount-scrape: scrape orchestration for the flagcount exporter.
//!
//! # Architecture
//!
//! ```text
//! run_scheduler()
//!   ├── first cycle immediately
//!   ├── tokio interval (missed ticks skipped)
//!   └── Scraper::run_cycle()
//!         ├── cycle lock (try_lock → Skipped)
//!         ├── FlagApi: configs → environments → stale flags → flags per config
//!         └── MetricStore::apply(batch) ← one commit per cycle
//! ```
//!
//! Fetch errors are counted in `scrape_errors_total` and logged; they
//! never reach the scheduler.

pub mod cycle;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod fake;

pub use cycle::{CycleOutcome, CycleReport, Scraper};
pub use scheduler::run_scheduler;
