//! Periodic scrape scheduler.
//!
//! Runs one cycle immediately, then one per interval until the shutdown
//! signal is observed. Cycles run inline in the loop, never spawned, so
//! the scheduler cannot overlap with itself. Ticks missed while a cycle
//! overruns are skipped rather than queued.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use flagcount_client::FlagApi;

use crate::cycle::{CycleOutcome, Scraper};

/// Drive `scraper` every `interval` until `shutdown` flips to `true`.
///
/// A cycle that is running when the signal arrives finishes and commits;
/// no new cycle starts afterwards. `abort` is handed to every remote call
/// and is only meant to fire on a forced shutdown.
///
/// Returns the number of cycles that ran.
pub async fn run_scheduler<A: FlagApi>(
    scraper: &Scraper<A>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    abort: CancellationToken,
) -> u64 {
    info!(interval_secs = interval.as_secs(), "starting metrics scraper");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = 0u64;

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    warn!("shutdown sender dropped, stopping scraper");
                    break;
                }
            }
            // The first tick completes immediately: cold start scrapes at once.
            _ = ticker.tick() => {
                let report = scraper.run_cycle(&abort).await;
                if report.outcome != CycleOutcome::Skipped {
                    cycles += 1;
                }
            }
        }
    }

    info!(cycles, "scraping stopped");
    cycles
}
