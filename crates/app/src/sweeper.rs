use std::{sync::Arc, time::Duration};

use metrics::{counter, gauge};
use streamhook_core::dedupe::DedupeCache;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Background task that evicts expired delivery identifiers.
///
/// Lookups already ignore expired records, so a missed tick only costs
/// memory.
#[derive(Clone)]
pub struct DedupeSweeper {
    cache: Arc<DedupeCache>,
    interval: Duration,
}

impl DedupeSweeper {
    pub fn new(cache: Arc<DedupeCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Runs the sweep loop in the background.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop().await;
        })
    }

    async fn run_loop(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have expired yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.run_once();
        }
    }

    /// Executes one sweep and returns the number of evicted identifiers.
    pub fn run_once(&self) -> usize {
        let evicted = self.cache.purge_expired();
        let remaining = self.cache.len();

        counter!("eventsub_dedupe_evicted_total").increment(evicted as u64);
        gauge!("eventsub_dedupe_entries").set(remaining as f64);
        debug!(stage = "sweeper", evicted, remaining, "dedupe sweep completed");

        evicted
    }
}
