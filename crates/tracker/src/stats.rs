//! Internal counters for the tracker pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Pipeline counters, incremented on the hot path.
#[derive(Debug, Default)]
pub struct TrackerStats {
    pub events_tracked: Counter,
    pub events_sampled_out: Counter,
    pub events_dropped_by_hook: Counter,
    pub events_deduped: Counter,
    pub events_dropped_queue_full: Counter,
    pub events_rejected_invalid: Counter,
    pub events_shipped: Counter,
    pub batches_shipped: Counter,
    pub transport_failures: Counter,
    pub events_persisted_offline: Counter,
    pub events_rehydrated: Counter,
}

/// A point-in-time snapshot of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub events_tracked: u64,
    pub events_sampled_out: u64,
    pub events_dropped_by_hook: u64,
    pub events_deduped: u64,
    pub events_dropped_queue_full: u64,
    pub events_rejected_invalid: u64,
    pub events_shipped: u64,
    pub batches_shipped: u64,
    pub transport_failures: u64,
    pub events_persisted_offline: u64,
    pub events_rehydrated: u64,
}

impl TrackerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_tracked: self.events_tracked.get(),
            events_sampled_out: self.events_sampled_out.get(),
            events_dropped_by_hook: self.events_dropped_by_hook.get(),
            events_deduped: self.events_deduped.get(),
            events_dropped_queue_full: self.events_dropped_queue_full.get(),
            events_rejected_invalid: self.events_rejected_invalid.get(),
            events_shipped: self.events_shipped.get(),
            batches_shipped: self.batches_shipped.get(),
            transport_failures: self.transport_failures.get(),
            events_persisted_offline: self.events_persisted_offline.get(),
            events_rehydrated: self.events_rehydrated.get(),
        }
    }
}
