//! Offline buffer: persistent event storage across offline gaps and reloads.
//!
//! Storage failures are logged and swallowed; events on that path are lost
//! rather than crashing the host.

use tracing::{debug, warn};

use tracker_core::util::json::safe_stringify;
use tracker_core::{OfflineConfig, TrackEvent};
use tracker_host::{SharedClock, SharedStorage};

/// Persists failed/offline batches to key-value storage and rehydrates them
/// at the next install.
pub struct OfflineBuffer {
    storage: SharedStorage,
    config: OfflineConfig,
    clock: SharedClock,
}

impl OfflineBuffer {
    pub fn new(storage: SharedStorage, config: OfflineConfig, clock: SharedClock) -> Self {
        Self {
            storage,
            config,
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Appends events, keeping only the last `max_events`.
    pub fn save(&self, events: &[TrackEvent]) {
        if !self.config.enabled || events.is_empty() {
            return;
        }
        let mut all = self.read_stored();
        all.extend(events.iter().cloned());
        if all.len() > self.config.max_events {
            let excess = all.len() - self.config.max_events;
            all.drain(..excess);
        }
        let serialized = safe_stringify(&all);
        if let Err(e) = self.storage.set(&self.config.storage_key, &serialized) {
            warn!(error = %e, count = events.len(), "failed to persist offline events");
            return;
        }
        debug!(count = all.len(), "offline buffer updated");
    }

    /// Drains the buffer, dropping entries older than `expire_ms`. Ordering
    /// of survivors is preserved.
    pub fn load(&self) -> Vec<TrackEvent> {
        if !self.config.enabled {
            return Vec::new();
        }
        let all = self.read_stored();
        if all.is_empty() {
            return Vec::new();
        }
        self.storage.remove(&self.config.storage_key);

        let now = self.clock.now_ms();
        let total = all.len();
        let survivors: Vec<TrackEvent> = all
            .into_iter()
            .filter(|e| now - e.timestamp <= self.config.expire_ms)
            .collect();
        if survivors.len() < total {
            debug!(
                expired = total - survivors.len(),
                "dropped expired offline events"
            );
        }
        survivors
    }

    fn read_stored(&self) -> Vec<TrackEvent> {
        let raw = match self.storage.get(&self.config.storage_key) {
            Some(raw) => raw,
            None => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "corrupt offline buffer discarded");
                self.storage.remove(&self.config.storage_key);
                Vec::new()
            }
        }
    }
}
