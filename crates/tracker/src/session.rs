//! Per-tab session id management over session storage.

use parking_lot::Mutex;
use tracing::warn;

use tracker_core::util::ids;
use tracker_host::SharedStorage;

/// Session-storage key holding the per-tab session id.
pub const SESSION_STORAGE_KEY: &str = "ldesign_tracker_session";

/// Lazily creates and caches the per-tab session id. A configured override
/// wins over anything stored.
pub struct SessionManager {
    storage: SharedStorage,
    configured: Option<String>,
    cached: Mutex<Option<String>>,
}

impl SessionManager {
    pub fn new(storage: SharedStorage, configured: Option<String>) -> Self {
        Self {
            storage,
            configured,
            cached: Mutex::new(None),
        }
    }

    /// The stable session id for this tab, created on first use.
    pub fn get_or_create(&self) -> String {
        let mut cached = self.cached.lock();
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        let id = if let Some(configured) = &self.configured {
            configured.clone()
        } else if let Some(existing) = self.storage.get(SESSION_STORAGE_KEY) {
            if existing.is_empty() {
                ids::session_id()
            } else {
                existing
            }
        } else {
            ids::session_id()
        };

        if let Err(e) = self.storage.set(SESSION_STORAGE_KEY, &id) {
            warn!(error = %e, "failed to persist session id");
        }
        *cached = Some(id.clone());
        id
    }
}
