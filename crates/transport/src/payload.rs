//! Batch envelope sent to the ingest endpoint.

use serde::{Deserialize, Serialize};

use tracker_core::TrackEvent;

/// SDK metadata attached to each batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub sdk_version: String,
    /// Batch assembly time (Unix ms).
    pub timestamp: i64,
    /// Queue depth at flush time, before draining.
    pub queue_size: u32,
}

/// The wire envelope: `{appName, appVersion, sessionId, events, metadata}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnvelope {
    pub app_name: String,
    pub app_version: String,
    pub session_id: String,
    pub events: Vec<TrackEvent>,
    pub metadata: BatchMetadata,
}

impl BatchEnvelope {
    pub fn new(
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        session_id: impl Into<String>,
        events: Vec<TrackEvent>,
        now_ms: i64,
        queue_size: u32,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            session_id: session_id.into(),
            events,
            metadata: BatchMetadata {
                sdk_version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: now_ms,
                queue_size,
            },
        }
    }
}
