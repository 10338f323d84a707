//! Batch sender: envelope serialization, mechanism dispatch, retry.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, error};

use tracker_core::util::json::safe_stringify;
use tracker_core::{ReportMethod, Result};
use tracker_host::SharedClock;

use crate::delivery::{deliver, SharedHttpClient};
use crate::payload::BatchEnvelope;
use crate::retry::{retry, RetryPolicy};

/// Per-flush transport parameters, snapshotted from the tracker options.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub endpoint: String,
    pub method: ReportMethod,
    pub headers: BTreeMap<String, String>,
    pub retry: RetryPolicy,
}

/// Ships envelopes to the ingest endpoint with retry.
pub struct Transport {
    client: SharedHttpClient,
    clock: SharedClock,
}

impl Transport {
    pub fn new(client: SharedHttpClient, clock: SharedClock) -> Self {
        Self { client, clock }
    }

    /// Sends one envelope. At unload the beacon mechanism is preferred
    /// because it does not require the page to stay alive.
    pub async fn send(
        &self,
        request: &TransportRequest,
        envelope: &BatchEnvelope,
        prefer_beacon: bool,
    ) -> Result<()> {
        let body = safe_stringify(envelope);
        let method = if prefer_beacon {
            ReportMethod::Beacon
        } else {
            request.method
        };
        let count = envelope.events.len();
        let start = Instant::now();

        let client = self.client.clone();
        let clock = self.clock.clone();
        let endpoint = request.endpoint.clone();
        let headers = request.headers.clone();

        let result = retry(
            &request.retry,
            move |_attempt| {
                let client = client.clone();
                let endpoint = endpoint.clone();
                let headers = headers.clone();
                let body = body.clone();
                let now = clock.now_ms();
                async move { deliver(&client, method, &endpoint, &headers, body, now).await }
            },
            |e, attempt| {
                debug!(attempt = attempt, error = %e, "batch delivery attempt failed");
            },
        )
        .await;

        let latency_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                debug!(
                    count = count,
                    method = ?method,
                    latency_ms = latency_ms,
                    "batch shipped"
                );
            }
            Err(e) => {
                error!(count = count, error = %e, "batch delivery exhausted retries");
            }
        }
        result
    }
}
