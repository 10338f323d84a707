//! Delivery mechanisms: beacon, fetch, XHR, and image GET, over a pluggable
//! HTTP client.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use tracker_core::limits::MAX_IMAGE_PAYLOAD_BYTES;
use tracker_core::{Error, ReportMethod, Result};

/// Minimal HTTP surface the transport needs. Tests substitute a mock.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST JSON; returns the response status code.
    async fn post_json(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: String,
        keepalive: bool,
    ) -> Result<u16>;

    /// GET; returns the response status code.
    async fn get(&self, url: &str) -> Result<u16>;

    /// Beacon-style fire-and-forget enqueue. Returns false when the payload
    /// is refused synchronously.
    fn beacon(&self, url: &str, body: String) -> bool;
}

/// Shared client handle.
pub type SharedHttpClient = Arc<dyn HttpClient>;

/// Production client backed by reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn shared() -> SharedHttpClient {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: String,
        _keepalive: bool,
    ) -> Result<u16> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(response.status().as_u16())
    }

    async fn get(&self, url: &str) -> Result<u16> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(response.status().as_u16())
    }

    fn beacon(&self, url: &str, body: String) -> bool {
        // Fire-and-forget: hand the request to the runtime and report
        // enqueue success only. Without a runtime the beacon is refused.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        let client = self.client.clone();
        let url = url.to_string();
        handle.spawn(async move {
            if let Err(e) = client
                .post(&url)
                .header("Content-Type", "application/json")
                .body(body)
                .send()
                .await
            {
                debug!(error = %e, "beacon send failed");
            }
        });
        true
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Dispatches one payload via the configured mechanism.
pub async fn deliver(
    client: &SharedHttpClient,
    method: ReportMethod,
    endpoint: &str,
    headers: &BTreeMap<String, String>,
    body: String,
    now_ms: i64,
) -> Result<()> {
    match method {
        ReportMethod::Beacon => {
            if client.beacon(endpoint, body) {
                Ok(())
            } else {
                Err(Error::transport("beacon refused payload"))
            }
        }
        ReportMethod::Fetch | ReportMethod::Xhr => {
            let keepalive = method == ReportMethod::Fetch;
            let status = client.post_json(endpoint, headers, body, keepalive).await?;
            if is_success(status) {
                Ok(())
            } else {
                Err(Error::transport(format!("http {}", status)))
            }
        }
        ReportMethod::Image => {
            let encoded: String = url::form_urlencoded::byte_serialize(body.as_bytes()).collect();
            if encoded.len() > MAX_IMAGE_PAYLOAD_BYTES {
                warn!(
                    bytes = encoded.len(),
                    "payload too large for image delivery"
                );
                return Err(Error::transport("payload too large for image delivery"));
            }
            let separator = if endpoint.contains('?') { '&' } else { '?' };
            let url = format!("{}{}data={}&t={}", endpoint, separator, encoded, now_ms);
            let status = client.get(&url).await?;
            if is_success(status) {
                Ok(())
            } else {
                Err(Error::transport(format!("http {}", status)))
            }
        }
    }
}
