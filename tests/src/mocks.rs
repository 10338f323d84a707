//! Mock implementations for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use tracker_core::Result;
use tracker_transport::{BatchEnvelope, HttpClient};

/// Mock HTTP client that captures shipped bodies in memory.
///
/// This implements the same `HttpClient` trait as the real reqwest-backed
/// client, so tests verify the exact payloads that would hit the ingest
/// endpoint without any network.
pub struct MockHttpClient {
    /// Scripted response statuses, popped per request; empty means 200.
    statuses: Mutex<Vec<u16>>,
    /// Bodies of every POST and beacon, in order.
    bodies: Mutex<Vec<String>>,
    /// URLs of every GET (image delivery).
    gets: Mutex<Vec<String>>,
    beacon_count: std::sync::atomic::AtomicUsize,
    refuse_beacon: AtomicBool,
}

impl MockHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
            beacon_count: std::sync::atomic::AtomicUsize::new(0),
            refuse_beacon: AtomicBool::new(false),
        })
    }

    /// Queue response statuses for upcoming requests.
    pub fn script_statuses(&self, statuses: &[u16]) {
        self.statuses.lock().extend_from_slice(statuses);
    }

    pub fn set_refuse_beacon(&self, refuse: bool) {
        self.refuse_beacon.store(refuse, Ordering::SeqCst);
    }

    /// Raw shipped bodies.
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.bodies.lock().len() + self.gets.lock().len()
    }

    /// How many batches went out via the beacon mechanism.
    pub fn beacon_count(&self) -> usize {
        self.beacon_count.load(Ordering::SeqCst)
    }

    /// URLs of image (GET) deliveries.
    pub fn get_urls(&self) -> Vec<String> {
        self.gets.lock().clone()
    }

    /// Shipped batches, parsed.
    pub fn envelopes(&self) -> Vec<BatchEnvelope> {
        self.bodies
            .lock()
            .iter()
            .map(|b| serde_json::from_str(b).expect("valid envelope JSON"))
            .collect()
    }

    fn next_status(&self) -> u16 {
        let mut statuses = self.statuses.lock();
        if statuses.is_empty() {
            200
        } else {
            statuses.remove(0)
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post_json(
        &self,
        _url: &str,
        _headers: &BTreeMap<String, String>,
        body: String,
        _keepalive: bool,
    ) -> Result<u16> {
        self.bodies.lock().push(body);
        Ok(self.next_status())
    }

    async fn get(&self, url: &str) -> Result<u16> {
        self.gets.lock().push(url.to_string());
        Ok(self.next_status())
    }

    fn beacon(&self, _url: &str, body: String) -> bool {
        if self.refuse_beacon.load(Ordering::SeqCst) {
            return false;
        }
        self.beacon_count.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().push(body);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scripts_statuses() {
        let client = MockHttpClient::new();
        client.script_statuses(&[500]);
        let status = client
            .post_json("https://t.example/ingest", &BTreeMap::new(), "{}".into(), false)
            .await
            .unwrap();
        assert_eq!(status, 500);
        let status = client
            .post_json("https://t.example/ingest", &BTreeMap::new(), "{}".into(), false)
            .await
            .unwrap();
        assert_eq!(status, 200);
        assert_eq!(client.request_count(), 2);
    }
}
