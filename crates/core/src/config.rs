//! Tracker configuration surface.
//!
//! A single options record with serde-defaulted sub-configs. Lifecycle hooks
//! are function values and live in [`Hooks`], outside serde.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::event::{EventType, TrackEvent};
use crate::limits;

/// Delivery mechanism for shipped batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMethod {
    Beacon,
    #[default]
    Fetch,
    Xhr,
    Image,
}

/// Advanced sampling: per-type rates with a global fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Global fallback rate in [0, 1].
    #[serde(default = "default_rate")]
    pub rate: f64,
    /// Per-type overrides, consulted before the global rate.
    #[serde(default)]
    pub rate_by_type: BTreeMap<EventType, f64>,
}

fn default_rate() -> f64 {
    1.0
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: default_rate(),
            rate_by_type: BTreeMap::new(),
        }
    }
}

/// Transport retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(rename = "baseDelay", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(rename = "maxDelay", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub use_exponential_backoff: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            use_exponential_backoff: true,
        }
    }
}

/// Offline buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Storage key in persistent key-value storage.
    #[serde(default = "default_offline_key")]
    pub storage_key: String,
    #[serde(default = "default_offline_max_events")]
    pub max_events: usize,
    /// Entries older than this are dropped at rehydration (ms).
    #[serde(rename = "expireTime", default = "default_offline_expire_ms")]
    pub expire_ms: i64,
}

fn default_offline_key() -> String {
    "ldesign_tracker_events".to_string()
}

fn default_offline_max_events() -> usize {
    limits::DEFAULT_OFFLINE_MAX_EVENTS
}

fn default_offline_expire_ms() -> i64 {
    limits::DEFAULT_OFFLINE_EXPIRE_MS
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_key: default_offline_key(),
            max_events: default_offline_max_events(),
            expire_ms: default_offline_expire_ms(),
        }
    }
}

/// Click collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickConfig {
    /// Single-click debounce window (ms).
    #[serde(rename = "debounceDelay", default = "default_click_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_true")]
    pub track_double_click: bool,
    #[serde(default)]
    pub track_context_menu: bool,
    /// Walk up to find the nearest clickable ancestor.
    #[serde(default = "default_true")]
    pub bubble_to_clickable: bool,
}

fn default_click_debounce_ms() -> u64 {
    100
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_click_debounce_ms(),
            track_double_click: true,
            track_context_menu: false,
            bubble_to_clickable: true,
        }
    }
}

/// Scroll collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollConfig {
    #[serde(default = "default_scroll_throttle_ms")]
    pub throttle_ms: u64,
    /// Depth thresholds (percent) that arm one-shot events.
    #[serde(default = "default_depth_thresholds")]
    pub depth_thresholds: Vec<u8>,
}

fn default_scroll_throttle_ms() -> u64 {
    500
}

fn default_depth_thresholds() -> Vec<u8> {
    vec![25, 50, 75, 100]
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_scroll_throttle_ms(),
            depth_thresholds: default_depth_thresholds(),
        }
    }
}

/// Input collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    /// When false, non-sensitive values are reported as length-only too.
    #[serde(default)]
    pub capture_values: bool,
    #[serde(default = "default_value_max_len")]
    pub value_max_len: usize,
    /// Also capture form `submit` events.
    #[serde(default = "default_true")]
    pub track_form_submit: bool,
}

fn default_value_max_len() -> usize {
    100
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            capture_values: false,
            value_max_len: default_value_max_len(),
            track_form_submit: true,
        }
    }
}

/// Error collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorConfig {
    #[serde(default = "default_rate")]
    pub sample_rate: f64,
    /// Extra substring ignore patterns on top of the built-in set.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_rate(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Performance collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfig {
    /// Long tasks below this duration (ms) are ignored.
    #[serde(rename = "longTaskThreshold", default = "default_long_task_threshold_ms")]
    pub long_task_threshold_ms: f64,
    /// Delay after `load` before the single report fires (ms).
    #[serde(default = "default_report_delay_ms")]
    pub report_delay_ms: u64,
    #[serde(default = "default_max_resources")]
    pub max_resources: usize,
}

fn default_long_task_threshold_ms() -> f64 {
    50.0
}

fn default_report_delay_ms() -> u64 {
    3000
}

fn default_max_resources() -> usize {
    limits::MAX_RESOURCE_ENTRIES
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            long_task_threshold_ms: default_long_task_threshold_ms(),
            report_delay_ms: default_report_delay_ms(),
            max_resources: default_max_resources(),
        }
    }
}

/// Exposure collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureConfig {
    /// CSS selectors for elements to observe.
    #[serde(default = "default_exposure_selectors")]
    pub selectors: Vec<String>,
    /// Intersection ratio thresholds; the minimum arms dwell tracking.
    #[serde(default = "default_exposure_thresholds")]
    pub thresholds: Vec<f64>,
    /// Minimum dwell before an exposure is reported (ms).
    #[serde(rename = "minDuration", default = "default_min_duration_ms")]
    pub min_duration_ms: i64,
    /// At most one exposure per exposure id for the tab's lifetime.
    #[serde(default = "default_true")]
    pub trigger_once: bool,
    /// Dwell scan interval (ms).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_exposure_selectors() -> Vec<String> {
    vec!["[data-track-exposure]".to_string()]
}

fn default_exposure_thresholds() -> Vec<f64> {
    vec![0.5]
}

fn default_min_duration_ms() -> i64 {
    1000
}

fn default_tick_ms() -> u64 {
    500
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            selectors: default_exposure_selectors(),
            thresholds: default_exposure_thresholds(),
            min_duration_ms: default_min_duration_ms(),
            trigger_once: true,
            tick_ms: default_tick_ms(),
        }
    }
}

/// Filter hook: return `None` to drop the event.
pub type BeforeTrackHook = Arc<dyn Fn(TrackEvent) -> Option<TrackEvent> + Send + Sync>;
/// Rewrite hook: must return an event.
pub type TransformEventHook = Arc<dyn Fn(TrackEvent) -> TrackEvent + Send + Sync>;
/// Called after an event is accepted into the queue.
pub type OnTrackHook = Arc<dyn Fn(&TrackEvent) + Send + Sync>;
/// Called after a batch ships successfully.
pub type OnSuccessHook = Arc<dyn Fn(&[TrackEvent]) + Send + Sync>;
/// Called when a batch terminally fails.
pub type OnErrorHook = Arc<dyn Fn(&Error, &[TrackEvent]) + Send + Sync>;

/// Lifecycle hooks. Kept outside serde; cloning shares the closures.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_track: Option<BeforeTrackHook>,
    pub transform_event: Option<TransformEventHook>,
    pub on_track: Option<OnTrackHook>,
    pub on_success: Option<OnSuccessHook>,
    pub on_error: Option<OnErrorHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_track", &self.before_track.is_some())
            .field("transform_event", &self.transform_event.is_some())
            .field("on_track", &self.on_track.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// The merged tracker options record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerOptions {
    /// Master on/off; when false, `install` is a no-op.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Attached to each event; also drives consistent sampling.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Overrides the auto-generated per-tab session id.
    #[serde(default)]
    pub session_id: Option<String>,

    /// Simple global sample rate in [0, 1]; bypasses advanced sampling.
    #[serde(default)]
    pub sample_rate: Option<f64>,
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// In-memory queue capacity.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Periodic flush period (ms).
    #[serde(rename = "batchInterval", default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    /// Queue size that triggers an early flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Ingest URL; absent means events are handled but never shipped.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub report_method: ReportMethod,
    /// Extra headers for fetch/xhr deliveries.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_true")]
    pub auto_page_view: bool,
    #[serde(default = "default_true")]
    pub auto_click: bool,
    #[serde(default = "default_true")]
    pub auto_scroll: bool,
    #[serde(default = "default_true")]
    pub auto_input: bool,
    #[serde(default = "default_true")]
    pub auto_error: bool,
    #[serde(default = "default_true")]
    pub auto_performance: bool,
    #[serde(default = "default_true")]
    pub auto_exposure: bool,

    /// Case-insensitive substrings for field-name masking.
    #[serde(default = "default_sensitive_fields")]
    pub sensitive_fields: Vec<String>,
    /// CSS selectors; matching elements are not captured.
    #[serde(default)]
    pub ignore_selectors: Vec<String>,

    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub offline: OfflineConfig,

    #[serde(default)]
    pub click: ClickConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub error: ErrorConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub exposure: ExposureConfig,

    /// Attached to every event under `properties`.
    #[serde(default)]
    pub global_properties: BTreeMap<String, Value>,

    /// Enables debug-level console logging.
    #[serde(default)]
    pub debug: bool,

    #[serde(skip)]
    pub hooks: Hooks,
}

fn default_app_name() -> String {
    "app".to_string()
}

fn default_app_version() -> String {
    "0.0.0".to_string()
}

fn default_max_events() -> usize {
    limits::DEFAULT_QUEUE_CAPACITY
}

fn default_batch_interval_ms() -> u64 {
    5000
}

fn default_batch_size() -> usize {
    10
}

fn default_sensitive_fields() -> Vec<String> {
    ["password", "token", "secret", "credit", "card"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: default_app_name(),
            app_version: default_app_version(),
            user_id: None,
            session_id: None,
            sample_rate: None,
            sampling: SamplingConfig::default(),
            max_events: default_max_events(),
            batch_interval_ms: default_batch_interval_ms(),
            batch_size: default_batch_size(),
            endpoint: None,
            report_method: ReportMethod::default(),
            headers: BTreeMap::new(),
            auto_page_view: true,
            auto_click: true,
            auto_scroll: true,
            auto_input: true,
            auto_error: true,
            auto_performance: true,
            auto_exposure: true,
            sensitive_fields: default_sensitive_fields(),
            ignore_selectors: Vec::new(),
            retry: RetryConfig::default(),
            offline: OfflineConfig::default(),
            click: ClickConfig::default(),
            scroll: ScrollConfig::default(),
            input: InputConfig::default(),
            error: ErrorConfig::default(),
            performance: PerformanceConfig::default(),
            exposure: ExposureConfig::default(),
            global_properties: BTreeMap::new(),
            debug: false,
            hooks: Hooks::default(),
        }
    }
}

impl TrackerOptions {
    /// Options with an endpoint set and everything else defaulted.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// True when the given field name/id/type matches a sensitive pattern
    /// (case-insensitive substring match).
    pub fn is_sensitive_field(&self, candidate: &str) -> bool {
        let lower = candidate.to_ascii_lowercase();
        self.sensitive_fields
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_ascii_lowercase()))
    }
}
