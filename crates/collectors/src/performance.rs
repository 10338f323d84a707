//! Performance collector: navigation timing, Web Vitals, long tasks, and a
//! bounded resource list, reported once.
//!
//! The report is scheduled 3 s after `load`; hiding the tab or unloading
//! forces it out earlier. A `reported` flag guards double reporting except
//! through `force_report`.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tracker_core::{
    EventData, EventType, PartialEvent, PerformanceConfig, PerformanceData, ResourceTiming,
};
use tracker_host::{
    PerformanceEntry, PerformanceEntryKind, Signal, SignalKind, TimerId, Window,
};

use crate::base::{Collector, CollectorBase, EmitFn};

pub const PERFORMANCE_COLLECTOR: &str = "performance";

/// Interaction entry names that feed INP.
const INP_EVENT_NAMES: [&str; 5] = ["pointerdown", "pointerup", "keydown", "keyup", "click"];

/// Event-timing entries shorter than this are not interactions worth rating.
const INP_DURATION_THRESHOLD: f64 = 16.0;

const OBSERVED_KINDS: [PerformanceEntryKind; 7] = [
    PerformanceEntryKind::Paint,
    PerformanceEntryKind::LargestContentfulPaint,
    PerformanceEntryKind::FirstInput,
    PerformanceEntryKind::LayoutShift,
    PerformanceEntryKind::EventTiming,
    PerformanceEntryKind::LongTask,
    PerformanceEntryKind::Resource,
];

struct PerfInner {
    metrics: PerformanceData,
    cls_raw: f64,
    first_input_seen: bool,
    reported: bool,
    report_timer: Option<TimerId>,
}

struct PerfShared {
    base: CollectorBase,
    config: PerformanceConfig,
    /// Tracker ingest endpoint; its requests are excluded from resources.
    own_endpoint: Option<String>,
    inner: Mutex<PerfInner>,
}

/// Collector for the single-shot performance report.
pub struct PerformanceCollector {
    shared: Arc<PerfShared>,
}

impl PerformanceCollector {
    pub fn new(config: PerformanceConfig, own_endpoint: Option<String>) -> Self {
        Self {
            shared: Arc::new(PerfShared {
                base: CollectorBase::new(PERFORMANCE_COLLECTOR),
                config,
                own_endpoint,
                inner: Mutex::new(PerfInner {
                    metrics: PerformanceData::default(),
                    cls_raw: 0.0,
                    first_input_seen: false,
                    reported: false,
                    report_timer: None,
                }),
            }),
        }
    }

    /// Emits the report immediately, even if one already went out.
    pub fn force_report(&self) {
        self.shared.report(true);
    }
}

impl Collector for PerformanceCollector {
    fn name(&self) -> &'static str {
        PERFORMANCE_COLLECTOR
    }

    fn install(&self, window: &Window, emit: EmitFn) {
        if !self.shared.base.begin_install(window, emit) {
            return;
        }

        // Navigation timing is available immediately.
        if let Some(timing) = window.navigation_timing() {
            let mut inner = self.shared.inner.lock();
            inner.metrics.ttfb = Some(timing.ttfb());
            inner.metrics.dns = Some(timing.dns());
            inner.metrics.tcp = Some(timing.tcp());
            inner.metrics.dom_content_loaded = Some(timing.dom_content_loaded());
            inner.metrics.load_complete = Some(timing.load_complete());
        } else {
            debug!("navigation timing unavailable, skipping timing metrics");
        }

        // Replay buffered entries, then observe live ones.
        for entry in window.buffered_performance(&OBSERVED_KINDS) {
            self.shared.process_entry(&entry);
        }

        let shared = self.shared.clone();
        let win = window.clone();
        let id = window.add_listener(
            &[
                SignalKind::Performance,
                SignalKind::Load,
                SignalKind::VisibilityChange,
                SignalKind::BeforeUnload,
            ],
            move |signal| match signal {
                Signal::Performance(entry) => shared.process_entry(entry),
                Signal::Load => PerfShared::schedule_report(&shared, &win),
                Signal::VisibilityChange { hidden: true } | Signal::BeforeUnload => {
                    shared.report(false);
                }
                _ => {}
            },
        );
        self.shared.base.track_listener(id);

        // The load event may already be behind us.
        if window.is_load_complete() {
            PerfShared::schedule_report(&self.shared, window);
        }
    }

    fn uninstall(&self) {
        self.shared.base.uninstall();
    }

    fn pause(&self) {
        self.shared.base.pause();
    }

    fn resume(&self) {
        self.shared.base.resume();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl PerfShared {
    fn process_entry(&self, entry: &PerformanceEntry) {
        let mut inner = self.inner.lock();
        match entry {
            PerformanceEntry::Paint { name, start_time } => {
                if name == "first-contentful-paint" {
                    inner.metrics.fcp = Some(*start_time);
                }
            }
            PerformanceEntry::LargestContentfulPaint { start_time } => {
                // Running last value; later candidates replace earlier ones.
                inner.metrics.lcp = Some(*start_time);
            }
            PerformanceEntry::FirstInput {
                start_time,
                processing_start,
                ..
            } => {
                if !inner.first_input_seen {
                    inner.first_input_seen = true;
                    inner.metrics.fid = Some((processing_start - start_time).max(0.0));
                }
            }
            PerformanceEntry::LayoutShift {
                value,
                had_recent_input,
            } => {
                if !had_recent_input {
                    inner.cls_raw += value;
                    inner.metrics.cls = Some((inner.cls_raw * 1000.0).round() / 1000.0);
                }
            }
            PerformanceEntry::EventTiming { name, duration } => {
                if *duration >= INP_DURATION_THRESHOLD
                    && INP_EVENT_NAMES.contains(&name.as_str())
                {
                    let current = inner.metrics.inp.unwrap_or(0.0);
                    inner.metrics.inp = Some(current.max(*duration));
                }
            }
            PerformanceEntry::LongTask { duration, .. } => {
                if *duration >= self.config.long_task_threshold_ms {
                    inner.metrics.long_task_count += 1;
                    inner.metrics.long_task_total += duration;
                    inner.metrics.long_task_max = inner.metrics.long_task_max.max(*duration);
                }
            }
            PerformanceEntry::Resource {
                url,
                duration,
                initiator,
                transfer_size,
            } => {
                if let Some(endpoint) = &self.own_endpoint {
                    if url.starts_with(endpoint.as_str()) {
                        return;
                    }
                }
                inner.metrics.resource_count = inner.metrics.resource_count.saturating_add(1);
                if inner.metrics.resources.len() < self.config.max_resources {
                    inner.metrics.resources.push(ResourceTiming {
                        url: strip_query(url),
                        duration: *duration,
                        initiator: Some(initiator.clone()),
                        transfer_size: Some(*transfer_size),
                    });
                }
            }
        }
    }

    fn schedule_report(this: &Arc<Self>, window: &Window) {
        let mut inner = this.inner.lock();
        if inner.reported || inner.report_timer.is_some() {
            return;
        }
        let shared = this.clone();
        let id = window.set_timeout(this.config.report_delay_ms, move || {
            shared.report(false);
        });
        inner.report_timer = Some(id);
        this.base.track_timer(id);
    }

    fn report(&self, force: bool) {
        let metrics = {
            let mut inner = self.inner.lock();
            if inner.reported && !force {
                return;
            }
            inner.reported = true;
            if let Some(id) = inner.report_timer.take() {
                if let Some(window) = self.base.window() {
                    window.clear_timer(id);
                }
                self.base.untrack_timer(id);
            }
            inner.metrics.clone()
        };
        self.base.emit(
            PartialEvent::new(EventType::Performance, "performance")
                .with_data(EventData::Performance(metrics)),
        );
    }
}

/// Strips the query/fragment, keeping origin + path.
fn strip_query(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(u) => {
            let origin = u.origin().ascii_serialization();
            format!("{}{}", origin, u.path())
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}
