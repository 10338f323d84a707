//! Exposure collector: viewport-intersection dwell tracking.
//!
//! An exposure fires once the accumulated dwell reaches `min_duration_ms`,
//! at most once per exposure id for the tab's lifetime under `trigger_once`.
//! A periodic tick catches elements that dwell without ever leaving the
//! viewport.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use tracker_core::{EventData, EventType, ExposureConfig, ExposureData, PartialEvent};
use tracker_host::{xpath, NodeId, Selector, Signal, SignalKind, TimerId, Window};

use crate::base::{Collector, CollectorBase, EmitFn};
use crate::element::element_info;

pub const EXPOSURE_COLLECTOR: &str = "exposure";

struct ElementState {
    exposure_id: String,
    start_time: Option<i64>,
    exposed: bool,
    total_duration: i64,
}

struct ExposureInner {
    observed: HashMap<NodeId, ElementState>,
    reported: HashSet<String>,
    tick_timer: Option<TimerId>,
}

struct ExposureShared {
    base: CollectorBase,
    config: ExposureConfig,
    selectors: Vec<Selector>,
    min_threshold: f64,
    inner: Mutex<ExposureInner>,
}

/// Collector for element-exposure events.
pub struct ExposureCollector {
    shared: Arc<ExposureShared>,
}

impl ExposureCollector {
    pub fn new(config: ExposureConfig) -> Self {
        let selectors = config
            .selectors
            .iter()
            .filter_map(|s| match Selector::parse(s) {
                Ok(sel) => Some(sel),
                Err(e) => {
                    debug!(selector = s.as_str(), error = %e, "invalid exposure selector");
                    None
                }
            })
            .collect();
        let min_threshold = config
            .thresholds
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let min_threshold = if min_threshold.is_finite() {
            min_threshold
        } else {
            0.0
        };
        Self {
            shared: Arc::new(ExposureShared {
                base: CollectorBase::new(EXPOSURE_COLLECTOR),
                config,
                selectors,
                min_threshold,
                inner: Mutex::new(ExposureInner {
                    observed: HashMap::new(),
                    reported: HashSet::new(),
                    tick_timer: None,
                }),
            }),
        }
    }

    /// Manually observe an element, optionally with an explicit exposure id.
    pub fn observe(&self, node: NodeId, exposure_id: Option<String>) {
        if let Some(window) = self.shared.base.window() {
            self.shared.observe_node(&window, node, exposure_id);
        }
    }

    /// Stop observing; any open dwell is finalized without reporting.
    pub fn unobserve(&self, node: NodeId) {
        self.shared.inner.lock().observed.remove(&node);
    }

    /// Manual exposure report. This path does not consult the reported set,
    /// so repeated calls emit duplicates; kept as the source behaves.
    pub fn track_exposure(&self, exposure_id: &str, extra: Option<Value>) {
        let is_first = !self.shared.inner.lock().reported.contains(exposure_id);
        let data = ExposureData {
            exposure_id: exposure_id.to_string(),
            intersection_ratio: 1.0,
            duration: 0,
            is_first_exposure: is_first,
            extra,
        };
        self.shared.base.emit(
            PartialEvent::new(EventType::Exposure, format!("exposure_{}", exposure_id))
                .with_data(EventData::Exposure(data)),
        );
    }

    /// Forgets every reported exposure id, re-arming `trigger_once`.
    pub fn clear_reported_exposures(&self) {
        self.shared.inner.lock().reported.clear();
    }
}

impl Collector for ExposureCollector {
    fn name(&self) -> &'static str {
        EXPOSURE_COLLECTOR
    }

    fn install(&self, window: &Window, emit: EmitFn) {
        if !self.shared.base.begin_install(window, emit) {
            return;
        }

        // Observe elements already in the document.
        let matching: Vec<NodeId> = {
            let doc = window.document();
            doc.descendants(doc.root())
                .into_iter()
                .filter(|&n| self.shared.selectors.iter().any(|s| s.matches(&doc, n)))
                .collect()
        };
        for node in matching {
            self.shared.observe_node(window, node, None);
        }

        let shared = self.shared.clone();
        let win = window.clone();
        let id = window.add_listener(
            &[
                SignalKind::Intersection,
                SignalKind::DomMutation,
                SignalKind::VisibilityChange,
            ],
            move |signal| match signal {
                Signal::Intersection {
                    target,
                    ratio,
                    is_intersecting,
                } => shared.handle_intersection(&win, *target, *ratio, *is_intersecting),
                Signal::DomMutation { added, removed } => {
                    shared.handle_mutation(&win, added, removed)
                }
                Signal::VisibilityChange { hidden: true } => shared.flush_dwells(&win),
                _ => {}
            },
        );
        self.shared.base.track_listener(id);

        // Dwell tick: catches elements that stay in-viewport long enough
        // without an exit ever firing.
        let shared = self.shared.clone();
        let win = window.clone();
        let tick = window.set_interval(self.shared.config.tick_ms, move || {
            shared.tick(&win);
        });
        self.shared.inner.lock().tick_timer = Some(tick);
        self.shared.base.track_timer(tick);
    }

    fn uninstall(&self) {
        {
            let mut inner = self.shared.inner.lock();
            inner.observed.clear();
            inner.tick_timer = None;
        }
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

impl ExposureShared {
    /// Exposure id: `data-track-exposure` value, else `#id`, else XPath.
    fn exposure_id_for(&self, window: &Window, node: NodeId) -> String {
        let doc = window.document();
        if let Some(id) = doc.attr(node, "data-track-exposure") {
            if !id.is_empty() {
                return id.to_string();
            }
        }
        if let Some(id) = doc.id_attr(node) {
            return format!("#{}", id);
        }
        xpath(&doc, node)
    }

    fn observe_node(&self, window: &Window, node: NodeId, exposure_id: Option<String>) {
        let exposure_id = exposure_id.unwrap_or_else(|| self.exposure_id_for(window, node));
        let mut inner = self.inner.lock();
        inner.observed.entry(node).or_insert_with(|| {
            debug!(exposure_id = exposure_id.as_str(), "observing element");
            ElementState {
                exposure_id,
                start_time: None,
                exposed: false,
                total_duration: 0,
            }
        });
        // An element may already be intersecting when observation starts.
        if let Some(ratio) = window.intersection_ratio(node) {
            if ratio >= self.min_threshold {
                if let Some(state) = inner.observed.get_mut(&node) {
                    if state.start_time.is_none() {
                        state.start_time = Some(window.now_ms());
                    }
                }
            }
        }
    }

    fn handle_intersection(&self, window: &Window, target: NodeId, ratio: f64, intersecting: bool) {
        if !self.base.is_active() {
            return;
        }
        let now = window.now_ms();
        let report = {
            let mut inner = self.inner.lock();
            let Some(state) = inner.observed.get_mut(&target) else {
                return;
            };
            if intersecting && ratio >= self.min_threshold {
                if state.start_time.is_none() {
                    state.start_time = Some(now);
                }
                false
            } else {
                if let Some(start) = state.start_time.take() {
                    state.total_duration += now - start;
                }
                true
            }
        };
        if report {
            self.check_and_report(window, target, ratio);
        }
    }

    fn handle_mutation(&self, window: &Window, added: &[NodeId], removed: &[NodeId]) {
        if !self.base.is_active() {
            return;
        }
        for &node in added {
            let matches = {
                let doc = window.document();
                self.selectors.iter().any(|s| s.matches(&doc, node))
            };
            if matches {
                self.observe_node(window, node, None);
            }
        }
        for node in removed {
            self.inner.lock().observed.remove(node);
        }
    }

    /// Closes all open dwells (tab hidden) and reports those that qualify.
    fn flush_dwells(&self, window: &Window) {
        let now = window.now_ms();
        let candidates: Vec<NodeId> = {
            let mut inner = self.inner.lock();
            inner
                .observed
                .iter_mut()
                .filter_map(|(&node, state)| {
                    state.start_time.take().map(|start| {
                        state.total_duration += now - start;
                        node
                    })
                })
                .collect()
        };
        for node in candidates {
            let ratio = window.intersection_ratio(node).unwrap_or(0.0);
            self.check_and_report(window, node, ratio);
        }
    }

    /// Periodic scan for elements dwelling in-viewport past the threshold.
    fn tick(&self, window: &Window) {
        if !self.base.is_active() {
            return;
        }
        let now = window.now_ms();
        let candidates: Vec<(NodeId, f64)> = {
            let inner = self.inner.lock();
            inner
                .observed
                .iter()
                .filter_map(|(&node, state)| {
                    let start = state.start_time?;
                    let live = state.total_duration + (now - start);
                    if live >= self.config.min_duration_ms {
                        Some((node, window.intersection_ratio(node).unwrap_or(0.0)))
                    } else {
                        None
                    }
                })
                .collect()
        };
        for (node, ratio) in candidates {
            self.check_and_report(window, node, ratio);
        }
    }

    /// Emits an exposure iff the dwell qualifies and `trigger_once` permits.
    fn check_and_report(&self, window: &Window, node: NodeId, ratio: f64) {
        let now = window.now_ms();
        let emit_data = {
            let mut inner = self.inner.lock();
            let Some(state) = inner.observed.get(&node) else {
                return;
            };
            let effective = state.total_duration
                + state.start_time.map(|s| now - s).unwrap_or(0);
            if effective < self.config.min_duration_ms {
                return;
            }
            let exposed = state.exposed;
            let exposure_id = state.exposure_id.clone();
            let has_start_time = state.start_time.is_some();
            if self.config.trigger_once
                && (exposed || inner.reported.contains(&exposure_id))
            {
                return;
            }
            let is_first = !inner.reported.contains(&exposure_id);
            let state = inner.observed.get_mut(&node).expect("checked above");
            state.exposed = true;
            // Dwell restarts after a report.
            state.total_duration = 0;
            if has_start_time {
                state.start_time = Some(now);
            }
            inner.reported.insert(exposure_id.clone());
            Some((exposure_id, effective, is_first))
        };

        if let Some((exposure_id, duration, is_first)) = emit_data {
            let data = ExposureData {
                exposure_id: exposure_id.clone(),
                intersection_ratio: ratio,
                duration,
                is_first_exposure: is_first,
                extra: None,
            };
            self.base.emit(
                PartialEvent::new(EventType::Exposure, format!("exposure_{}", exposure_id))
                    .with_data(EventData::Exposure(data))
                    .with_target(element_info(window, node)),
            );
        }
    }
}
