//! Scroll collector: throttled depth tracking with one-shot thresholds.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use tracker_core::util::{Throttle, ThrottleDecision};
use tracker_core::{EventData, EventType, PartialEvent, ScrollConfig, ScrollData, ScrollDirection};
use tracker_host::{Signal, SignalKind, TimerId, Window};

use crate::base::{Collector, CollectorBase, EmitFn};

pub const SCROLL_COLLECTOR: &str = "scroll";

struct ScrollInner {
    throttle: Throttle,
    crossed: HashSet<u8>,
    last_pos: (f64, f64),
    latest: (f64, f64),
    trailing_timer: Option<TimerId>,
}

struct ScrollShared {
    base: CollectorBase,
    config: ScrollConfig,
    inner: Mutex<ScrollInner>,
}

/// Collector for scroll-depth milestones.
pub struct ScrollCollector {
    shared: Arc<ScrollShared>,
}

impl ScrollCollector {
    pub fn new(config: ScrollConfig) -> Self {
        let throttle_ms = config.throttle_ms;
        Self {
            shared: Arc::new(ScrollShared {
                base: CollectorBase::new(SCROLL_COLLECTOR),
                config,
                inner: Mutex::new(ScrollInner {
                    throttle: Throttle::new(throttle_ms),
                    crossed: HashSet::new(),
                    last_pos: (0.0, 0.0),
                    latest: (0.0, 0.0),
                    trailing_timer: None,
                }),
            }),
        }
    }

    /// Re-arms every depth threshold; called on SPA navigation.
    pub fn reset_depths(&self) {
        let mut inner = self.shared.inner.lock();
        inner.crossed.clear();
        inner.last_pos = (0.0, 0.0);
    }
}

impl Collector for ScrollCollector {
    fn name(&self) -> &'static str {
        SCROLL_COLLECTOR
    }

    fn install(&self, window: &Window, emit: EmitFn) {
        if !self.shared.base.begin_install(window, emit) {
            return;
        }
        let shared = self.shared.clone();
        let win = window.clone();
        let id = window.add_listener(&[SignalKind::Scroll], move |signal| {
            if let Signal::Scroll { left, top } = signal {
                ScrollShared::handle_scroll(&shared, &win, *left, *top);
            }
        });
        self.shared.base.track_listener(id);
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

    fn on_page_change(&self) {
        self.reset_depths();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ScrollShared {
    fn handle_scroll(this: &Arc<Self>, window: &Window, left: f64, top: f64) {
        if !this.base.is_active() {
            return;
        }
        let now = window.now_ms();
        let decision = {
            let mut inner = this.inner.lock();
            inner.latest = (left, top);
            inner.throttle.call(now)
        };
        match decision {
            ThrottleDecision::Fire => this.sample(window, left, top),
            ThrottleDecision::Trailing(deadline) => {
                let mut inner = this.inner.lock();
                if inner.trailing_timer.is_none() {
                    let shared = this.clone();
                    let win = window.clone();
                    let delay = (deadline - now).max(1) as u64;
                    let id =
                        window.set_timeout(delay, move || Self::fire_trailing(&shared, &win));
                    inner.trailing_timer = Some(id);
                    this.base.track_timer(id);
                }
            }
        }
    }

    fn fire_trailing(this: &Arc<Self>, window: &Window) {
        let latest = {
            let mut inner = this.inner.lock();
            if let Some(id) = inner.trailing_timer.take() {
                this.base.untrack_timer(id);
            }
            if !inner.throttle.poll(window.now_ms()) {
                return;
            }
            inner.latest
        };
        this.sample(window, latest.0, latest.1);
    }

    /// Computes the depth, derives direction, and emits when a new threshold
    /// is crossed.
    fn sample(&self, window: &Window, left: f64, top: f64) {
        let (_, viewport_h) = window.viewport();
        let (_, page_h) = window.page_size();
        let viewport_h = viewport_h as f64;

        let scrollable = page_h - viewport_h;
        let depth: u8 = if scrollable <= 0.0 {
            // Page shorter than the viewport counts as fully scrolled.
            100
        } else {
            ((top / scrollable * 100.0).round() as i64).clamp(0, 100) as u8
        };

        let (newly_crossed, direction) = {
            let mut inner = self.inner.lock();
            let (last_left, last_top) = inner.last_pos;
            let dx = left - last_left;
            let dy = top - last_top;
            let direction = if dy.abs() >= dx.abs() {
                if dy >= 0.0 {
                    ScrollDirection::Down
                } else {
                    ScrollDirection::Up
                }
            } else if dx >= 0.0 {
                ScrollDirection::Right
            } else {
                ScrollDirection::Left
            };
            inner.last_pos = (left, top);

            let mut newly: Vec<u8> = self
                .config
                .depth_thresholds
                .iter()
                .copied()
                .filter(|t| depth >= *t && !inner.crossed.contains(t))
                .collect();
            newly.sort_unstable();
            for t in &newly {
                inner.crossed.insert(*t);
            }
            (newly, direction)
        };

        if newly_crossed.is_empty() {
            return;
        }

        let data = ScrollData {
            depth,
            direction,
            top,
            left,
            thresholds_crossed: newly_crossed,
            viewport_height: viewport_h,
            page_height: page_h,
        };
        self.base.emit(
            PartialEvent::new(EventType::Scroll, format!("scroll_depth_{}", depth))
                .with_data(EventData::Scroll(data)),
        );
    }
}
