//! Navigation collector: SPA route-change detection.
//!
//! Three sources: `hashchange`, `popstate`, and the history hook standing in
//! for the push/replace wrappers. Uninstall restores the unhooked state.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use tracker_core::{EventData, EventType, NavigationTrigger, PageViewData, PartialEvent};
use tracker_host::{HistoryOp, Signal, SignalKind, Window};

use crate::base::{Collector, CollectorBase, EmitFn};

pub const NAVIGATION_COLLECTOR: &str = "navigation";

struct NavShared {
    base: CollectorBase,
    last_url: Mutex<String>,
    hook_installed: AtomicBool,
}

/// Collector for SPA navigation page views.
pub struct NavigationCollector {
    shared: Arc<NavShared>,
}

impl Default for NavigationCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationCollector {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(NavShared {
                base: CollectorBase::new(NAVIGATION_COLLECTOR),
                last_url: Mutex::new(String::new()),
                hook_installed: AtomicBool::new(false),
            }),
        }
    }

    /// Explicit page view, emitted regardless of URL change.
    pub fn track_page_view(&self) {
        if let Some(window) = self.shared.base.window() {
            let url = window.href();
            self.shared.emit_page_view(&window, url, NavigationTrigger::Manual, true);
        }
    }
}

impl Collector for NavigationCollector {
    fn name(&self) -> &'static str {
        NAVIGATION_COLLECTOR
    }

    fn install(&self, window: &Window, emit: EmitFn) {
        if !self.shared.base.begin_install(window, emit) {
            return;
        }
        *self.shared.last_url.lock() = window.href();

        let shared = self.shared.clone();
        let win = window.clone();
        let id = window.add_listener(
            &[SignalKind::HashChange, SignalKind::PopState],
            move |signal| match signal {
                Signal::HashChange { new_url, .. } => {
                    shared.emit_page_view(&win, new_url.clone(), NavigationTrigger::HashChange, false);
                }
                Signal::PopState { url } => {
                    shared.emit_page_view(&win, url.clone(), NavigationTrigger::PopState, false);
                }
                _ => {}
            },
        );
        self.shared.base.track_listener(id);

        let shared = self.shared.clone();
        let win = window.clone();
        match window.install_history_hook(move |op| {
            let (url, trigger) = match op {
                HistoryOp::Push { url, .. } => (url.clone(), NavigationTrigger::PushState),
                HistoryOp::Replace { url, .. } => (url.clone(), NavigationTrigger::ReplaceState),
            };
            shared.emit_page_view(&win, url, trigger, false);
        }) {
            Ok(()) => self.shared.hook_installed.store(true, Ordering::SeqCst),
            Err(e) => {
                // Another wrapper got there first; hash/popstate still work.
                warn!(error = %e, "history hook unavailable, push/replace navigations not observed");
            }
        }
    }

    fn uninstall(&self) {
        if self.shared.hook_installed.swap(false, Ordering::SeqCst) {
            if let Some(window) = self.shared.base.window() {
                window.clear_history_hook();
            }
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

impl NavShared {
    /// Emits a `page_view` when the URL actually changed (or on explicit
    /// calls), carrying the prior URL as referrer.
    fn emit_page_view(&self, window: &Window, url: String, trigger: NavigationTrigger, force: bool) {
        if !self.base.is_active() {
            return;
        }
        let referrer = {
            let mut last = self.last_url.lock();
            if *last == url && !force {
                debug!(url = url.as_str(), "navigation to same URL skipped");
                return;
            }
            std::mem::replace(&mut *last, url.clone())
        };

        let (path, query) = parse_url(&url);
        let data = PageViewData {
            referrer: if referrer.is_empty() {
                window.referrer()
            } else {
                Some(referrer)
            },
            path,
            query,
            trigger,
            title: Some(window.title()),
        };

        self.base.emit(
            PartialEvent::new(EventType::PageView, "page_view")
                .with_data(EventData::PageView(data)),
        );
    }
}

fn parse_url(input: &str) -> (String, BTreeMap<String, String>) {
    match url::Url::parse(input) {
        Ok(u) => {
            let query = u
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            (u.path().to_string(), query)
        }
        Err(_) => ("/".to_string(), BTreeMap::new()),
    }
}
