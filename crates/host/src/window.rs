//! The window: listener registry, timers, location/history, navigator,
//! storage handles, and the simulation surface an embedder drives.
//!
//! Dispatch is synchronous and never holds the document or registry locks
//! across a callback, so a handler may emit further signals or mutate
//! listeners without deadlocking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use tracker_core::{Error, Rect, Result, RouteInfo};

use crate::clock::{Clock, ManualClock, SharedClock, SystemClock};
use crate::dom::{Document, ElementData, NodeId};
use crate::performance::{NavigationTiming, PerformanceEntry, PerformanceEntryKind};
use crate::signal::{
    ClickSignalKind, HistoryOp, InputKind, PointerDetail, RejectionReason, Signal, SignalKind,
};
use crate::storage::{MemoryStorage, SharedStorage};

/// Handle to a registered listener.
pub type ListenerId = u64;
/// Handle to a scheduled timer.
pub type TimerId = u64;

type ListenerFn = Arc<dyn Fn(&Signal) + Send + Sync>;
type TimerFn = Arc<dyn Fn() + Send + Sync>;
type HistoryHookFn = Arc<dyn Fn(&HistoryOp) + Send + Sync>;

struct ListenerEntry {
    id: ListenerId,
    kinds: Vec<SignalKind>,
    callback: ListenerFn,
}

struct TimerEntry {
    id: TimerId,
    deadline: i64,
    interval: Option<i64>,
    callback: TimerFn,
}

/// Immutable navigator facts configured at build time.
#[derive(Debug, Clone)]
pub struct NavigatorInfo {
    pub user_agent: String,
    pub language: String,
    pub platform: String,
    pub timezone: String,
    pub max_touch_points: u32,
    pub is_mobile: bool,
    pub network_effective_type: Option<String>,
    pub device_memory: Option<f64>,
    pub hardware_concurrency: Option<u32>,
}

struct HistoryState {
    entries: Vec<String>,
    index: usize,
}

struct WindowInner {
    document: RwLock<Document>,
    href: Mutex<String>,
    title: Mutex<String>,
    referrer: Mutex<Option<String>>,
    navigator: NavigatorInfo,
    online: AtomicBool,
    screen: (u32, u32),
    viewport: Mutex<(u32, u32)>,
    device_pixel_ratio: f64,
    scroll: Mutex<(f64, f64)>,
    page_size: Mutex<(f64, f64)>,
    visibility_hidden: AtomicBool,
    load_complete: AtomicBool,
    clock: SharedClock,
    manual_clock: Option<Arc<ManualClock>>,
    session_storage: SharedStorage,
    local_storage: SharedStorage,
    listeners: Mutex<Vec<ListenerEntry>>,
    next_listener_id: AtomicU64,
    timers: Mutex<Vec<TimerEntry>>,
    next_timer_id: AtomicU64,
    history: Mutex<HistoryState>,
    history_hook: Mutex<Option<HistoryHookFn>>,
    route: Mutex<Option<RouteInfo>>,
    navigation_timing: Mutex<Option<NavigationTiming>>,
    performance_buffer: Mutex<Vec<PerformanceEntry>>,
    intersections: Mutex<HashMap<NodeId, f64>>,
}

/// Cheaply cloneable window handle.
#[derive(Clone)]
pub struct Window {
    inner: Arc<WindowInner>,
}

/// Builder for a window; defaults model a desktop browser tab.
pub struct WindowBuilder {
    url: String,
    title: String,
    referrer: Option<String>,
    navigator: NavigatorInfo,
    screen: (u32, u32),
    viewport: (u32, u32),
    device_pixel_ratio: f64,
    page_size: (f64, f64),
    manual_clock_start: Option<i64>,
    session_storage: Option<SharedStorage>,
    local_storage: Option<SharedStorage>,
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self {
            url: "https://example.com/".to_string(),
            title: "Example".to_string(),
            referrer: None,
            navigator: NavigatorInfo {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
                language: "en-US".to_string(),
                platform: "Linux x86_64".to_string(),
                timezone: "UTC".to_string(),
                max_touch_points: 0,
                is_mobile: false,
                network_effective_type: Some("4g".to_string()),
                device_memory: Some(8.0),
                hardware_concurrency: Some(8),
            },
            screen: (1920, 1080),
            viewport: (1280, 800),
            device_pixel_ratio: 1.0,
            page_size: (1280.0, 800.0),
            manual_clock_start: None,
            session_storage: None,
            local_storage: None,
        }
    }
}

impl WindowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.navigator.user_agent = ua.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.navigator.language = language.into();
        self
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen = (width, height);
        self
    }

    pub fn with_page_size(mut self, width: f64, height: f64) -> Self {
        self.page_size = (width, height);
        self
    }

    pub fn with_touch(mut self, max_touch_points: u32, is_mobile: bool) -> Self {
        self.navigator.max_touch_points = max_touch_points;
        self.navigator.is_mobile = is_mobile;
        self
    }

    /// Use a manually advanced clock starting at `start_ms`.
    pub fn with_manual_clock(mut self, start_ms: i64) -> Self {
        self.manual_clock_start = Some(start_ms);
        self
    }

    pub fn with_session_storage(mut self, storage: SharedStorage) -> Self {
        self.session_storage = Some(storage);
        self
    }

    pub fn with_local_storage(mut self, storage: SharedStorage) -> Self {
        self.local_storage = Some(storage);
        self
    }

    pub fn build(self) -> Window {
        let (clock, manual_clock): (SharedClock, Option<Arc<ManualClock>>) =
            match self.manual_clock_start {
                Some(start) => {
                    let manual = Arc::new(ManualClock::new(start));
                    (manual.clone(), Some(manual))
                }
                None => (Arc::new(SystemClock), None),
            };

        Window {
            inner: Arc::new(WindowInner {
                document: RwLock::new(Document::new()),
                history: Mutex::new(HistoryState {
                    entries: vec![self.url.clone()],
                    index: 0,
                }),
                href: Mutex::new(self.url),
                title: Mutex::new(self.title),
                referrer: Mutex::new(self.referrer),
                navigator: self.navigator,
                online: AtomicBool::new(true),
                screen: self.screen,
                viewport: Mutex::new(self.viewport),
                device_pixel_ratio: self.device_pixel_ratio,
                scroll: Mutex::new((0.0, 0.0)),
                page_size: Mutex::new(self.page_size),
                visibility_hidden: AtomicBool::new(false),
                load_complete: AtomicBool::new(false),
                clock,
                manual_clock,
                session_storage: self
                    .session_storage
                    .unwrap_or_else(MemoryStorage::shared),
                local_storage: self.local_storage.unwrap_or_else(MemoryStorage::shared),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                timers: Mutex::new(Vec::new()),
                next_timer_id: AtomicU64::new(1),
                history_hook: Mutex::new(None),
                route: Mutex::new(None),
                navigation_timing: Mutex::new(None),
                performance_buffer: Mutex::new(Vec::new()),
                intersections: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl Window {
    pub fn builder() -> WindowBuilder {
        WindowBuilder::new()
    }

    // === Clock ===

    pub fn clock(&self) -> SharedClock {
        self.inner.clock.clone()
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    // === Document ===

    pub fn document(&self) -> RwLockReadGuard<'_, Document> {
        self.inner.document.read_recursive()
    }

    /// Direct mutable access; mutations through this guard do not emit
    /// `DomMutation` — use `append_element`/`remove_element` for that.
    pub fn document_mut(&self) -> RwLockWriteGuard<'_, Document> {
        self.inner.document.write()
    }

    /// Appends an element and emits a `DomMutation` signal.
    pub fn append_element(&self, parent: NodeId, data: ElementData) -> NodeId {
        let id = self.inner.document.write().append_child(parent, data);
        self.emit(Signal::DomMutation {
            added: vec![id],
            removed: Vec::new(),
        });
        id
    }

    /// Removes an element and emits a `DomMutation` signal.
    pub fn remove_element(&self, node: NodeId) {
        self.inner.document.write().remove(node);
        self.inner.intersections.lock().remove(&node);
        self.emit(Signal::DomMutation {
            added: Vec::new(),
            removed: vec![node],
        });
    }

    // === Location / navigator / dimensions ===

    pub fn href(&self) -> String {
        self.inner.href.lock().clone()
    }

    pub fn title(&self) -> String {
        self.inner.title.lock().clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        *self.inner.title.lock() = title.into();
    }

    pub fn referrer(&self) -> Option<String> {
        self.inner.referrer.lock().clone()
    }

    pub fn navigator(&self) -> &NavigatorInfo {
        &self.inner.navigator
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    pub fn screen(&self) -> (u32, u32) {
        self.inner.screen
    }

    pub fn viewport(&self) -> (u32, u32) {
        *self.inner.viewport.lock()
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.inner.device_pixel_ratio
    }

    pub fn scroll_position(&self) -> (f64, f64) {
        *self.inner.scroll.lock()
    }

    /// Full page size (scrollWidth, scrollHeight).
    pub fn page_size(&self) -> (f64, f64) {
        *self.inner.page_size.lock()
    }

    pub fn set_page_size(&self, width: f64, height: f64) {
        *self.inner.page_size.lock() = (width, height);
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.visibility_hidden.load(Ordering::SeqCst)
    }

    pub fn is_load_complete(&self) -> bool {
        self.inner.load_complete.load(Ordering::SeqCst)
    }

    // === Storage ===

    pub fn session_storage(&self) -> SharedStorage {
        self.inner.session_storage.clone()
    }

    pub fn local_storage(&self) -> SharedStorage {
        self.inner.local_storage.clone()
    }

    // === Router back-pointer ===

    pub fn route(&self) -> Option<RouteInfo> {
        self.inner.route.lock().clone()
    }

    pub fn set_route(&self, route: Option<RouteInfo>) {
        *self.inner.route.lock() = route;
    }

    // === Listeners ===

    pub fn add_listener(
        &self,
        kinds: &[SignalKind],
        callback: impl Fn(&Signal) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().push(ListenerEntry {
            id,
            kinds: kinds.to_vec(),
            callback: Arc::new(callback),
        });
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Delivers a signal to every matching listener. Callbacks run outside
    /// the registry lock.
    pub fn emit(&self, signal: Signal) {
        let kind = signal.kind();
        let callbacks: Vec<ListenerFn> = {
            let listeners = self.inner.listeners.lock();
            listeners
                .iter()
                .filter(|l| l.kinds.contains(&kind))
                .map(|l| l.callback.clone())
                .collect()
        };
        for callback in callbacks {
            callback(&signal);
        }
    }

    // === Timers ===

    pub fn set_timeout(&self, delay_ms: u64, callback: impl Fn() + Send + Sync + 'static) -> TimerId {
        self.schedule(delay_ms, None, Arc::new(callback))
    }

    pub fn set_interval(
        &self,
        interval_ms: u64,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> TimerId {
        let interval = interval_ms.max(1) as i64;
        self.schedule(interval_ms.max(1), Some(interval), Arc::new(callback))
    }

    fn schedule(&self, delay_ms: u64, interval: Option<i64>, callback: TimerFn) -> TimerId {
        let id = self.inner.next_timer_id.fetch_add(1, Ordering::SeqCst);
        let deadline = self.now_ms() + delay_ms as i64;
        self.inner.timers.lock().push(TimerEntry {
            id,
            deadline,
            interval,
            callback,
        });
        id
    }

    pub fn clear_timer(&self, id: TimerId) -> bool {
        let mut timers = self.inner.timers.lock();
        let before = timers.len();
        timers.retain(|t| t.id != id);
        timers.len() != before
    }

    /// Fires every timer whose deadline has passed, in deadline order.
    /// Callbacks run outside the timer lock.
    pub fn fire_due_timers(&self) {
        loop {
            let now = self.now_ms();
            let due: Option<TimerFn> = {
                let mut timers = self.inner.timers.lock();
                let idx = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= now)
                    .min_by_key(|(_, t)| t.deadline)
                    .map(|(i, _)| i);
                match idx {
                    Some(i) => {
                        if let Some(interval) = timers[i].interval {
                            timers[i].deadline = now + interval;
                            Some(timers[i].callback.clone())
                        } else {
                            Some(timers.swap_remove(i).callback)
                        }
                    }
                    None => None,
                }
            };
            match due {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    /// Advances a manual clock by `delta_ms`, firing timers at each deadline
    /// along the way. Errors under a system clock.
    pub fn advance(&self, delta_ms: i64) -> Result<()> {
        let manual = self
            .inner
            .manual_clock
            .clone()
            .ok_or_else(|| Error::host("advance requires a manual clock"))?;
        let target = manual.now_ms() + delta_ms;
        loop {
            let next_deadline = {
                let timers = self.inner.timers.lock();
                timers
                    .iter()
                    .map(|t| t.deadline)
                    .filter(|&d| d <= target)
                    .min()
            };
            match next_deadline {
                Some(deadline) => {
                    if deadline > manual.now_ms() {
                        manual.set(deadline);
                    }
                    self.fire_due_timers();
                }
                None => break,
            }
        }
        manual.set(target);
        Ok(())
    }

    /// Spawns a background driver that fires due timers on a short tick.
    /// Only needed under a system clock.
    pub fn spawn_timer_driver(&self) -> tokio::task::JoinHandle<()> {
        let window = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(10));
            loop {
                ticker.tick().await;
                window.fire_due_timers();
            }
        })
    }

    // === History ===

    /// Installs the history hook. Fails when one is already installed
    /// (double-wrap guard).
    pub fn install_history_hook(
        &self,
        hook: impl Fn(&HistoryOp) + Send + Sync + 'static,
    ) -> Result<()> {
        let mut slot = self.inner.history_hook.lock();
        if slot.is_some() {
            return Err(Error::host("history hook already installed"));
        }
        *slot = Some(Arc::new(hook));
        Ok(())
    }

    pub fn clear_history_hook(&self) {
        *self.inner.history_hook.lock() = None;
    }

    pub fn has_history_hook(&self) -> bool {
        self.inner.history_hook.lock().is_some()
    }

    fn resolve_url(&self, input: &str) -> String {
        if url::Url::parse(input).is_ok() {
            return input.to_string();
        }
        let current = self.href();
        match url::Url::parse(&current).and_then(|base| base.join(input)) {
            Ok(joined) => joined.to_string(),
            Err(e) => {
                warn!(url = input, error = %e, "failed to resolve URL, using as-is");
                input.to_string()
            }
        }
    }

    /// Simulates `history.pushState`: updates the location and invokes the
    /// installed hook. No signal is emitted — the host fires no event for
    /// programmatic pushes, which is exactly why the hook contract exists.
    pub fn push_state(&self, url: &str) {
        let resolved = self.resolve_url(url);
        let prev = {
            let mut href = self.inner.href.lock();
            let prev = href.clone();
            *href = resolved.clone();
            prev
        };
        {
            let mut history = self.inner.history.lock();
            let index = history.index;
            history.entries.truncate(index + 1);
            history.entries.push(resolved.clone());
            history.index += 1;
        }
        self.invoke_history_hook(HistoryOp::Push {
            url: resolved,
            prev_url: prev,
        });
    }

    /// Simulates `history.replaceState`.
    pub fn replace_state(&self, url: &str) {
        let resolved = self.resolve_url(url);
        let prev = {
            let mut href = self.inner.href.lock();
            let prev = href.clone();
            *href = resolved.clone();
            prev
        };
        {
            let mut history = self.inner.history.lock();
            let index = history.index;
            history.entries[index] = resolved.clone();
        }
        self.invoke_history_hook(HistoryOp::Replace {
            url: resolved,
            prev_url: prev,
        });
    }

    fn invoke_history_hook(&self, op: HistoryOp) {
        let hook = self.inner.history_hook.lock().clone();
        if let Some(hook) = hook {
            hook(&op);
        }
    }

    /// Simulates the back button: moves the history index and emits
    /// `PopState`.
    pub fn back(&self) {
        let url = {
            let mut history = self.inner.history.lock();
            if history.index == 0 {
                return;
            }
            history.index -= 1;
            history.entries[history.index].clone()
        };
        *self.inner.href.lock() = url.clone();
        self.emit(Signal::PopState { url });
    }

    /// Changes the location fragment and emits `HashChange`.
    pub fn set_hash(&self, hash: &str) {
        let old_url = self.href();
        let fragment = hash.trim_start_matches('#');
        let new_url = match url::Url::parse(&old_url) {
            Ok(mut u) => {
                u.set_fragment(if fragment.is_empty() {
                    None
                } else {
                    Some(fragment)
                });
                u.to_string()
            }
            Err(_) => format!("{}#{}", old_url, fragment),
        };
        if new_url == old_url {
            return;
        }
        *self.inner.href.lock() = new_url.clone();
        self.emit(Signal::HashChange { old_url, new_url });
    }

    // === Interaction simulation ===

    /// Click at the center of the element.
    pub fn click(&self, target: NodeId) {
        let (x, y) = self.document().rect(target).center();
        self.click_at(target, x, y);
    }

    pub fn click_at(&self, target: NodeId, x: f64, y: f64) {
        self.click_with(target, x, y, 0, ClickSignalKind::Single, false, false, false, false);
    }

    pub fn dbl_click(&self, target: NodeId) {
        let (x, y) = self.document().rect(target).center();
        self.click_with(target, x, y, 0, ClickSignalKind::Double, false, false, false, false);
    }

    pub fn context_click(&self, target: NodeId) {
        let (x, y) = self.document().rect(target).center();
        self.click_with(target, x, y, 2, ClickSignalKind::Context, false, false, false, false);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn click_with(
        &self,
        target: NodeId,
        x: f64,
        y: f64,
        button: u8,
        kind: ClickSignalKind,
        alt: bool,
        ctrl: bool,
        meta: bool,
        shift: bool,
    ) {
        let rect = self.document().rect(target);
        let (scroll_left, scroll_top) = self.scroll_position();
        let detail = PointerDetail {
            x,
            y,
            page_x: x + scroll_left,
            page_y: y + scroll_top,
            offset_x: x - rect.x,
            offset_y: y - rect.y,
            button,
            alt,
            ctrl,
            meta,
            shift,
        };
        self.emit(Signal::Click {
            target,
            detail,
            kind,
        });
    }

    /// Scrolls the window and emits a `Scroll` signal.
    pub fn scroll_to(&self, left: f64, top: f64) {
        *self.inner.scroll.lock() = (left, top);
        self.emit(Signal::Scroll { left, top });
    }

    /// Sets a field's value and emits an `Input` signal.
    pub fn input(&self, target: NodeId, value: &str) {
        self.inner.document.write().set_value(target, value);
        self.emit(Signal::Input {
            target,
            kind: InputKind::Input,
        });
    }

    /// Emits a `Change` signal for the field.
    pub fn change(&self, target: NodeId) {
        self.emit(Signal::Input {
            target,
            kind: InputKind::Change,
        });
    }

    /// Emits a form `Submit` signal.
    pub fn submit(&self, target: NodeId) {
        self.emit(Signal::Submit { target });
    }

    // === Error simulation ===

    pub fn report_js_error(
        &self,
        message: &str,
        filename: Option<&str>,
        lineno: Option<u32>,
        colno: Option<u32>,
        stack: Option<&str>,
    ) {
        self.emit(Signal::JsError {
            message: message.to_string(),
            filename: filename.map(str::to_string),
            lineno,
            colno,
            stack: stack.map(str::to_string),
        });
    }

    pub fn report_unhandled_rejection(&self, reason: RejectionReason) {
        self.emit(Signal::UnhandledRejection { reason });
    }

    pub fn fail_resource(&self, target: NodeId) {
        self.emit(Signal::ResourceError { target });
    }

    // === Performance ===

    pub fn set_navigation_timing(&self, timing: NavigationTiming) {
        *self.inner.navigation_timing.lock() = Some(timing);
    }

    pub fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.inner.navigation_timing.lock().clone()
    }

    /// Appends an entry to the buffered timeline and notifies listeners.
    pub fn emit_performance(&self, entry: PerformanceEntry) {
        self.inner.performance_buffer.lock().push(entry.clone());
        self.emit(Signal::Performance(entry));
    }

    /// Buffered entries of the given kinds, for `buffered: true` observers.
    pub fn buffered_performance(&self, kinds: &[PerformanceEntryKind]) -> Vec<PerformanceEntry> {
        self.inner
            .performance_buffer
            .lock()
            .iter()
            .filter(|e| kinds.contains(&e.kind()))
            .cloned()
            .collect()
    }

    /// Marks the load event fired and emits `Load`.
    pub fn finish_load(&self) {
        self.inner.load_complete.store(true, Ordering::SeqCst);
        self.emit(Signal::Load);
    }

    // === Lifecycle / connectivity ===

    pub fn set_visibility_hidden(&self, hidden: bool) {
        self.inner.visibility_hidden.store(hidden, Ordering::SeqCst);
        self.emit(Signal::VisibilityChange { hidden });
    }

    pub fn page_hide(&self) {
        self.emit(Signal::PageHide);
    }

    pub fn before_unload(&self) {
        self.emit(Signal::BeforeUnload);
    }

    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        self.emit(if online { Signal::Online } else { Signal::Offline });
    }

    // === Intersections ===

    /// Records the element's intersection ratio and emits a signal.
    pub fn set_intersection(&self, target: NodeId, ratio: f64) {
        self.inner.intersections.lock().insert(target, ratio);
        self.emit(Signal::Intersection {
            target,
            ratio,
            is_intersecting: ratio > 0.0,
        });
    }

    /// Last observed intersection ratio for the element.
    pub fn intersection_ratio(&self, target: NodeId) -> Option<f64> {
        self.inner.intersections.lock().get(&target).copied()
    }

    /// Convenience for tests: append under `<body>`.
    pub fn append_to_body(&self, data: ElementData) -> NodeId {
        let body = self.document().body();
        self.append_element(body, data)
    }

    /// Convenience for tests: element rect lookup.
    pub fn rect_of(&self, node: NodeId) -> Rect {
        self.document().rect(node)
    }
}
