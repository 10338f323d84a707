//! The collector capability and the shared install/uninstall bookkeeping.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tracker_core::PartialEvent;
use tracker_host::{ListenerId, TimerId, Window};

/// Callback a collector emits partial events through.
pub type EmitFn = Arc<dyn Fn(PartialEvent) + Send + Sync>;

/// A pluggable signal source.
///
/// `install` is idempotent: a second install on an installed collector is a
/// no-op. `uninstall` releases every listener, timer, and hook the collector
/// took; nothing may outlive it.
pub trait Collector: Send + Sync {
    /// Stable collector name, used as the registry key.
    fn name(&self) -> &'static str;

    fn install(&self, window: &Window, emit: EmitFn);

    fn uninstall(&self);

    fn pause(&self);

    fn resume(&self);

    /// Invoked by the tracker on SPA navigation so per-page state re-arms.
    fn on_page_change(&self) {}

    /// Downcast support for typed collector lookup.
    fn as_any(&self) -> &dyn Any;
}

/// Shared install/pause/emit bookkeeping embedded by every collector.
pub struct CollectorBase {
    name: &'static str,
    installed: AtomicBool,
    paused: AtomicBool,
    window: Mutex<Option<Window>>,
    emit: Mutex<Option<EmitFn>>,
    listeners: Mutex<Vec<ListenerId>>,
    timers: Mutex<Vec<TimerId>>,
}

impl CollectorBase {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            installed: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            window: Mutex::new(None),
            emit: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            timers: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Marks the collector installed; false when it already was.
    pub fn begin_install(&self, window: &Window, emit: EmitFn) -> bool {
        if self.installed.swap(true, Ordering::SeqCst) {
            debug!(collector = self.name, "install skipped: already installed");
            return false;
        }
        *self.window.lock() = Some(window.clone());
        *self.emit.lock() = Some(emit);
        true
    }

    /// Releases every tracked listener and timer and clears install state.
    pub fn uninstall(&self) {
        if !self.installed.swap(false, Ordering::SeqCst) {
            return;
        }
        let window = self.window.lock().take();
        if let Some(window) = window {
            for id in self.listeners.lock().drain(..) {
                window.remove_listener(id);
            }
            for id in self.timers.lock().drain(..) {
                window.clear_timer(id);
            }
        }
        *self.emit.lock() = None;
        self.paused.store(false, Ordering::SeqCst);
        debug!(collector = self.name, "uninstalled");
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Installed and not paused.
    pub fn is_active(&self) -> bool {
        self.installed.load(Ordering::SeqCst) && !self.paused.load(Ordering::SeqCst)
    }

    pub fn window(&self) -> Option<Window> {
        self.window.lock().clone()
    }

    pub fn track_listener(&self, id: ListenerId) {
        self.listeners.lock().push(id);
    }

    pub fn track_timer(&self, id: TimerId) {
        self.timers.lock().push(id);
    }

    pub fn untrack_timer(&self, id: TimerId) {
        self.timers.lock().retain(|&t| t != id);
    }

    /// Forwards a partial event to the tracker; dropped while paused.
    pub fn emit(&self, event: PartialEvent) {
        if !self.is_active() {
            return;
        }
        let emit = self.emit.lock().clone();
        if let Some(emit) = emit {
            emit(event);
        }
    }
}
