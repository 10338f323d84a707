//! Click collector: capture-phase pointer interactions.
//!
//! Single clicks are debounced so a double click emits exactly one event; a
//! re-entrancy guard stops recursive capture when the emit path itself
//! triggers click handling.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tracker_core::limits::{MAX_ACTION_TEXT_LEN, MAX_CLICKABLE_BUBBLE, MAX_LINK_TEXT_LEN};
use tracker_core::util::text::clean_text;
use tracker_core::util::Debounce;
use tracker_core::{
    ClickConfig, ClickData, ClickType, EventType, InteractionType, ModifierFlags, PartialEvent,
};
use tracker_host::{ClickSignalKind, PointerDetail, Selector, Signal, SignalKind, Window};

use crate::base::{Collector, CollectorBase, EmitFn};
use crate::element::{
    element_info, is_ignored_by_attribute, matches_ignore_selectors, parse_ignore_selectors,
};

pub const CLICK_COLLECTOR: &str = "click";

struct ClickInner {
    pending: Debounce<PartialEvent>,
    last_click_ms: Option<i64>,
    pending_timer: Option<tracker_host::TimerId>,
}

struct ClickShared {
    base: CollectorBase,
    config: ClickConfig,
    ignore_selectors: Vec<Selector>,
    processing: AtomicBool,
    inner: Mutex<ClickInner>,
}

/// Collector for click, double-click, and context-menu interactions.
pub struct ClickCollector {
    shared: Arc<ClickShared>,
}

impl ClickCollector {
    pub fn new(config: ClickConfig, ignore_selectors: &[String]) -> Self {
        let debounce_ms = config.debounce_ms;
        Self {
            shared: Arc::new(ClickShared {
                base: CollectorBase::new(CLICK_COLLECTOR),
                config,
                ignore_selectors: parse_ignore_selectors(ignore_selectors),
                processing: AtomicBool::new(false),
                inner: Mutex::new(ClickInner {
                    pending: Debounce::new(debounce_ms),
                    last_click_ms: None,
                    pending_timer: None,
                }),
            }),
        }
    }
}

impl Collector for ClickCollector {
    fn name(&self) -> &'static str {
        CLICK_COLLECTOR
    }

    fn install(&self, window: &Window, emit: EmitFn) {
        if !self.shared.base.begin_install(window, emit) {
            return;
        }
        let shared = self.shared.clone();
        let id = window.add_listener(&[SignalKind::Click], move |signal| {
            if let Signal::Click {
                target,
                detail,
                kind,
            } = signal
            {
                ClickShared::handle_click(&shared, *target, detail, *kind);
            }
        });
        self.shared.base.track_listener(id);
    }

    fn uninstall(&self) {
        self.shared.inner.lock().pending.cancel();
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

impl ClickShared {
    fn handle_click(
        this: &Arc<Self>,
        target: tracker_host::NodeId,
        detail: &PointerDetail,
        kind: ClickSignalKind,
    ) {
        if !this.base.is_active() {
            return;
        }
        // Recursive capture guard: tooling invoked from the emit path can
        // synthesize clicks of its own.
        if this.processing.swap(true, Ordering::SeqCst) {
            return;
        }
        Self::handle_click_guarded(this, target, detail, kind);
        this.processing.store(false, Ordering::SeqCst);
    }

    fn handle_click_guarded(
        this: &Arc<Self>,
        target: tracker_host::NodeId,
        detail: &PointerDetail,
        kind: ClickSignalKind,
    ) {
        let Some(window) = this.base.window() else {
            return;
        };

        match kind {
            ClickSignalKind::Double if !this.config.track_double_click => return,
            ClickSignalKind::Context if !this.config.track_context_menu => return,
            _ => {}
        }

        let resolved = {
            let doc = window.document();
            if is_ignored_by_attribute(&doc, target) {
                debug!("click ignored via data-track-ignore");
                return;
            }
            let resolved = if this.config.bubble_to_clickable {
                resolve_clickable(&doc, target)
            } else {
                target
            };
            if matches_ignore_selectors(&doc, target, &this.ignore_selectors)
                || matches_ignore_selectors(&doc, resolved, &this.ignore_selectors)
            {
                debug!("click ignored via ignore selector");
                return;
            }
            resolved
        };

        let now = window.now_ms();
        let time_since_last = {
            let mut inner = this.inner.lock();
            let since = inner.last_click_ms.map(|t| now - t);
            inner.last_click_ms = Some(now);
            since
        };

        let event = build_click_event(&window, resolved, detail, kind, time_since_last);

        match kind {
            ClickSignalKind::Single => Self::debounce_single(this, &window, now, event),
            ClickSignalKind::Double => {
                // A pending single click for this window is the first half of
                // the double click: cancel it and emit the double alone.
                let mut inner = this.inner.lock();
                inner.pending.cancel();
                if let Some(id) = inner.pending_timer.take() {
                    window.clear_timer(id);
                    this.base.untrack_timer(id);
                }
                drop(inner);
                this.base.emit(event);
            }
            ClickSignalKind::Context => this.base.emit(event),
        }
    }

    fn debounce_single(this: &Arc<Self>, window: &Window, now: i64, event: PartialEvent) {
        let mut inner = this.inner.lock();
        inner.pending.call(now, event);
        if inner.pending_timer.is_none() {
            let shared = this.clone();
            let win = window.clone();
            let delay = this.config.debounce_ms;
            let id = window.set_timeout(delay, move || Self::flush_pending(&shared, &win));
            inner.pending_timer = Some(id);
            this.base.track_timer(id);
        }
    }

    fn flush_pending(this: &Arc<Self>, window: &Window) {
        let (event, rearm_in) = {
            let mut inner = this.inner.lock();
            let now = window.now_ms();
            match inner.pending.poll(now) {
                Some(event) => {
                    if let Some(id) = inner.pending_timer.take() {
                        this.base.untrack_timer(id);
                    }
                    (Some(event), None)
                }
                None => {
                    // A later click restarted the window; re-arm for the
                    // remaining time.
                    let remaining = inner.pending.deadline().map(|d| (d - now).max(1) as u64);
                    if remaining.is_none() {
                        if let Some(id) = inner.pending_timer.take() {
                            this.base.untrack_timer(id);
                        }
                    }
                    (None, remaining)
                }
            }
        };
        if let Some(event) = event {
            this.base.emit(event);
        } else if let Some(delay) = rearm_in {
            let shared = this.clone();
            let win = window.clone();
            let id = window.set_timeout(delay, move || Self::flush_pending(&shared, &win));
            let mut inner = this.inner.lock();
            if let Some(old) = inner.pending_timer.replace(id) {
                this.base.untrack_timer(old);
            }
            this.base.track_timer(id);
        }
    }
}

/// Walks up at most 5 ancestors to find a clickable element; reports the
/// found element, not the raw target.
fn resolve_clickable(
    doc: &tracker_host::Document,
    target: tracker_host::NodeId,
) -> tracker_host::NodeId {
    let mut cur = Some(target);
    for _ in 0..=MAX_CLICKABLE_BUBBLE {
        match cur {
            Some(n) => {
                if crate::context::is_clickable(doc, n) {
                    return n;
                }
                cur = doc.parent(n);
            }
            None => break,
        }
    }
    target
}

fn button_name(button: u8) -> &'static str {
    match button {
        0 => "left",
        1 => "middle",
        2 => "right",
        _ => "other",
    }
}

fn action_text(window: &Window, node: tracker_host::NodeId, itype: InteractionType) -> Option<String> {
    let doc = window.document();
    if let Some(text) = doc.attr(node, "data-track-text") {
        return Some(text.to_string());
    }
    match itype {
        InteractionType::Link => doc.text(node).map(|t| clean_text(t, MAX_LINK_TEXT_LEN)),
        InteractionType::Input | InteractionType::Checkbox | InteractionType::Radio => {
            let value = doc.value(node);
            if value.is_empty() {
                None
            } else {
                Some(clean_text(value, MAX_ACTION_TEXT_LEN))
            }
        }
        _ => doc.text(node).map(|t| clean_text(t, MAX_ACTION_TEXT_LEN)),
    }
}

/// Event name: `data-track-name`, else `click_<itype>_<id>`, else
/// `click_<itype>_<tag>[_<firstClass>]`.
fn event_name(window: &Window, node: tracker_host::NodeId, itype: InteractionType) -> String {
    let doc = window.document();
    if let Some(name) = doc.attr(node, "data-track-name") {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    if let Some(id) = doc.id_attr(node) {
        return format!("click_{}_{}", itype.as_str(), id);
    }
    match doc.classes(node).first() {
        Some(class) => format!("click_{}_{}_{}", itype.as_str(), doc.tag(node), class),
        None => format!("click_{}_{}", itype.as_str(), doc.tag(node)),
    }
}

fn build_click_event(
    window: &Window,
    node: tracker_host::NodeId,
    detail: &PointerDetail,
    kind: ClickSignalKind,
    time_since_last: Option<i64>,
) -> PartialEvent {
    let target = element_info(window, node);
    let itype = target.interaction_type;
    let (vw, vh) = window.viewport();
    let (pw, ph) = window.page_size();

    let data = ClickData {
        x: detail.x,
        y: detail.y,
        page_x: detail.page_x,
        page_y: detail.page_y,
        offset_x: detail.offset_x,
        offset_y: detail.offset_y,
        button: detail.button,
        button_name: button_name(detail.button).to_string(),
        viewport_width: vw as f64,
        viewport_height: vh as f64,
        page_width: pw,
        page_height: ph,
        click_type: match kind {
            ClickSignalKind::Single => ClickType::Single,
            ClickSignalKind::Double => ClickType::Double,
            ClickSignalKind::Context => ClickType::Context,
        },
        interaction_type: itype,
        action_text: action_text(window, node, itype),
        modifiers: ModifierFlags {
            alt: detail.alt,
            ctrl: detail.ctrl,
            meta: detail.meta,
            shift: detail.shift,
        },
        time_since_last_click: time_since_last,
    };

    PartialEvent::new(EventType::Click, event_name(window, node, itype))
        .with_data(tracker_core::EventData::Click(data))
        .with_target(target)
}
