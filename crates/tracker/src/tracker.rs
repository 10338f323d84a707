//! The tracker: event intake, enrichment, sampling, dedup, queueing, and
//! lifecycle wiring.
//!
//! Collectors hand partial events to `handle_event` synchronously; shipping
//! happens on the flush task. User hooks are isolated so a panicking hook
//! drops its event instead of crashing the host.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use tracker_collectors::{
    ClickCollector, Collector, ErrorCollector, ExposureCollector, InputCollector,
    NavigationCollector, PerformanceCollector, ScrollCollector,
};
use tracker_core::limits::DEDUP_SET_CAPACITY;
use tracker_core::util::ids;
use tracker_core::util::sampling::{consistent_sample, should_sample};
use tracker_core::util::{DedupSet, EventQueue};
use tracker_core::{
    DeviceInfo, Error, EventData, EventPriority, EventType, NavigationTrigger, PageContext,
    PageLeaveData, PageViewData, PartialEvent, Result, TrackEvent, TrackerOptions,
};
use tracker_host::{ListenerId, Signal, SignalKind, Window};
use tracker_transport::{
    BatchEnvelope, OfflineBuffer, ReqwestClient, RetryPolicy, SharedHttpClient, Transport,
    TransportRequest,
};

use crate::device::capture_device_info;
use crate::session::SessionManager;
use crate::stats::{StatsSnapshot, TrackerStats};

struct PageCounters {
    enter_time: i64,
    click_count: u32,
    max_scroll_depth: u8,
    leave_sent: bool,
    referrer: Option<String>,
}

struct TrackerShared {
    window: Window,
    options: RwLock<TrackerOptions>,
    collectors: Mutex<IndexMap<String, Arc<dyn Collector>>>,
    queue: Mutex<EventQueue<TrackEvent>>,
    dedup: Mutex<DedupSet>,
    session: SessionManager,
    page_id: Mutex<String>,
    device: Mutex<Option<DeviceInfo>>,
    page: Mutex<PageCounters>,
    installed: AtomicBool,
    unloading: AtomicBool,
    is_flushing: AtomicBool,
    flush_notify: Notify,
    stats: TrackerStats,
    transport: Transport,
    offline: OfflineBuffer,
    listener_ids: Mutex<Vec<ListenerId>>,
    flush_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// The coordinator owning collectors, the queue, and the transport.
#[derive(Clone)]
pub struct Tracker {
    shared: Arc<TrackerShared>,
}

impl Tracker {
    /// Tracker with the production HTTP client.
    pub fn new(window: Window, options: TrackerOptions) -> Self {
        Self::with_http_client(window, options, ReqwestClient::shared())
    }

    /// Tracker with a custom HTTP client (tests use a mock).
    pub fn with_http_client(
        window: Window,
        options: TrackerOptions,
        client: SharedHttpClient,
    ) -> Self {
        let clock = window.clock();
        let now = clock.now_ms();
        let session = SessionManager::new(window.session_storage(), options.session_id.clone());
        let offline = OfflineBuffer::new(
            window.local_storage(),
            options.offline.clone(),
            clock.clone(),
        );
        let queue_capacity = options.max_events;
        Self {
            shared: Arc::new(TrackerShared {
                transport: Transport::new(client, clock),
                session,
                offline,
                queue: Mutex::new(EventQueue::new(queue_capacity)),
                dedup: Mutex::new(DedupSet::new(DEDUP_SET_CAPACITY)),
                page_id: Mutex::new(ids::page_id()),
                device: Mutex::new(None),
                page: Mutex::new(PageCounters {
                    enter_time: now,
                    click_count: 0,
                    max_scroll_depth: 0,
                    leave_sent: false,
                    referrer: None,
                }),
                installed: AtomicBool::new(false),
                unloading: AtomicBool::new(false),
                is_flushing: AtomicBool::new(false),
                flush_notify: Notify::new(),
                stats: TrackerStats::default(),
                options: RwLock::new(options),
                collectors: Mutex::new(IndexMap::new()),
                listener_ids: Mutex::new(Vec::new()),
                flush_task: Mutex::new(None),
                window,
            }),
        }
    }

    /// Wires collectors, rehydrates offline events, starts the flush task,
    /// and binds lifecycle listeners. No-op when disabled or already
    /// installed.
    pub fn install(&self) -> Result<()> {
        let shared = &self.shared;
        if !shared.options.read().enabled {
            debug!("tracker disabled, install skipped");
            return Ok(());
        }
        if shared.installed.swap(true, Ordering::SeqCst) {
            debug!("tracker already installed");
            return Ok(());
        }

        *shared.device.lock() = Some(capture_device_info(&shared.window));
        let session_id = shared.session.get_or_create();

        // Rehydrate offline events; expired entries were already dropped.
        shared.rehydrate_offline();

        self.install_builtin_collectors();
        self.bind_lifecycle_listeners();
        *shared.flush_task.lock() = spawn_flush_loop(shared);

        info!(
            session_id = session_id.as_str(),
            collectors = shared.collectors.lock().len(),
            "tracker installed"
        );

        if shared.options.read().auto_page_view {
            self.emit_initial_page_view();
        }
        Ok(())
    }

    /// Uninstalls collectors and lifecycle listeners and stops the flush
    /// task. The queue and dedup state survive for a later reinstall.
    pub fn uninstall(&self) {
        let shared = &self.shared;
        if !shared.installed.swap(false, Ordering::SeqCst) {
            return;
        }
        for (_, collector) in shared.collectors.lock().drain(..) {
            collector.uninstall();
        }
        for id in shared.listener_ids.lock().drain(..) {
            shared.window.remove_listener(id);
        }
        if let Some(task) = shared.flush_task.lock().take() {
            task.abort();
        }
        info!("tracker uninstalled");
    }

    fn emit_fn(&self) -> tracker_collectors::EmitFn {
        let shared = self.shared.clone();
        Arc::new(move |partial| {
            shared.handle_event(partial);
        })
    }

    fn install_builtin_collectors(&self) {
        let options = self.shared.options.read().clone();
        let mut to_install: Vec<Arc<dyn Collector>> = Vec::new();

        if options.auto_click {
            to_install.push(Arc::new(ClickCollector::new(
                options.click.clone(),
                &options.ignore_selectors,
            )));
        }
        if options.auto_scroll {
            to_install.push(Arc::new(ScrollCollector::new(options.scroll.clone())));
        }
        if options.auto_input {
            to_install.push(Arc::new(InputCollector::new(
                options.input.clone(),
                options.sensitive_fields.clone(),
                &options.ignore_selectors,
            )));
        }
        if options.auto_page_view {
            to_install.push(Arc::new(NavigationCollector::new()));
        }
        if options.auto_error {
            to_install.push(Arc::new(ErrorCollector::new(options.error.clone())));
        }
        if options.auto_performance {
            to_install.push(Arc::new(PerformanceCollector::new(
                options.performance.clone(),
                options.endpoint.clone(),
            )));
        }
        if options.auto_exposure {
            to_install.push(Arc::new(ExposureCollector::new(options.exposure.clone())));
        }

        for collector in to_install {
            self.register_collector(collector);
        }
    }

    /// Registers and installs a collector, wiring its emission to the
    /// tracker.
    pub fn register_collector(&self, collector: Arc<dyn Collector>) {
        collector.install(&self.shared.window, self.emit_fn());
        let name = collector.name().to_string();
        if let Some(previous) = self
            .shared
            .collectors
            .lock()
            .insert(name.clone(), collector)
        {
            warn!(collector = name.as_str(), "replaced existing collector");
            previous.uninstall();
        }
    }

    /// Uninstalls and removes a collector by name.
    pub fn remove_collector(&self, name: &str) -> bool {
        match self.shared.collectors.lock().shift_remove(name) {
            Some(collector) => {
                collector.uninstall();
                true
            }
            None => false,
        }
    }

    /// Runs `f` against the typed collector, if registered.
    pub fn with_collector<C: 'static, R>(&self, name: &str, f: impl FnOnce(&C) -> R) -> Option<R> {
        let collector = self.shared.collectors.lock().get(name).cloned()?;
        collector.as_any().downcast_ref::<C>().map(f)
    }

    fn bind_lifecycle_listeners(&self) {
        let shared = self.shared.clone();
        let id = self.shared.window.add_listener(
            &[
                SignalKind::VisibilityChange,
                SignalKind::PageHide,
                SignalKind::BeforeUnload,
                SignalKind::Online,
            ],
            move |signal| match signal {
                Signal::VisibilityChange { hidden: true } | Signal::PageHide
                | Signal::BeforeUnload => {
                    shared.on_unload_signal();
                }
                Signal::Online => {
                    debug!("back online, scheduling flush");
                    shared.rehydrate_offline();
                    shared.flush_notify.notify_one();
                }
                _ => {}
            },
        );
        self.shared.listener_ids.lock().push(id);
    }

    fn emit_initial_page_view(&self) {
        let window = &self.shared.window;
        let url = window.href();
        let (path, query) = match url::Url::parse(&url) {
            Ok(u) => (
                u.path().to_string(),
                u.query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
            ),
            Err(_) => ("/".to_string(), BTreeMap::new()),
        };
        let data = PageViewData {
            referrer: window.referrer(),
            path,
            query,
            trigger: NavigationTrigger::Initial,
            title: Some(window.title()),
        };
        self.shared.handle_event(
            PartialEvent::new(EventType::PageView, "page_view")
                .with_data(EventData::PageView(data)),
        );
    }

    // === Programmatic API ===

    /// Tracks a custom event.
    pub fn track(&self, name: &str, data: Option<Value>) {
        self.track_with(name, data, None, None);
    }

    /// Tracks an event with an explicit type and/or priority.
    pub fn track_with(
        &self,
        name: &str,
        data: Option<Value>,
        event_type: Option<EventType>,
        priority: Option<EventPriority>,
    ) {
        let mut partial = PartialEvent::new(event_type.unwrap_or(EventType::Custom), name);
        if let Some(properties) = data {
            partial = partial.with_data(EventData::Custom { properties });
        }
        partial.priority = priority;
        self.shared.handle_event(partial);
    }

    /// Explicit page view; rotates the page id like a SPA navigation.
    pub fn track_page_view(&self, extra: Option<Value>) {
        let window = &self.shared.window;
        let url = window.href();
        let (path, query) = match url::Url::parse(&url) {
            Ok(u) => (
                u.path().to_string(),
                u.query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
            ),
            Err(_) => ("/".to_string(), BTreeMap::new()),
        };
        let data = PageViewData {
            referrer: Some(url.clone()),
            path,
            query,
            trigger: NavigationTrigger::Manual,
            title: Some(window.title()),
        };
        let mut partial = PartialEvent::new(EventType::PageView, "page_view")
            .with_data(EventData::PageView(data));
        if let Some(Value::Object(map)) = extra {
            for (k, v) in map {
                partial.properties.insert(k, v);
            }
        }
        self.shared.handle_event(partial);
    }

    /// Page-leave summary: duration, max scroll depth, click count. Emitted
    /// once per page, at Immediate priority.
    pub fn track_page_leave(&self) {
        self.shared.track_page_leave();
    }

    pub fn set_user_id(&self, user_id: Option<String>) {
        self.shared.options.write().user_id = user_id;
    }

    /// Merges properties attached to every subsequent event.
    pub fn set_global_properties(&self, properties: BTreeMap<String, Value>) {
        self.shared
            .options
            .write()
            .global_properties
            .extend(properties);
    }

    /// Applies a partial options update.
    pub fn update_options(&self, f: impl FnOnce(&mut TrackerOptions)) {
        let mut options = self.shared.options.write();
        f(&mut options);
    }

    /// Drains the queue and ships one batch.
    pub async fn flush(&self) -> Result<usize> {
        let prefer_beacon = self.shared.unloading.load(Ordering::SeqCst);
        flush_inner(&self.shared, prefer_beacon).await
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().size()
    }

    pub fn session_id(&self) -> String {
        self.shared.session.get_or_create()
    }

    pub fn page_id(&self) -> String {
        self.shared.page_id.lock().clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn window(&self) -> &Window {
        &self.shared.window
    }
}

impl TrackerShared {
    /// The collector-facing intake path; synchronous and non-blocking.
    fn handle_event(&self, partial: PartialEvent) {
        if !self.installed.load(Ordering::SeqCst) {
            return;
        }
        let event_type = partial.event_type.unwrap_or(EventType::Custom);

        // SPA navigation rotates the page id before the event is built so
        // the page view belongs to the new page.
        if event_type == EventType::PageView {
            if let Some(EventData::PageView(data)) = &partial.data {
                if data.trigger != NavigationTrigger::Initial {
                    self.rotate_page(data.referrer.clone());
                }
            }
        }

        if !self.sampling_decision(event_type) {
            self.stats.events_sampled_out.inc();
            debug!(event_type = event_type.as_str(), "event sampled out");
            return;
        }

        let (event, hooks, batch_size) = {
            let options = self.options.read();
            let event = self.build_event(&options, partial, event_type);
            (event, options.hooks.clone(), options.batch_size)
        };

        if let Err(e) = event.validate_required() {
            self.stats.events_rejected_invalid.inc();
            warn!(error = %e, "event rejected after enrichment");
            return;
        }

        // `before_track` may drop; `transform_event` may rewrite. Both are
        // isolated so a panicking hook cannot take the host down.
        let event = match hooks.before_track.as_ref() {
            Some(hook) => {
                let hook = hook.clone();
                match catch_unwind(AssertUnwindSafe(move || hook(event))) {
                    Ok(Some(event)) => event,
                    Ok(None) => {
                        self.stats.events_dropped_by_hook.inc();
                        return;
                    }
                    Err(_) => {
                        error!("beforeTrack hook panicked, dropping event");
                        self.stats.events_dropped_by_hook.inc();
                        return;
                    }
                }
            }
            None => event,
        };
        let event = match hooks.transform_event.as_ref() {
            Some(hook) => {
                let hook = hook.clone();
                let fallback = event.clone();
                match catch_unwind(AssertUnwindSafe(move || hook(event))) {
                    Ok(event) => event,
                    Err(_) => {
                        error!("transformEvent hook panicked, keeping original event");
                        fallback
                    }
                }
            }
            None => event,
        };

        {
            let dedup = self.dedup.lock();
            if dedup.contains(&event.id) {
                self.stats.events_deduped.inc();
                debug!(id = event.id.as_str(), "duplicate event dropped");
                return;
            }
        }

        self.update_page_counters(&event);

        let priority = event.priority;
        let queue_len = {
            let mut queue = self.queue.lock();
            if !queue.enqueue(event.clone()) {
                // Lossy: the oldest event makes room for the newest.
                let dropped = queue.dequeue();
                self.stats.events_dropped_queue_full.inc();
                warn!(
                    dropped_id = dropped.map(|e| e.id).unwrap_or_default().as_str(),
                    "queue full, dropped oldest event"
                );
                queue.enqueue(event.clone());
            }
            queue.size()
        };
        self.stats.events_tracked.inc();

        if let Some(hook) = hooks.on_track.as_ref() {
            let hook = hook.clone();
            let for_hook = event.clone();
            if catch_unwind(AssertUnwindSafe(move || hook(&for_hook))).is_err() {
                error!("onTrack hook panicked");
            }
        }

        if priority == EventPriority::Immediate || queue_len >= batch_size {
            self.flush_notify.notify_one();
        }
    }

    fn sampling_decision(&self, event_type: EventType) -> bool {
        let options = self.options.read();
        let rate = if let Some(rate) = options.sample_rate {
            rate
        } else if options.sampling.enabled {
            options
                .sampling
                .rate_by_type
                .get(&event_type)
                .copied()
                .unwrap_or(options.sampling.rate)
        } else {
            return true;
        };
        match options.user_id.as_deref() {
            Some(user_id) if !user_id.is_empty() => consistent_sample(user_id, rate),
            _ => should_sample(rate),
        }
    }

    fn build_event(
        &self,
        options: &TrackerOptions,
        partial: PartialEvent,
        event_type: EventType,
    ) -> TrackEvent {
        let mut properties = options.global_properties.clone();
        properties.extend(partial.properties);

        let page = self.page.lock();
        TrackEvent {
            id: ids::event_id(),
            event_type,
            name: partial.name,
            timestamp: self.window.now_ms(),
            url: self.window.href(),
            session_id: self.session.get_or_create(),
            page_id: self.page_id.lock().clone(),
            title: Some(self.window.title()),
            data: partial.data,
            target: partial.target,
            user_id: options.user_id.clone(),
            device: self.device.lock().clone(),
            priority: partial.priority.unwrap_or_default(),
            retry_count: 0,
            properties,
            route: partial.route.or_else(|| self.window.route()),
            component: partial.component,
            page: Some(PageContext {
                enter_time: page.enter_time,
                referrer: page.referrer.clone(),
            }),
        }
    }

    fn update_page_counters(&self, event: &TrackEvent) {
        match &event.data {
            Some(EventData::Click(_)) => {
                self.page.lock().click_count += 1;
            }
            Some(EventData::Scroll(scroll)) => {
                let mut page = self.page.lock();
                page.max_scroll_depth = page.max_scroll_depth.max(scroll.depth);
            }
            _ => {}
        }
    }

    /// New page id, reset counters, fan out to collectors so per-page state
    /// (scroll thresholds) re-arms.
    fn rotate_page(&self, referrer: Option<String>) {
        let new_page_id = ids::page_id();
        *self.page_id.lock() = new_page_id.clone();
        {
            let mut page = self.page.lock();
            page.enter_time = self.window.now_ms();
            page.click_count = 0;
            page.max_scroll_depth = 0;
            page.leave_sent = false;
            page.referrer = referrer;
        }
        let collectors: Vec<Arc<dyn Collector>> =
            self.collectors.lock().values().cloned().collect();
        for collector in collectors {
            collector.on_page_change();
        }
        debug!(page_id = new_page_id.as_str(), "page rotated");
    }

    fn track_page_leave(&self) {
        let data = {
            let mut page = self.page.lock();
            if page.leave_sent {
                return;
            }
            page.leave_sent = true;
            PageLeaveData {
                duration: self.window.now_ms() - page.enter_time,
                max_scroll_depth: page.max_scroll_depth,
                click_count: page.click_count,
            }
        };
        self.handle_event(
            PartialEvent::new(EventType::PageLeave, "page_leave")
                .with_data(EventData::PageLeave(data))
                .with_priority(EventPriority::Immediate),
        );
    }

    /// Moves stashed offline events back into the queue, dropping expired
    /// ones on the way.
    fn rehydrate_offline(&self) {
        let rehydrated = self.offline.load();
        if rehydrated.is_empty() {
            return;
        }
        let total = rehydrated.len();
        let mut queue = self.queue.lock();
        let accepted = queue.enqueue_all(rehydrated);
        self.stats.events_rehydrated.inc_by(accepted as u64);
        if accepted < total {
            warn!(
                dropped = total - accepted,
                "queue full during offline rehydration"
            );
        }
    }

    fn on_unload_signal(&self) {
        self.unloading.store(true, Ordering::SeqCst);
        self.track_page_leave();
        self.flush_notify.notify_one();
    }
}

/// Resets the flushing flag when a flush path exits.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The flush contract: serialize-once, offline-aware, retry-backed.
async fn flush_inner(shared: &Arc<TrackerShared>, prefer_beacon: bool) -> Result<usize> {
    if shared.is_flushing.swap(true, Ordering::SeqCst) {
        debug!("flush already in progress");
        return Ok(0);
    }
    let _guard = FlushGuard(&shared.is_flushing);

    let (request, app_name, app_version, hooks) = {
        let options = shared.options.read();
        let request = options.endpoint.as_ref().map(|endpoint| TransportRequest {
            endpoint: endpoint.clone(),
            method: options.report_method,
            headers: options.headers.clone(),
            retry: RetryPolicy::from(&options.retry),
        });
        (
            request,
            options.app_name.clone(),
            options.app_version.clone(),
            options.hooks.clone(),
        )
    };

    if shared.queue.lock().is_empty() {
        return Ok(0);
    }
    let Some(request) = request else {
        // Events are handled (callbacks fired at track time) but never
        // shipped without an endpoint.
        return Ok(0);
    };

    // Drain, filtering anything already shipped in this process.
    let (events, queue_size_before) = {
        let mut queue = shared.queue.lock();
        let size = queue.size();
        let dedup = shared.dedup.lock();
        let events: Vec<TrackEvent> = queue
            .dequeue_all()
            .into_iter()
            .filter(|e| !dedup.contains(&e.id))
            .collect();
        (events, size)
    };
    if events.is_empty() {
        return Ok(0);
    }

    if !shared.window.is_online() {
        shared.offline.save(&events);
        shared
            .stats
            .events_persisted_offline
            .inc_by(events.len() as u64);
        debug!(count = events.len(), "offline, batch persisted");
        return Err(Error::Offline);
    }

    let envelope = BatchEnvelope::new(
        app_name,
        app_version,
        shared.session.get_or_create(),
        events.clone(),
        shared.window.now_ms(),
        queue_size_before as u32,
    );

    match shared.transport.send(&request, &envelope, prefer_beacon).await {
        Ok(()) => {
            {
                let mut dedup = shared.dedup.lock();
                for event in &events {
                    dedup.insert(event.id.clone());
                }
            }
            shared.stats.batches_shipped.inc();
            shared.stats.events_shipped.inc_by(events.len() as u64);
            if let Some(hook) = hooks.on_success.as_ref() {
                let hook = hook.clone();
                let shipped = events.clone();
                if catch_unwind(AssertUnwindSafe(move || hook(&shipped))).is_err() {
                    error!("onSuccess hook panicked");
                }
            }
            Ok(events.len())
        }
        Err(e) => {
            shared.stats.transport_failures.inc();
            shared.offline.save(&events);
            shared
                .stats
                .events_persisted_offline
                .inc_by(events.len() as u64);
            if let Some(hook) = hooks.on_error.as_ref() {
                let hook = hook.clone();
                let failed = events.clone();
                let err_text = e.to_string();
                if catch_unwind(AssertUnwindSafe(move || {
                    hook(&Error::transport(err_text), &failed)
                }))
                .is_err()
                {
                    error!("onError hook panicked");
                }
            }
            Err(e)
        }
    }
}

/// Periodic flush driven by `batch_interval_ms`, woken early by the notify
/// handle for Immediate/batch-size/lifecycle triggers.
fn spawn_flush_loop(shared: &Arc<TrackerShared>) -> Option<tokio::task::JoinHandle<()>> {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!("no async runtime, periodic flush disabled");
        return None;
    };
    let shared = shared.clone();
    Some(handle.spawn(async move {
        loop {
            let interval_ms = shared.options.read().batch_interval_ms.max(100);
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(interval_ms)) => {}
                _ = shared.flush_notify.notified() => {}
            }
            let prefer_beacon = shared.unloading.load(Ordering::SeqCst);
            if let Err(e) = flush_inner(&shared, prefer_beacon).await {
                debug!(error = %e, "scheduled flush failed");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tracker_transport::HttpClient;

    /// Records posted bodies; scripted statuses, defaulting to 200.
    pub struct RecordingClient {
        pub statuses: Mutex<Vec<u16>>,
        pub bodies: Mutex<Vec<String>>,
    }

    impl RecordingClient {
        pub fn ok() -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(Vec::new()),
                bodies: Mutex::new(Vec::new()),
            })
        }

        pub fn envelopes(&self) -> Vec<BatchEnvelope> {
            self.bodies
                .lock()
                .iter()
                .map(|b| serde_json::from_str(b).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn post_json(
            &self,
            _url: &str,
            _headers: &BTreeMap<String, String>,
            body: String,
            _keepalive: bool,
        ) -> Result<u16> {
            self.bodies.lock().push(body);
            let mut statuses = self.statuses.lock();
            Ok(if statuses.is_empty() {
                200
            } else {
                statuses.remove(0)
            })
        }

        async fn get(&self, _url: &str) -> Result<u16> {
            Ok(200)
        }

        fn beacon(&self, _url: &str, body: String) -> bool {
            self.bodies.lock().push(body);
            true
        }
    }

    fn options() -> TrackerOptions {
        TrackerOptions {
            endpoint: Some("https://t.example/ingest".into()),
            auto_page_view: false,
            auto_click: false,
            auto_scroll: false,
            auto_input: false,
            auto_error: false,
            auto_performance: false,
            auto_exposure: false,
            ..TrackerOptions::default()
        }
    }

    fn tracker_with(opts: TrackerOptions) -> (Tracker, Arc<RecordingClient>) {
        let window = Window::builder().with_manual_clock(1_000_000).build();
        let client = RecordingClient::ok();
        let tracker = Tracker::with_http_client(window, opts, client.clone());
        tracker.install().unwrap();
        (tracker, client)
    }

    #[tokio::test]
    async fn test_track_and_flush() {
        let (tracker, client) = tracker_with(options());
        tracker.track("signup_started", Some(serde_json::json!({"plan": "pro"})));
        assert_eq!(tracker.queue_len(), 1);

        let shipped = tracker.flush().await.unwrap();
        assert_eq!(shipped, 1);
        assert_eq!(tracker.queue_len(), 0);

        let envelopes = client.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].events[0].name, "signup_started");
        assert_eq!(envelopes[0].events[0].session_id, tracker.session_id());
    }

    #[tokio::test]
    async fn test_disabled_tracker_is_inert() {
        let (tracker, client) = tracker_with(TrackerOptions {
            enabled: false,
            ..options()
        });
        tracker.track("ignored", None);
        assert_eq!(tracker.queue_len(), 0);
        tracker.flush().await.unwrap();
        assert!(client.bodies.lock().is_empty());
    }

    #[tokio::test]
    async fn test_no_endpoint_keeps_events_unshipped() {
        let (tracker, client) = tracker_with(TrackerOptions {
            endpoint: None,
            ..options()
        });
        tracker.track("local_only", None);
        let shipped = tracker.flush().await.unwrap();
        assert_eq!(shipped, 0);
        assert!(client.bodies.lock().is_empty());
    }

    #[tokio::test]
    async fn test_before_track_can_drop() {
        let mut opts = options();
        opts.hooks.before_track = Some(Arc::new(|event| {
            if event.name.starts_with("internal_") {
                None
            } else {
                Some(event)
            }
        }));
        let (tracker, _client) = tracker_with(opts);
        tracker.track("internal_ping", None);
        tracker.track("visible", None);
        assert_eq!(tracker.queue_len(), 1);
        assert_eq!(tracker.stats().events_dropped_by_hook, 1);
    }

    #[tokio::test]
    async fn test_transform_event_rewrites() {
        let mut opts = options();
        opts.hooks.transform_event = Some(Arc::new(|mut event| {
            event
                .properties
                .insert("env".into(), Value::String("staging".into()));
            event
        }));
        let (tracker, client) = tracker_with(opts);
        tracker.track("deploy", None);
        tracker.flush().await.unwrap();
        let envelopes = client.envelopes();
        assert_eq!(
            envelopes[0].events[0].properties["env"],
            Value::String("staging".into())
        );
    }

    #[tokio::test]
    async fn test_panicking_hook_drops_event_not_process() {
        let mut opts = options();
        opts.hooks.before_track = Some(Arc::new(|_| panic!("user bug")));
        let (tracker, _client) = tracker_with(opts);
        tracker.track("whatever", None);
        assert_eq!(tracker.queue_len(), 0);
        // The tracker keeps working afterwards.
        tracker.update_options(|o| o.hooks.before_track = None);
        tracker.track("fine", None);
        assert_eq!(tracker.queue_len(), 1);
    }

    #[tokio::test]
    async fn test_queue_overflow_drops_oldest() {
        let (tracker, _client) = tracker_with(TrackerOptions {
            max_events: 3,
            batch_size: 100,
            ..options()
        });
        for i in 0..5 {
            tracker.track(&format!("e{}", i), None);
        }
        assert_eq!(tracker.queue_len(), 3);
        assert_eq!(tracker.stats().events_dropped_queue_full, 2);
    }

    #[tokio::test]
    async fn test_offline_flush_persists_and_online_recovers() {
        let (tracker, client) = tracker_with(options());
        tracker.window().set_online(false);
        tracker.track("while_offline", None);
        let result = tracker.flush().await;
        assert!(matches!(result, Err(Error::Offline)));
        assert!(client.bodies.lock().is_empty());
        assert_eq!(tracker.stats().events_persisted_offline, 1);

        // Back online: rehydrate through a fresh install (new tab) and ship.
        let storage = tracker.window().local_storage();
        let window = Window::builder()
            .with_manual_clock(1_100_000)
            .with_local_storage(storage)
            .build();
        let client2 = RecordingClient::ok();
        let tracker2 = Tracker::with_http_client(window, options(), client2.clone());
        tracker2.install().unwrap();
        assert_eq!(tracker2.queue_len(), 1);
        let shipped = tracker2.flush().await.unwrap();
        assert_eq!(shipped, 1);
        assert_eq!(client2.envelopes()[0].events[0].name, "while_offline");
    }

    #[tokio::test]
    async fn test_transport_failure_persists_offline() {
        let (tracker, client) = tracker_with(TrackerOptions {
            retry: tracker_core::RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 1,
                use_exponential_backoff: false,
            },
            ..options()
        });
        client.statuses.lock().push(500);
        tracker.track("doomed", None);
        assert!(tracker.flush().await.is_err());
        assert_eq!(tracker.stats().events_persisted_offline, 1);
        assert_eq!(tracker.stats().transport_failures, 1);
    }

    #[tokio::test]
    async fn test_shipped_ids_never_repeat() {
        let (tracker, client) = tracker_with(options());
        tracker.track("a", None);
        tracker.flush().await.unwrap();
        let shipped_id = client.envelopes()[0].events[0].id.clone();

        // Force the same event back into the queue (simulated replay).
        let mut replay = client.envelopes()[0].events[0].clone();
        replay.retry_count = 1;
        tracker.shared.queue.lock().enqueue(replay);
        let shipped = tracker.flush().await.unwrap();
        assert_eq!(shipped, 0);
        assert_eq!(
            client
                .envelopes()
                .iter()
                .flat_map(|e| e.events.iter())
                .filter(|e| e.id == shipped_id)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_session_stable_page_rotates() {
        let mut opts = options();
        opts.auto_page_view = true;
        let window = Window::builder().with_manual_clock(1_000_000).build();
        let client = RecordingClient::ok();
        let tracker = Tracker::with_http_client(window.clone(), opts, client.clone());
        tracker.install().unwrap();

        let first_page = tracker.page_id();
        let session = tracker.session_id();
        window.push_state("/orders/42");
        assert_ne!(tracker.page_id(), first_page);
        assert_eq!(tracker.session_id(), session);

        tracker.flush().await.unwrap();
        let envelopes = client.envelopes();
        let events = &envelopes[0].events;
        // Initial page view plus the SPA one.
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.session_id == session));
        assert_ne!(events[0].page_id, events[1].page_id);
    }

    #[tokio::test]
    async fn test_page_leave_once_with_counters() {
        let (tracker, client) = tracker_with(options());
        tracker.window().advance(2500).unwrap();
        tracker.track_page_leave();
        tracker.track_page_leave();
        tracker.flush().await.unwrap();

        let envelopes = client.envelopes();
        let leaves: Vec<_> = envelopes
            .iter()
            .flat_map(|e| e.events.iter())
            .filter(|e| e.event_type == EventType::PageLeave)
            .collect();
        assert_eq!(leaves.len(), 1);
        match leaves[0].data.as_ref().unwrap() {
            EventData::PageLeave(d) => assert_eq!(d.duration, 2500),
            other => panic!("wrong payload: {:?}", other),
        }
        assert_eq!(leaves[0].priority, EventPriority::Immediate);
    }

    #[tokio::test]
    async fn test_sample_rate_zero_drops_all() {
        let (tracker, _client) = tracker_with(TrackerOptions {
            sample_rate: Some(0.0),
            ..options()
        });
        tracker.track("never", None);
        assert_eq!(tracker.queue_len(), 0);
        assert_eq!(tracker.stats().events_sampled_out, 1);
    }

    #[tokio::test]
    async fn test_consistent_sampling_by_user() {
        let mut opts = options();
        opts.sampling.enabled = true;
        opts.sampling.rate = 0.5;
        let (tracker, _client) = tracker_with(opts);

        // Find a user that samples in and one that samples out, then verify
        // stability across many events.
        let sampled_in = (0..200)
            .map(|i| format!("user-{}", i))
            .find(|u| tracker_core::util::sampling::consistent_sample(u, 0.5))
            .unwrap();
        tracker.set_user_id(Some(sampled_in));
        for _ in 0..10 {
            tracker.track("steady", None);
        }
        assert_eq!(tracker.queue_len(), 10);

        let sampled_out = (0..200)
            .map(|i| format!("user-{}", i))
            .find(|u| !tracker_core::util::sampling::consistent_sample(u, 0.5))
            .unwrap();
        tracker.set_user_id(Some(sampled_out));
        for _ in 0..10 {
            tracker.track("steady", None);
        }
        assert_eq!(tracker.queue_len(), 10);
    }

    #[tokio::test]
    async fn test_global_properties_attached() {
        let (tracker, client) = tracker_with(options());
        tracker.set_global_properties(BTreeMap::from([(
            "tenant".to_string(),
            Value::String("acme".into()),
        )]));
        tracker.track("anything", None);
        tracker.flush().await.unwrap();
        assert_eq!(
            client.envelopes()[0].events[0].properties["tenant"],
            Value::String("acme".into())
        );
    }

    #[tokio::test]
    async fn test_uninstall_removes_collectors_and_listeners() {
        let mut opts = options();
        opts.auto_click = true;
        let window = Window::builder().with_manual_clock(1_000_000).build();
        let client = RecordingClient::ok();
        let tracker = Tracker::with_http_client(window.clone(), opts, client.clone());
        tracker.install().unwrap();
        tracker.uninstall();

        let button = window.append_to_body(tracker_host::ElementData::new("button"));
        window.click(button);
        window.advance(300).unwrap();
        assert_eq!(tracker.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_install_idempotent() {
        let (tracker, _client) = tracker_with(options());
        tracker.install().unwrap();
        tracker.install().unwrap();
        tracker.track("once", None);
        assert_eq!(tracker.queue_len(), 1);
    }
}
