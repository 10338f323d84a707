//! ldesign tracker — client-side user-behavior telemetry SDK.
//!
//! Six collectors (click, scroll, input, navigation, error, performance,
//! exposure) observe a host [`Window`], emit partial events into the
//! [`Tracker`], which normalizes, samples, dedups, queues, and ships batches
//! to an ingest endpoint with retry and an offline buffer.
//!
//! ```no_run
//! use ldesign_tracker::{create_tracker, TrackerOptions, Window};
//!
//! # async fn run() -> ldesign_tracker::Result<()> {
//! let window = Window::builder()
//!     .with_url("https://shop.example/checkout")
//!     .build();
//! let tracker = create_tracker(
//!     window,
//!     TrackerOptions::with_endpoint("https://t.example/ingest"),
//! )?;
//! tracker.track("signup_started", None);
//! tracker.flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod logging;

pub use logging::{init_for_tracker, init_logging, LoggingConfig};

pub use tracker::{capture_device_info, SessionManager, StatsSnapshot, Tracker, TrackerStats};
pub use tracker_collectors::{
    CaptureOptions, ClickCollector, Collector, ErrorCollector, ExposureCollector, IgnorePattern,
    InputCollector, NavigationCollector, PerformanceCollector, ScrollCollector,
};
pub use tracker_core::{
    ClickData, ClickType, ComponentInfo, DeviceInfo, ElementInfo, Error, ErrorData, ErrorKind,
    ErrorLevel, EventData, EventPriority, EventType, ExposureData, FieldType, Hooks, InputData,
    InteractionType, NavigationTrigger, PageLeaveData, PageViewData, PartialEvent,
    PerformanceData, Rect, ReportMethod, Result, RouteInfo, ScrollData, ScrollDirection,
    TrackEvent, TrackerOptions,
};
pub use tracker_host::{
    ComponentInstance, Document, ElementData, ManualClock, MemoryStorage, NavigationTiming,
    NodeId, PerformanceEntry, RejectionReason, Signal, SignalKind, Storage, SystemClock, Window,
    WindowBuilder,
};
pub use tracker_transport::{BatchEnvelope, HttpClient, OfflineBuffer, ReqwestClient};

/// Creates a tracker bound to the window, initializes logging per the
/// `debug` option, and installs it.
pub fn create_tracker(window: Window, options: TrackerOptions) -> Result<Tracker> {
    logging::init_for_tracker(options.debug);
    let tracker = Tracker::new(window, options);
    tracker.install()?;
    Ok(tracker)
}
