//! Error collector: JS errors, unhandled rejections, resource-load failures.
//!
//! Candidates pass sampling, ignore-pattern, and dedup gates in that order.
//! The dedup window is bounded to 100 signatures with FIFO eviction.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use tracker_core::limits::{
    ERROR_DEDUP_CAPACITY, ERROR_SIGNATURE_MESSAGE_LEN, MAX_ERROR_MESSAGE_LEN, MAX_ERROR_STACK_LEN,
};
use tracker_core::util::sampling::should_sample;
use tracker_core::util::text::truncate_chars;
use tracker_core::util::DedupSet;
use tracker_core::{
    ErrorConfig, ErrorData, ErrorKind, ErrorLevel, EventData, EventPriority, EventType,
    PartialEvent,
};
use tracker_host::{NodeId, RejectionReason, Signal, SignalKind, Window};

use crate::base::{Collector, CollectorBase, EmitFn};

pub const ERROR_COLLECTOR: &str = "error";

/// Tags whose load failures are captured.
const RESOURCE_TAGS: [&str; 7] = ["img", "script", "link", "video", "audio", "source", "iframe"];

/// A message test: substring or regex.
#[derive(Debug, Clone)]
pub enum IgnorePattern {
    Substring(String),
    Regex(regex::Regex),
}

impl IgnorePattern {
    fn matches(&self, message: &str) -> bool {
        match self {
            Self::Substring(s) => message.contains(s.as_str()),
            Self::Regex(re) => re.is_match(message),
        }
    }
}

fn builtin_patterns() -> Vec<IgnorePattern> {
    [
        "Script error",
        "ResizeObserver loop",
        "Loading chunk",
        "Network request failed",
    ]
    .iter()
    .map(|s| IgnorePattern::Substring(s.to_string()))
    .collect()
}

/// Options for `capture_exception`.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    pub level: Option<ErrorLevel>,
    pub component_name: Option<String>,
    pub extra: Option<serde_json::Value>,
}

struct ErrorInner {
    patterns: Vec<IgnorePattern>,
    dedup: DedupSet,
}

struct ErrorShared {
    base: CollectorBase,
    sample_rate: f64,
    inner: Mutex<ErrorInner>,
}

/// Collector for error signals and programmatic captures.
pub struct ErrorCollector {
    shared: Arc<ErrorShared>,
}

impl ErrorCollector {
    pub fn new(config: ErrorConfig) -> Self {
        let mut patterns = builtin_patterns();
        patterns.extend(
            config
                .ignore_patterns
                .iter()
                .map(|s| IgnorePattern::Substring(s.clone())),
        );
        Self {
            shared: Arc::new(ErrorShared {
                base: CollectorBase::new(ERROR_COLLECTOR),
                sample_rate: config.sample_rate,
                inner: Mutex::new(ErrorInner {
                    patterns,
                    dedup: DedupSet::new(ERROR_DEDUP_CAPACITY),
                }),
            }),
        }
    }

    pub fn add_ignore_pattern(&self, pattern: IgnorePattern) {
        self.shared.inner.lock().patterns.push(pattern);
    }

    /// Reports a handled exception through the normal gate pipeline.
    pub fn capture_exception(&self, message: &str, stack: Option<&str>, opts: CaptureOptions) {
        let data = ErrorData {
            error_type: ErrorKind::Js,
            message: message.to_string(),
            stack: stack.map(str::to_string),
            filename: None,
            lineno: None,
            colno: None,
            level: opts.level.unwrap_or_default(),
            component_name: opts.component_name,
            resource_url: None,
            resource_tag: None,
            handled: true,
            extra: opts.extra,
        };
        self.shared.process(data);
    }

    pub fn capture_message(&self, message: &str, level: ErrorLevel) {
        let data = ErrorData {
            error_type: ErrorKind::Js,
            message: message.to_string(),
            stack: None,
            filename: None,
            lineno: None,
            colno: None,
            level,
            component_name: None,
            resource_url: None,
            resource_tag: None,
            handled: true,
            extra: None,
        };
        self.shared.process(data);
    }
}

impl Collector for ErrorCollector {
    fn name(&self) -> &'static str {
        ERROR_COLLECTOR
    }

    fn install(&self, window: &Window, emit: EmitFn) {
        if !self.shared.base.begin_install(window, emit) {
            return;
        }
        let shared = self.shared.clone();
        let win = window.clone();
        let id = window.add_listener(
            &[
                SignalKind::JsError,
                SignalKind::UnhandledRejection,
                SignalKind::ResourceError,
            ],
            move |signal| match signal {
                Signal::JsError {
                    message,
                    filename,
                    lineno,
                    colno,
                    stack,
                } => shared.handle_js_error(message, filename.as_deref(), *lineno, *colno, stack.as_deref()),
                Signal::UnhandledRejection { reason } => shared.handle_rejection(reason),
                Signal::ResourceError { target } => shared.handle_resource_error(&win, *target),
                _ => {}
            },
        );
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

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorShared {
    fn handle_js_error(
        &self,
        message: &str,
        filename: Option<&str>,
        lineno: Option<u32>,
        colno: Option<u32>,
        stack: Option<&str>,
    ) {
        self.process(ErrorData {
            error_type: ErrorKind::Js,
            message: message.to_string(),
            stack: stack.map(str::to_string),
            filename: filename.map(str::to_string),
            lineno,
            colno,
            level: ErrorLevel::Error,
            component_name: None,
            resource_url: None,
            resource_tag: None,
            handled: false,
            extra: None,
        });
    }

    fn handle_rejection(&self, reason: &RejectionReason) {
        let (message, stack) = match reason {
            RejectionReason::Error { message, stack } => (message.clone(), stack.clone()),
            RejectionReason::Text(text) => (text.clone(), None),
            RejectionReason::Value(value) => {
                (tracker_core::util::json::safe_stringify(value), None)
            }
        };
        self.process(ErrorData {
            error_type: ErrorKind::Promise,
            message,
            stack,
            filename: None,
            lineno: None,
            colno: None,
            level: ErrorLevel::Error,
            component_name: None,
            resource_url: None,
            resource_tag: None,
            handled: false,
            extra: None,
        });
    }

    fn handle_resource_error(&self, window: &Window, target: NodeId) {
        let (tag, url) = {
            let doc = window.document();
            let tag = doc.tag(target).to_string();
            if !RESOURCE_TAGS.contains(&tag.as_str()) {
                return;
            }
            let url = doc
                .attr(target, "src")
                .or_else(|| doc.attr(target, "href"))
                .unwrap_or_default()
                .to_string();
            (tag, url)
        };
        self.process(ErrorData {
            error_type: ErrorKind::Resource,
            message: format!("Failed to load {}: {}", tag, url),
            stack: None,
            filename: None,
            lineno: None,
            colno: None,
            level: ErrorLevel::Error,
            component_name: None,
            resource_url: Some(url),
            resource_tag: Some(tag),
            handled: false,
            extra: None,
        });
    }

    /// Sampling, ignore patterns, and dedup, in that order; then truncation
    /// and emission.
    fn process(&self, mut data: ErrorData) {
        if !self.base.is_active() {
            return;
        }
        if !should_sample(self.sample_rate) {
            debug!("error dropped by sampling");
            return;
        }

        {
            let mut inner = self.inner.lock();
            if inner.patterns.iter().any(|p| p.matches(&data.message)) {
                debug!(message = data.message.as_str(), "error matches ignore pattern");
                return;
            }
            let signature = error_signature(&data);
            if !inner.dedup.insert(signature) {
                debug!("duplicate error suppressed");
                return;
            }
        }

        data.message = truncate_chars(&data.message, MAX_ERROR_MESSAGE_LEN);
        data.stack = data
            .stack
            .map(|s| truncate_chars(&s, MAX_ERROR_STACK_LEN));

        let name = format!("error_{}", data.error_type.as_str());
        self.base.emit(
            PartialEvent::new(EventType::Error, name)
                .with_data(EventData::Error(data))
                .with_priority(EventPriority::High),
        );
    }
}

/// Signature: type | first 100 message chars | filename | lineno | colno.
fn error_signature(data: &ErrorData) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}",
        data.error_type.as_str(),
        truncate_chars(&data.message, ERROR_SIGNATURE_MESSAGE_LEN),
        data.filename.as_deref().unwrap_or(""),
        data.lineno.unwrap_or(0),
        data.colno.unwrap_or(0),
    );
    format!("{:016x}", xxh3_64(key.as_bytes()))
}
