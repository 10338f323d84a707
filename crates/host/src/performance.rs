//! Performance timeline model: navigation timing and observer entries.

use serde::{Deserialize, Serialize};

/// Navigation timing marks, all ms relative to navigation start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub fetch_start: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
    pub dom_content_loaded_event_end: f64,
    pub load_event_end: f64,
}

impl NavigationTiming {
    /// Time to first byte.
    pub fn ttfb(&self) -> f64 {
        (self.response_start - self.request_start).max(0.0)
    }

    /// DNS lookup duration.
    pub fn dns(&self) -> f64 {
        (self.domain_lookup_end - self.domain_lookup_start).max(0.0)
    }

    /// TCP connect duration.
    pub fn tcp(&self) -> f64 {
        (self.connect_end - self.connect_start).max(0.0)
    }

    /// DOM Content Loaded relative to fetch start.
    pub fn dom_content_loaded(&self) -> f64 {
        (self.dom_content_loaded_event_end - self.fetch_start).max(0.0)
    }

    /// Load complete relative to fetch start.
    pub fn load_complete(&self) -> f64 {
        (self.load_event_end - self.fetch_start).max(0.0)
    }
}

/// Entry types observable on the performance timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceEntryKind {
    Paint,
    LargestContentfulPaint,
    FirstInput,
    LayoutShift,
    EventTiming,
    LongTask,
    Resource,
}

/// One performance timeline entry.
#[derive(Debug, Clone)]
pub enum PerformanceEntry {
    Paint {
        /// `first-paint` or `first-contentful-paint`.
        name: String,
        start_time: f64,
    },
    LargestContentfulPaint {
        start_time: f64,
    },
    FirstInput {
        name: String,
        start_time: f64,
        processing_start: f64,
    },
    LayoutShift {
        value: f64,
        had_recent_input: bool,
    },
    EventTiming {
        name: String,
        duration: f64,
    },
    LongTask {
        start_time: f64,
        duration: f64,
    },
    Resource {
        url: String,
        duration: f64,
        initiator: String,
        transfer_size: u64,
    },
}

impl PerformanceEntry {
    pub fn kind(&self) -> PerformanceEntryKind {
        match self {
            Self::Paint { .. } => PerformanceEntryKind::Paint,
            Self::LargestContentfulPaint { .. } => PerformanceEntryKind::LargestContentfulPaint,
            Self::FirstInput { .. } => PerformanceEntryKind::FirstInput,
            Self::LayoutShift { .. } => PerformanceEntryKind::LayoutShift,
            Self::EventTiming { .. } => PerformanceEntryKind::EventTiming,
            Self::LongTask { .. } => PerformanceEntryKind::LongTask,
            Self::Resource { .. } => PerformanceEntryKind::Resource,
        }
    }
}
