//! Signal collectors for the ldesign tracker SDK.
//!
//! Each collector observes one facet of the host window and emits partial
//! events upward; the tracker owns normalization and shipping.

pub mod base;
pub mod click;
pub mod context;
pub mod element;
pub mod error;
pub mod exposure;
pub mod input;
pub mod navigation;
pub mod performance;
pub mod scroll;

pub use base::{Collector, CollectorBase, EmitFn};
pub use click::{ClickCollector, CLICK_COLLECTOR};
pub use element::element_info;
pub use error::{CaptureOptions, ErrorCollector, IgnorePattern, ERROR_COLLECTOR};
pub use exposure::{ExposureCollector, EXPOSURE_COLLECTOR};
pub use input::{InputCollector, INPUT_COLLECTOR};
pub use navigation::{NavigationCollector, NAVIGATION_COLLECTOR};
pub use performance::{PerformanceCollector, PERFORMANCE_COLLECTOR};
pub use scroll::{ScrollCollector, SCROLL_COLLECTOR};
