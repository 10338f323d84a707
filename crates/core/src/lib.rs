//! Core types, options, and utilities for the ldesign tracker SDK.

pub mod config;
pub mod data;
pub mod device;
pub mod element;
pub mod error;
pub mod event;
pub mod limits;
pub mod util;

pub use config::{
    ClickConfig, ErrorConfig, ExposureConfig, Hooks, InputConfig, OfflineConfig,
    PerformanceConfig, ReportMethod, RetryConfig, SamplingConfig, ScrollConfig, TrackerOptions,
};
pub use data::{
    ClickData, ClickType, ErrorData, ErrorKind, ErrorLevel, EventData, ExposureData, FieldType,
    FormSubmitData, InputData, InteractionType, ModifierFlags, NavigationTrigger, PageLeaveData,
    PageViewData, PerformanceData, ResourceTiming, ScrollData, ScrollDirection,
};
pub use device::DeviceInfo;
pub use element::{
    ComponentInfo, ElementInfo, FormFieldInfo, LinkInfo, LinkKind, ParentSummary, Rect,
    RegionInfo, RegionSource, RouteInfo,
};
pub use error::{Error, Result};
pub use event::{EventPriority, EventType, PageContext, PartialEvent, TrackEvent};
