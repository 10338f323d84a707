//! Typed event payload variants.
//!
//! `EventData` is internally tagged so the offline buffer round-trips
//! losslessly; the tag is redundant with the event's `type` field but keeps
//! every payload self-describing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Scroll direction, derived from the dominant axis delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Kind of pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickType {
    Single,
    Double,
    Context,
}

/// Derived role of the interacted element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Button,
    Link,
    Input,
    Checkbox,
    Radio,
    Select,
    Textarea,
    Tab,
    Menuitem,
    /// Fallback when no more specific role applies.
    Element,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
            Self::Input => "input",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Select => "select",
            Self::Textarea => "textarea",
            Self::Tab => "tab",
            Self::Menuitem => "menuitem",
            Self::Element => "element",
        }
    }
}

/// Keyboard modifier flags at interaction time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierFlags {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

/// Click event payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClickData {
    /// Viewport coordinates.
    pub x: f64,
    pub y: f64,
    /// Page coordinates (viewport + scroll offset).
    pub page_x: f64,
    pub page_y: f64,
    /// Offset within the target element.
    pub offset_x: f64,
    pub offset_y: f64,
    /// Button index (0 left, 1 middle, 2 right).
    pub button: u8,
    pub button_name: String,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub click_type: ClickType,
    pub interaction_type: InteractionType,
    /// Visible label, truncated per limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub action_text: Option<String>,
    pub modifiers: ModifierFlags,
    /// Milliseconds since the previous click, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_since_last_click: Option<i64>,
}

/// Scroll event payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScrollData {
    /// Scroll depth as a percentage (0-100).
    #[validate(range(min = 0, max = 100))]
    pub depth: u8,
    pub direction: ScrollDirection,
    pub top: f64,
    pub left: f64,
    /// Depth thresholds newly crossed by this sample.
    pub thresholds_crossed: Vec<u8>,
    pub viewport_height: f64,
    pub page_height: f64,
}

/// Normalized form-field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Password,
    Number,
    Tel,
    Url,
    Search,
    Select,
    Checkbox,
    Radio,
    Textarea,
    File,
    Date,
    Hidden,
    Other,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Password => "password",
            Self::Number => "number",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Search => "search",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Textarea => "textarea",
            Self::File => "file",
            Self::Date => "date",
            Self::Hidden => "hidden",
            Self::Other => "other",
        }
    }

    /// Normalizes a tag/`type` attribute pair into a field type.
    pub fn from_element(tag: &str, type_attr: Option<&str>) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "select" => Self::Select,
            "textarea" => Self::Textarea,
            "input" => match type_attr.map(|t| t.to_ascii_lowercase()).as_deref() {
                None | Some("text") => Self::Text,
                Some("email") => Self::Email,
                Some("password") => Self::Password,
                Some("number") => Self::Number,
                Some("tel") => Self::Tel,
                Some("url") => Self::Url,
                Some("search") => Self::Search,
                Some("checkbox") => Self::Checkbox,
                Some("radio") => Self::Radio,
                Some("file") => Self::File,
                Some("date") | Some("datetime-local") | Some("month") | Some("week")
                | Some("time") => Self::Date,
                Some("hidden") => Self::Hidden,
                Some(_) => Self::Other,
            },
            _ => Self::Other,
        }
    }
}

/// Input event payload.
///
/// For sensitive fields the payload carries only the length and emptiness of
/// the value; the value itself never leaves the tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub field_type: FieldType,
    /// Truncated value; always absent for sensitive fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub value_length: usize,
    pub is_empty: bool,
    pub is_sensitive: bool,
}

/// Form submit payload. Field values are never captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmitData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub field_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// What caused a SPA navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationTrigger {
    #[serde(rename = "hashchange")]
    HashChange,
    #[serde(rename = "popstate")]
    PopState,
    #[serde(rename = "pushState")]
    PushState,
    #[serde(rename = "replaceState")]
    ReplaceState,
    #[serde(rename = "manual")]
    Manual,
    /// The automatic page view fired at tracker install.
    #[serde(rename = "initial")]
    Initial,
}

/// Page view payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    pub trigger: NavigationTrigger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Page leave payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLeaveData {
    /// Time spent on the page in milliseconds.
    pub duration: i64,
    pub max_scroll_depth: u8,
    pub click_count: u32,
}

/// Source of an error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Js,
    Promise,
    Resource,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Promise => "promise",
            Self::Resource => "resource",
        }
    }
}

/// Severity attached to captured errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    Info,
    Warning,
    #[default]
    Error,
    Fatal,
}

/// Error event payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub error_type: ErrorKind,
    /// Truncated per limits (500 chars).
    #[validate(length(max = 500))]
    pub message: String,
    /// Truncated per limits (2000 chars).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
    #[serde(default, skip_serializing_if = "is_default_level")]
    pub level: ErrorLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    /// For resource errors: the failing `src`/`href`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_tag: Option<String>,
    /// True when reported through `capture_exception`/`capture_message`.
    #[serde(default)]
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

fn is_default_level(level: &ErrorLevel) -> bool {
    *level == ErrorLevel::Error
}

/// One captured resource timing, query-stripped to origin + path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTiming {
    pub url: String,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_size: Option<u64>,
}

/// Performance report payload: navigation timing plus Web Vitals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    /// First Contentful Paint (ms).
    #[validate(range(min = 0.0, max = 60000.0))]
    pub fcp: Option<f64>,
    /// Largest Contentful Paint (ms), running last value.
    #[validate(range(min = 0.0, max = 60000.0))]
    pub lcp: Option<f64>,
    /// First Input Delay (ms).
    #[validate(range(min = 0.0, max = 10000.0))]
    pub fid: Option<f64>,
    /// Cumulative Layout Shift, rounded to 3 dp.
    #[validate(range(min = 0.0, max = 10.0))]
    pub cls: Option<f64>,
    /// Interaction to Next Paint (ms), max interaction duration.
    #[validate(range(min = 0.0, max = 60000.0))]
    pub inp: Option<f64>,
    /// Time to First Byte (ms).
    #[validate(range(min = 0.0, max = 60000.0))]
    pub ttfb: Option<f64>,
    /// DNS lookup time (ms).
    pub dns: Option<f64>,
    /// TCP connect time (ms).
    pub tcp: Option<f64>,
    /// DOM Content Loaded (ms).
    #[validate(range(min = 0.0, max = 120000.0))]
    pub dom_content_loaded: Option<f64>,
    /// Load Complete (ms).
    #[validate(range(min = 0.0, max = 300000.0))]
    pub load_complete: Option<f64>,
    #[serde(default)]
    pub long_task_count: u32,
    #[serde(default)]
    pub long_task_total: f64,
    #[serde(default)]
    pub long_task_max: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceTiming>,
    #[serde(default)]
    #[validate(range(max = 10000))]
    pub resource_count: u32,
}

/// Exposure event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureData {
    pub exposure_id: String,
    pub intersection_ratio: f64,
    /// Accumulated dwell time in milliseconds.
    pub duration: i64,
    pub is_first_exposure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Event payload variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventData {
    Click(ClickData),
    Scroll(ScrollData),
    Input(InputData),
    FormSubmit(FormSubmitData),
    PageView(PageViewData),
    PageLeave(PageLeaveData),
    Error(ErrorData),
    Performance(PerformanceData),
    Exposure(ExposureData),
    Custom { properties: Value },
}

impl EventData {
    /// Returns the payload kind as a string.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Click(_) => "click",
            Self::Scroll(_) => "scroll",
            Self::Input(_) => "input",
            Self::FormSubmit(_) => "form_submit",
            Self::PageView(_) => "page_view",
            Self::PageLeave(_) => "page_leave",
            Self::Error(_) => "error",
            Self::Performance(_) => "performance",
            Self::Exposure(_) => "exposure",
            Self::Custom { .. } => "custom",
        }
    }
}
