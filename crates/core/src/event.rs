//! The universal event record and its wire format.
//!
//! Events serialize camelCase with Unix-ms timestamps, matching what the
//! ingest side expects from browser SDKs. The typed payload lives in
//! [`crate::data::EventData`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::data::EventData;
use crate::device::DeviceInfo;
use crate::element::{ComponentInfo, ElementInfo, RouteInfo};
use crate::error::{Error, Result};

/// All supported event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    PageLeave,
    Click,
    Scroll,
    Input,
    FormSubmit,
    Navigation,
    Custom,
    Exposure,
    Error,
    Performance,
    Network,
}

impl EventType {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::PageLeave => "page_leave",
            Self::Click => "click",
            Self::Scroll => "scroll",
            Self::Input => "input",
            Self::FormSubmit => "form_submit",
            Self::Navigation => "navigation",
            Self::Custom => "custom",
            Self::Exposure => "exposure",
            Self::Error => "error",
            Self::Performance => "performance",
            Self::Network => "network",
        }
    }

}

/// Dispatch priority of an event.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Low,
    #[default]
    Normal,
    High,
    /// Triggers a flush as soon as the event is enqueued.
    Immediate,
}

fn is_normal_priority(p: &EventPriority) -> bool {
    *p == EventPriority::Normal
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Per-page context attached to events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    /// When the current logical page was entered (Unix ms).
    pub enter_time: i64,
    /// URL of the previous logical page, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// A single tracked event, fully enriched.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    /// Unique event ID (UUID v4).
    pub id: String,

    /// Event type.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Short event name, e.g. `click_button_pay`.
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Unix timestamp in milliseconds.
    pub timestamp: i64,

    /// Full page URL at emission time.
    #[validate(length(min = 1, max = 2048))]
    pub url: String,

    /// Per-tab session ID.
    pub session_id: String,

    /// Logical page ID, regenerated on SPA navigation.
    pub page_id: String,

    /// Page title.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub title: Option<String>,

    /// Typed event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,

    /// Target element snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementInfo>,

    /// Optional user ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 128))]
    pub user_id: Option<String>,

    /// Device info captured at tracker install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,

    /// Dispatch priority.
    #[serde(default, skip_serializing_if = "is_normal_priority")]
    pub priority: EventPriority,

    /// Transport retry count.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retry_count: u32,

    /// Arbitrary string-keyed properties (global properties land here).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,

    /// Route info from the host router, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteInfo>,

    /// Framework component context, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentInfo>,

    /// Per-page context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageContext>,
}

impl TrackEvent {
    /// Checks the required-field invariant: every emitted record carries
    /// `id`, `timestamp`, `type`, `name`, `url`, `sessionId`.
    pub fn validate_required(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::missing_field("id"));
        }
        if self.name.is_empty() {
            return Err(Error::missing_field("name"));
        }
        if self.url.is_empty() {
            return Err(Error::missing_field("url"));
        }
        if self.session_id.is_empty() {
            return Err(Error::missing_field("sessionId"));
        }
        if self.timestamp <= 0 {
            return Err(Error::validation("timestamp must be positive"));
        }
        self.validate()
            .map_err(|e| Error::validation(e.to_string()))?;
        Ok(())
    }
}

/// A partially populated event as emitted by a collector.
///
/// The tracker fills in id, timestamp, session/page ids, device info, and
/// global properties before the event enters the queue.
#[derive(Debug, Clone, Default)]
pub struct PartialEvent {
    pub event_type: Option<EventType>,
    pub name: String,
    pub data: Option<EventData>,
    pub target: Option<ElementInfo>,
    pub priority: Option<EventPriority>,
    pub component: Option<ComponentInfo>,
    pub route: Option<RouteInfo>,
    pub properties: BTreeMap<String, Value>,
}

impl PartialEvent {
    pub fn new(event_type: EventType, name: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_target(mut self, target: ElementInfo) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_component(mut self, component: ComponentInfo) -> Self {
        self.component = Some(component);
        self
    }

    pub fn with_route(mut self, route: RouteInfo) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_event() -> TrackEvent {
        TrackEvent {
            id: "550e8400-e29b-41d4-a716-446655440000".into(),
            event_type: EventType::Click,
            name: "click_button_pay".into(),
            timestamp: 1_700_000_000_000,
            url: "https://example.com/checkout".into(),
            session_id: "s-1".into(),
            page_id: "p-1".into(),
            title: None,
            data: None,
            target: None,
            user_id: None,
            device: None,
            priority: EventPriority::Normal,
            retry_count: 0,
            properties: BTreeMap::new(),
            route: None,
            component: None,
            page: None,
        }
    }

    #[test]
    fn test_event_type_strings() {
        assert_eq!(EventType::PageView.as_str(), "page_view");
        assert_eq!(EventType::FormSubmit.as_str(), "form_submit");
        assert_eq!(EventType::Exposure.as_str(), "exposure");
    }

    #[test]
    fn test_priority_ordering() {
        assert!(EventPriority::Immediate > EventPriority::High);
        assert!(EventPriority::High > EventPriority::Normal);
        assert!(EventPriority::Normal > EventPriority::Low);
    }

    #[test]
    fn test_validate_required() {
        assert!(valid_event().validate_required().is_ok());

        let mut e = valid_event();
        e.session_id = "".into();
        assert!(e.validate_required().is_err());

        let mut e = valid_event();
        e.name = "".into();
        assert!(e.validate_required().is_err());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::to_value(valid_event()).unwrap();
        assert!(json.get("sessionId").is_some());
        assert!(json.get("pageId").is_some());
        assert_eq!(json.get("type").unwrap(), "click");
        // Defaulted fields stay off the wire.
        assert!(json.get("priority").is_none());
        assert!(json.get("retryCount").is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut e = valid_event();
        e.priority = EventPriority::Immediate;
        e.properties
            .insert("plan".into(), Value::String("pro".into()));
        let json = serde_json::to_string(&e).unwrap();
        let back: TrackEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, e.id);
        assert_eq!(back.priority, EventPriority::Immediate);
        assert_eq!(back.properties["plan"], Value::String("pro".into()));
    }
}
