//! Element, component, route, and region records attached to events.
//!
//! PII contract: `ElementInfo.attributes` may only carry `data-track-*`
//! keys, and all free text is truncated per `limits`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::InteractionType;

/// Viewport-relative rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the rect.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Parent element summary: tag/id/class only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSummary {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
}

/// Link classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Anchor,
    Navigation,
    Download,
    Mailto,
    Tel,
}

/// Link details for `<a>` targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInfo {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// True when the href points off the current origin.
    pub external: bool,
    pub kind: LinkKind,
}

/// Form-field details for input-like targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub field_type: crate::data::FieldType,
    pub required: bool,
    pub disabled: bool,
}

/// How a region was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionSource {
    /// Explicit `data-region` attribute.
    Attribute,
    /// ARIA `role` attribute.
    Role,
    /// Semantic HTML5 landmark tag.
    Landmark,
}

/// Enclosing semantic region of an element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionInfo {
    pub name: String,
    pub source: RegionSource,
}

/// Framework component context derived from host back-pointers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    pub name: String,
    /// Top-down component chain, capped at 10 entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Scalar props only; sensitive keys dropped, strings truncated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, Value>,
}

/// Router state at emission time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    /// Matched component chain for the route.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,
}

/// Snapshot of a DOM element at emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Visible text, truncated to 100 chars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub xpath: String,
    /// CSS selector path.
    pub selector: String,
    pub rect: Rect,
    /// `data-track-*` attributes only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormFieldInfo>,
    pub interaction_type: InteractionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    /// Depth of the element in the DOM tree.
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_center() {
        let r = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(r.center(), (60.0, 40.0));
    }

    #[test]
    fn test_element_info_wire_shape() {
        let info = ElementInfo {
            tag: "button".into(),
            id: Some("pay".into()),
            classes: vec!["btn".into(), "primary".into()],
            text: Some("Pay".into()),
            xpath: "/html[1]/body[1]/button[1]".into(),
            selector: "#pay".into(),
            rect: Rect::new(100.0, 320.0, 40.0, 40.0),
            attributes: BTreeMap::from([("data-track-name".into(), "pay_submit".into())]),
            parent: None,
            component: None,
            link: None,
            form: None,
            interaction_type: InteractionType::Button,
            aria_label: None,
            depth: 3,
            region: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["interactionType"], "button");
        assert_eq!(json["attributes"]["data-track-name"], "pay_submit");
        // No free-form attribute capture slots exist on the wire.
        assert!(json.get("ariaLabel").is_none());
    }
}
