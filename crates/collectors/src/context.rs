//! DOM/framework context extraction: component chain, route, region, and
//! interaction type.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use tracker_core::limits::{
    MAX_COMPONENT_CHAIN_DEPTH, MAX_PROP_STRING_LEN, MAX_REGION_CLIMB,
};
use tracker_core::util::json::is_scalar;
use tracker_core::util::text::truncate_chars;
use tracker_core::{ComponentInfo, InteractionType, RegionInfo, RegionSource};
use tracker_host::{ComponentInstance, Document, NodeId};

/// Prop keys dropped from component props regardless of value.
const SENSITIVE_PROP_KEYS: [&str; 6] = ["password", "token", "secret", "key", "auth", "credential"];

static CLICKABLE_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(btn|button|link|clickable)\b").unwrap());

/// Resolves a component's display name: explicit name, else source file
/// basename.
fn component_name(instance: &ComponentInstance) -> Option<String> {
    if let Some(name) = &instance.name {
        if !name.is_empty() {
            return Some(name.clone());
        }
    }
    let file = instance.file.as_deref()?;
    let basename = file.rsplit(['/', '\\']).next()?;
    let stem = basename.split('.').next()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Scalar-only prop subset with sensitive keys dropped and strings truncated.
fn safe_props(props: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    for (key, value) in props {
        let lower = key.to_ascii_lowercase();
        if SENSITIVE_PROP_KEYS.iter().any(|s| lower.contains(s)) {
            continue;
        }
        if !is_scalar(value) {
            continue;
        }
        let value = match value {
            Value::String(s) => Value::String(truncate_chars(s, MAX_PROP_STRING_LEN)),
            other => other.clone(),
        };
        out.insert(key.clone(), value);
    }
    out
}

/// Best-effort component context from the element's back-pointer chain.
///
/// Walks ancestor-or-self nodes carrying a component instance and builds a
/// top-down chain capped at 10 entries. Absence of back-pointers yields
/// `None`, never an error.
pub fn component_info(doc: &Document, node: NodeId) -> Option<ComponentInfo> {
    let mut carriers: Vec<NodeId> = Vec::new();
    let mut cur = Some(node);
    while let Some(n) = cur {
        if doc.component(n).is_some() {
            carriers.push(n);
        }
        cur = doc.parent(n);
    }
    let nearest = *carriers.first()?;
    let instance = doc.component(nearest)?;
    let name = component_name(instance)?;

    // carriers is nearest-first; the chain reads top-down.
    let chain: Vec<String> = carriers
        .iter()
        .rev()
        .filter_map(|&n| doc.component(n).and_then(component_name))
        .take(MAX_COMPONENT_CHAIN_DEPTH)
        .collect();

    Some(ComponentInfo {
        name,
        chain,
        file: instance.file.clone(),
        props: safe_props(&instance.props),
    })
}

/// Enclosing semantic region: `data-region`, recognized `role`, or an HTML5
/// landmark tag, checked in that order while climbing at most 15 ancestors.
pub fn region_info(doc: &Document, node: NodeId) -> Option<RegionInfo> {
    let mut cur = Some(node);
    for _ in 0..=MAX_REGION_CLIMB {
        let n = cur?;
        if let Some(region) = doc.attr(n, "data-region") {
            if !region.is_empty() {
                return Some(RegionInfo {
                    name: region.to_string(),
                    source: RegionSource::Attribute,
                });
            }
        }
        if let Some(role) = doc.attr(n, "role") {
            if matches!(
                role,
                "banner" | "navigation" | "main" | "contentinfo" | "complementary"
            ) {
                return Some(RegionInfo {
                    name: role.to_string(),
                    source: RegionSource::Role,
                });
            }
        }
        let landmark = match doc.tag(n) {
            "header" => Some("banner"),
            "nav" => Some("navigation"),
            "main" => Some("main"),
            "footer" => Some("contentinfo"),
            "aside" => Some("complementary"),
            _ => None,
        };
        if let Some(name) = landmark {
            return Some(RegionInfo {
                name: name.to_string(),
                source: RegionSource::Landmark,
            });
        }
        cur = doc.parent(n);
    }
    None
}

/// Derives the interaction type: tag first, then role, then heuristics.
pub fn interaction_type(doc: &Document, node: NodeId) -> InteractionType {
    match doc.tag(node) {
        "a" => return InteractionType::Link,
        "button" => return InteractionType::Button,
        "select" => return InteractionType::Select,
        "textarea" => return InteractionType::Textarea,
        "input" => {
            return match doc.attr(node, "type").map(|t| t.to_ascii_lowercase()) {
                Some(t) if t == "submit" || t == "button" || t == "reset" => {
                    InteractionType::Button
                }
                Some(t) if t == "checkbox" => InteractionType::Checkbox,
                Some(t) if t == "radio" => InteractionType::Radio,
                _ => InteractionType::Input,
            }
        }
        _ => {}
    }

    if let Some(role) = doc.attr(node, "role") {
        match role {
            "button" => return InteractionType::Button,
            "link" => return InteractionType::Link,
            "checkbox" => return InteractionType::Checkbox,
            "radio" => return InteractionType::Radio,
            "tab" => return InteractionType::Tab,
            "menuitem" => return InteractionType::Menuitem,
            _ => {}
        }
    }

    let has_click_handler = doc.attr(node, "onclick").is_some();
    let clickable_class = doc
        .attr(node, "class")
        .map(|c| CLICKABLE_CLASS_RE.is_match(c))
        .unwrap_or(false);
    if has_click_handler || clickable_class {
        return InteractionType::Button;
    }

    InteractionType::Element
}

/// True when the element looks interactive for bubble-to-clickable purposes.
pub fn is_clickable(doc: &Document, node: NodeId) -> bool {
    if matches!(
        doc.tag(node),
        "a" | "button" | "input" | "select" | "textarea"
    ) {
        return true;
    }
    if let Some(role) = doc.attr(node, "role") {
        if matches!(
            role,
            "button" | "link" | "checkbox" | "radio" | "tab" | "menuitem"
        ) {
            return true;
        }
    }
    doc.attr(node, "onclick").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracker_host::ElementData;

    #[test]
    fn test_component_chain_top_down() {
        let mut doc = Document::new();
        let app = doc.append_child(
            doc.body(),
            ElementData::new("div").with_component(ComponentInstance::named("App")),
        );
        let page = doc.append_child(
            app,
            ElementData::new("div")
                .with_component(ComponentInstance::default().with_file("src/views/Checkout.vue")),
        );
        let button = doc.append_child(
            page,
            ElementData::new("button").with_component(ComponentInstance::named("PayButton")),
        );
        let info = component_info(&doc, button).unwrap();
        assert_eq!(info.name, "PayButton");
        assert_eq!(info.chain, vec!["App", "Checkout", "PayButton"]);
    }

    #[test]
    fn test_component_absent_yields_none() {
        let mut doc = Document::new();
        let div = doc.append_child(doc.body(), ElementData::new("div"));
        assert!(component_info(&doc, div).is_none());
    }

    #[test]
    fn test_safe_props_filters() {
        let mut doc = Document::new();
        let node = doc.append_child(
            doc.body(),
            ElementData::new("div").with_component(
                ComponentInstance::named("Card")
                    .with_prop("label", json!("x".repeat(80)))
                    .with_prop("count", json!(3))
                    .with_prop("apiToken", json!("abc"))
                    .with_prop("nested", json!({"a": 1})),
            ),
        );
        let info = component_info(&doc, node).unwrap();
        assert_eq!(info.props.len(), 2);
        assert_eq!(info.props["label"].as_str().unwrap().len(), 50);
        assert_eq!(info.props["count"], json!(3));
        assert!(!info.props.contains_key("apiToken"));
        assert!(!info.props.contains_key("nested"));
    }

    #[test]
    fn test_region_priority_order() {
        let mut doc = Document::new();
        // data-region beats role and landmark on the same element.
        let nav = doc.append_child(
            doc.body(),
            ElementData::new("nav")
                .with_attr("data-region", "top-nav")
                .with_attr("role", "navigation"),
        );
        let link = doc.append_child(nav, ElementData::new("a"));
        let region = region_info(&doc, link).unwrap();
        assert_eq!(region.name, "top-nav");
        assert_eq!(region.source, RegionSource::Attribute);
    }

    #[test]
    fn test_region_landmark_tag() {
        let mut doc = Document::new();
        let footer = doc.append_child(doc.body(), ElementData::new("footer"));
        let span = doc.append_child(footer, ElementData::new("span"));
        let region = region_info(&doc, span).unwrap();
        assert_eq!(region.name, "contentinfo");
        assert_eq!(region.source, RegionSource::Landmark);
    }

    #[test]
    fn test_interaction_type_derivation() {
        let mut doc = Document::new();
        let a = doc.append_child(doc.body(), ElementData::new("a"));
        let submit = doc.append_child(
            doc.body(),
            ElementData::new("input").with_attr("type", "submit"),
        );
        let check = doc.append_child(
            doc.body(),
            ElementData::new("input").with_attr("type", "checkbox"),
        );
        let role_tab = doc.append_child(doc.body(), ElementData::new("div").with_attr("role", "tab"));
        let styled = doc.append_child(
            doc.body(),
            ElementData::new("div").with_class("nav-btn large"),
        );
        let plain = doc.append_child(doc.body(), ElementData::new("p"));

        assert_eq!(interaction_type(&doc, a), InteractionType::Link);
        assert_eq!(interaction_type(&doc, submit), InteractionType::Button);
        assert_eq!(interaction_type(&doc, check), InteractionType::Checkbox);
        assert_eq!(interaction_type(&doc, role_tab), InteractionType::Tab);
        assert_eq!(interaction_type(&doc, styled), InteractionType::Button);
        assert_eq!(interaction_type(&doc, plain), InteractionType::Element);
    }
}
