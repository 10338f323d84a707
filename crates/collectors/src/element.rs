//! Shared element-info extraction.
//!
//! Only `data-track-*` attributes are forwarded; everything textual is
//! truncated per `limits`.

use std::collections::BTreeMap;

use tracker_core::limits::{MAX_ELEMENT_TEXT_LEN, MAX_IGNORE_CLIMB};
use tracker_core::util::text::clean_text;
use tracker_core::{ElementInfo, FieldType, FormFieldInfo, LinkInfo, LinkKind, ParentSummary};
use tracker_host::{css_path, xpath, Document, NodeId, Selector, Window};

const DATA_TRACK_PREFIX: &str = "data-track-";

/// `data-track-ignore` on the element or any ancestor within 5 levels.
pub fn is_ignored_by_attribute(doc: &Document, node: NodeId) -> bool {
    let mut cur = Some(node);
    for _ in 0..=MAX_IGNORE_CLIMB {
        match cur {
            Some(n) => {
                if doc.attr(n, "data-track-ignore").is_some() {
                    return true;
                }
                cur = doc.parent(n);
            }
            None => return false,
        }
    }
    false
}

/// True when the element matches any of the parsed ignore selectors.
pub fn matches_ignore_selectors(doc: &Document, node: NodeId, selectors: &[Selector]) -> bool {
    selectors.iter().any(|s| s.matches(doc, node))
}

/// Parses configured ignore selectors, skipping invalid ones (treated as
/// non-matching).
pub fn parse_ignore_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::debug!(selector = s.as_str(), error = %e, "ignoring invalid selector");
                None
            }
        })
        .collect()
}

fn link_info(window: &Window, doc: &Document, node: NodeId) -> Option<LinkInfo> {
    if doc.tag(node) != "a" {
        return None;
    }
    let href = doc.attr(node, "href")?.to_string();
    let target = doc.attr(node, "target").map(str::to_string);

    let kind = if doc.attr(node, "download").is_some() {
        LinkKind::Download
    } else if href.starts_with("mailto:") {
        LinkKind::Mailto
    } else if href.starts_with("tel:") {
        LinkKind::Tel
    } else if href.starts_with('#') {
        LinkKind::Anchor
    } else {
        LinkKind::Navigation
    };

    let external = match url::Url::parse(&window.href()) {
        Ok(base) => match base.join(&href) {
            Ok(resolved) => resolved.host_str() != base.host_str(),
            Err(_) => false,
        },
        Err(_) => false,
    };

    Some(LinkInfo {
        href,
        target,
        external,
        kind,
    })
}

fn form_info(doc: &Document, node: NodeId) -> Option<FormFieldInfo> {
    let tag = doc.tag(node);
    if !matches!(tag, "input" | "select" | "textarea") {
        return None;
    }
    Some(FormFieldInfo {
        name: doc.attr(node, "name").map(str::to_string),
        field_type: FieldType::from_element(tag, doc.attr(node, "type")),
        required: doc.attr(node, "required").is_some(),
        disabled: doc.attr(node, "disabled").is_some(),
    })
}

/// Extracts the full element snapshot attached to interaction events.
pub fn element_info(window: &Window, node: NodeId) -> ElementInfo {
    let doc = window.document();

    let attributes: BTreeMap<String, String> = doc
        .attributes(node)
        .iter()
        .filter(|(k, _)| k.starts_with(DATA_TRACK_PREFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let parent = doc.parent(node).map(|p| ParentSummary {
        tag: doc.tag(p).to_string(),
        id: doc.id_attr(p).map(str::to_string),
        classes: doc.classes(p).iter().map(|c| c.to_string()).collect(),
    });

    ElementInfo {
        tag: doc.tag(node).to_string(),
        id: doc.id_attr(node).map(str::to_string),
        classes: doc.classes(node).iter().map(|c| c.to_string()).collect(),
        text: doc.text(node).map(|t| clean_text(t, MAX_ELEMENT_TEXT_LEN)),
        xpath: xpath(&doc, node),
        selector: css_path(&doc, node),
        rect: doc.rect(node),
        attributes,
        parent,
        component: crate::context::component_info(&doc, node),
        link: link_info(window, &doc, node),
        form: form_info(&doc, node),
        interaction_type: crate::context::interaction_type(&doc, node),
        aria_label: doc.attr(node, "aria-label").map(str::to_string),
        depth: doc.depth(node),
        region: crate::context::region_info(&doc, node),
    }
}
