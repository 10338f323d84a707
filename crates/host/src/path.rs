//! XPath and CSS-path builders, walking from an element to the root.

use crate::dom::{Document, NodeId};

/// Absolute XPath with `tag[index]` sibling disambiguation, e.g.
/// `/html[1]/body[1]/div[2]/button[1]`.
pub fn xpath(doc: &Document, node: NodeId) -> String {
    let mut segments = Vec::new();
    let mut cur = Some(node);
    while let Some(n) = cur {
        segments.push(format!("{}[{}]", doc.tag(n), doc.same_tag_index(n)));
        cur = doc.parent(n);
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

/// CSS selector path. Prefers an id (terminal on match), otherwise
/// tag + first two classes, with `:nth-child(n)` when the element has
/// siblings. Stops at `<body>`.
pub fn css_path(doc: &Document, node: NodeId) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut cur = Some(node);
    while let Some(n) = cur {
        if doc.tag(n) == "body" || doc.tag(n) == "html" {
            break;
        }
        if let Some(id) = doc.id_attr(n) {
            segments.push(format!("#{}", id));
            break;
        }
        let mut segment = doc.tag(n).to_string();
        for class in doc.classes(n).iter().take(2) {
            segment.push('.');
            segment.push_str(class);
        }
        if doc.sibling_count(n) > 1 {
            segment.push_str(&format!(":nth-child({})", doc.nth_child_index(n)));
        }
        segments.push(segment);
        cur = doc.parent(n);
    }
    segments.reverse();
    segments.join(" > ")
}
