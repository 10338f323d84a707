//! Arena-backed document model.
//!
//! A light stand-in for the host DOM: enough structure for element-info
//! extraction, path building, selector matching, and region/component
//! climbing. Nodes are never reused, so a `NodeId` stays valid (but detached)
//! after removal.

use std::collections::BTreeMap;

use serde_json::Value;

use tracker_core::Rect;

/// Handle to a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Framework component back-pointer attached to a node.
#[derive(Debug, Clone, Default)]
pub struct ComponentInstance {
    /// Explicit component name.
    pub name: Option<String>,
    /// Source file, used to derive a name when none is set.
    pub file: Option<String>,
    pub props: BTreeMap<String, Value>,
}

impl ComponentInstance {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}

/// Element payload: tag, attributes, text, value, layout rect, component.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    /// Current form value.
    pub value: String,
    pub rect: Rect,
    pub component: Option<ComponentInstance>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.attributes.insert("id".into(), id.into());
        self
    }

    /// Space-separated class list.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.attributes.insert("class".into(), class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_component(mut self, component: ComponentInstance) -> Self {
        self.component = Some(component);
        self
    }
}

#[derive(Debug)]
struct Node {
    data: ElementData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    detached: bool,
}

/// The document tree. Construction always yields `<html><body/></html>`.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
        };
        doc.nodes.push(Node {
            data: ElementData::new("html"),
            parent: None,
            children: Vec::new(),
            detached: false,
        });
        doc.root = NodeId(0);
        doc.body = doc.append_child(doc.root, ElementData::new("body"));
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Appends a new element under `parent` and returns its id.
    pub fn append_child(&mut self, parent: NodeId, data: ElementData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
            detached: false,
        });
        self.node_mut(parent).children.push(id);
        id
    }

    /// Detaches a node (and its subtree) from the tree.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            let siblings = &mut self.node_mut(parent).children;
            siblings.retain(|&c| c != id);
        }
        self.mark_detached(id);
    }

    fn mark_detached(&mut self, id: NodeId) {
        self.node_mut(id).detached = true;
        let children = self.node(id).children.clone();
        for child in children {
            self.mark_detached(child);
        }
    }

    /// True while the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        !self.node(id).detached
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Ancestors from the immediate parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(node) = cur {
            out.push(node);
            cur = self.parent(node);
        }
        out
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).data.tag
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).data.attributes.get(name).map(|s| s.as_str())
    }

    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.node_mut(id)
            .data
            .attributes
            .insert(name.into(), value.into());
    }

    pub fn attributes(&self, id: NodeId) -> &BTreeMap<String, String> {
        &self.node(id).data.attributes
    }

    pub fn id_attr(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id")
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).data.text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.node_mut(id).data.text = Some(text.into());
    }

    pub fn value(&self, id: NodeId) -> &str {
        &self.node(id).data.value
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        self.node_mut(id).data.value = value.into();
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.node(id).data.rect
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        self.node_mut(id).data.rect = rect;
    }

    pub fn component(&self, id: NodeId) -> Option<&ComponentInstance> {
        self.node(id).data.component.as_ref()
    }

    /// Depth below the root (html = 0, body = 1).
    pub fn depth(&self, id: NodeId) -> u32 {
        self.ancestors(id).len() as u32
    }

    /// 1-based index among same-tag siblings, for XPath.
    pub fn same_tag_index(&self, id: NodeId) -> usize {
        let tag = self.tag(id);
        match self.parent(id) {
            Some(parent) => {
                let mut index = 0;
                for &sibling in self.children(parent) {
                    if self.tag(sibling) == tag {
                        index += 1;
                    }
                    if sibling == id {
                        break;
                    }
                }
                index.max(1)
            }
            None => 1,
        }
    }

    /// 1-based index among all siblings, for `:nth-child`.
    pub fn nth_child_index(&self, id: NodeId) -> usize {
        match self.parent(id) {
            Some(parent) => {
                self.children(parent)
                    .iter()
                    .position(|&c| c == id)
                    .unwrap_or(0)
                    + 1
            }
            None => 1,
        }
    }

    /// Sibling count of the node's parent.
    pub fn sibling_count(&self, id: NodeId) -> usize {
        match self.parent(id) {
            Some(parent) => self.children(parent).len(),
            None => 1,
        }
    }

    /// First attached element with the given id attribute.
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.iter_attached()
            .find(|&n| self.id_attr(n) == Some(element_id))
    }

    /// All attached nodes in document order.
    pub fn iter_attached(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(move |&n| !self.node(n).detached)
    }

    /// Attached descendants of `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.node(node).detached {
                continue;
            }
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let main = doc.append_child(doc.body(), ElementData::new("main"));
        let div = doc.append_child(main, ElementData::new("div").with_class("row"));
        let button = doc.append_child(
            div,
            ElementData::new("button").with_id("pay").with_text("Pay"),
        );
        (doc, main, div, button)
    }

    #[test]
    fn test_tree_structure() {
        let (doc, main, div, button) = sample_doc();
        assert_eq!(doc.parent(button), Some(div));
        assert_eq!(doc.ancestors(button), vec![div, main, doc.body(), doc.root()]);
        assert_eq!(doc.depth(button), 4);
        assert_eq!(doc.tag(button), "button");
        assert_eq!(doc.id_attr(button), Some("pay"));
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let (mut doc, main, div, button) = sample_doc();
        doc.remove(div);
        assert!(!doc.is_attached(div));
        assert!(!doc.is_attached(button));
        assert!(doc.is_attached(main));
        assert!(doc.element_by_id("pay").is_none());
    }

    #[test]
    fn test_same_tag_index() {
        let mut doc = Document::new();
        let a = doc.append_child(doc.body(), ElementData::new("div"));
        let _span = doc.append_child(doc.body(), ElementData::new("span"));
        let b = doc.append_child(doc.body(), ElementData::new("div"));
        assert_eq!(doc.same_tag_index(a), 1);
        assert_eq!(doc.same_tag_index(b), 2);
        assert_eq!(doc.nth_child_index(b), 3);
    }

    #[test]
    fn test_descendants_order() {
        let (doc, main, div, button) = sample_doc();
        assert_eq!(doc.descendants(doc.body()), vec![main, div, button]);
    }

    #[test]
    fn test_tag_lowercased() {
        let data = ElementData::new("BUTTON");
        assert_eq!(data.tag, "button");
    }
}
