//! Arena document model.
//!
//! Plays the role of the browser DOM for the reconciliation engine: the live
//! page, parsed fragments and fetched frame documents are all `Document`s.
//!
//! # Module Structure
//!
//! - `parse` - HTML text to `Document` (via `html5ever`)
//! - `render` - inner/outer HTML serialization
//! - `selector` - compound CSS selectors used for region and frame queries
//!
//! Nodes are never freed: removing a node detaches it from its parent and it
//! stays addressable by `NodeId`, which is how a captured focus target can be
//! checked for liveness after a patch.

mod parse;
mod render;
mod selector;

pub use selector::{AttrMatch, Selector, SelectorError};

/// Handle to a node inside one `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element tag name and attributes (insertion-ordered).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(pos).1)
    }

    /// Whitespace-separated `class` tokens.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The root container (a document or a parsed fragment).
    Root,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Mutable HTML tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    active: Option<NodeId>,
    /// `<!DOCTYPE …>` declaration of a parsed full document.
    doctype: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only its root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
            active: None,
            doctype: None,
        }
    }

    /// The root container node.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Whether `id` was handed out by this document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn create_element(&mut self, element: ElementData) -> NodeId {
        self.push(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    /// Append `child` as last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Remove `id` from its parent. The node stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    /// Replace the children of `parent` with `children`, in order.
    ///
    /// Previous children not present in the new list are detached.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for old in std::mem::take(&mut self.node_mut(parent).children) {
            self.node_mut(old).parent = None;
        }
        for &child in &children {
            self.detach(child);
            self.node_mut(child).parent = Some(parent);
        }
        self.node_mut(parent).children = children;
    }

    /// Detach every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        self.set_children(parent, Vec::new());
    }

    /// Deep-copy `src_id` (from another document) into this arena.
    ///
    /// The copy is created detached; the caller decides where it goes.
    pub fn import(&mut self, src: &Document, src_id: NodeId) -> NodeId {
        let copy = self.push(src.data(src_id).clone());
        for &child in src.children(src_id) {
            let child_copy = self.import(src, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Replace the children of `target` with deep copies of the children of
    /// `src_parent` in `src`.
    pub fn replace_children_from(&mut self, target: NodeId, src: &Document, src_parent: NodeId) {
        let copies = src
            .children(src_parent)
            .iter()
            .map(|&child| self.import(src, child))
            .collect();
        self.set_children(target, copies);
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Replace the contents of a text or comment node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        match &mut self.node_mut(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => *t = text.into(),
            _ => {}
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(id) {
            element.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(id) {
            element.remove_attr(name);
        }
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors_inclusive(id).any(|n| n == self.root())
    }

    /// `id`, then its parent, up to the root (or the top of a detached tree).
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&n| self.parent(n))
    }

    /// Descendants of `scope` in document order, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(scope).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// The `<html>` element, if the document has one at top level.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&n| self.tag_name(n) == Some("html"))
    }

    /// A preview document is a cached snapshot shown during navigation; live
    /// regions inside it must stay inert.
    pub fn is_preview(&self) -> bool {
        self.document_element().is_some_and(|html| {
            self.has_attr(html, "data-turbo-preview")
                || self.has_attr(html, "data-turbolinks-preview")
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All element descendants of `scope` matching `selector`, in document
    /// order (like `querySelectorAll`).
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&n| self.element(n).is_some_and(|e| selector.matches(e)))
            .collect()
    }

    /// First element descendant of `scope` matching `selector`.
    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .find(|&n| self.element(n).is_some_and(|e| selector.matches(e)))
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// The focused element, if it is still attached.
    pub fn active_element(&self) -> Option<NodeId> {
        self.active.filter(|&n| self.is_attached(n))
    }

    /// Focus `id`. Detached nodes and non-elements cannot take focus.
    pub fn focus(&mut self, id: NodeId) -> bool {
        if self.element(id).is_some() && self.is_attached(id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn blur(&mut self) {
        self.active = None;
    }
}

/// Pre-order traversal iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
