//! Headless document model.
//!
//! An arena of element and text nodes with just enough of the DOM surface for
//! the storefront's CSS-class contract: classes, attributes, `data-*`, input
//! values, text content, tree edits, and selector queries.
//!
//! Node ids stay valid after a node is detached; operations on detached nodes
//! still work, and queries from the root simply no longer reach them. This
//! lets asynchronous completions hold on to a row or button that may have been
//! removed in the meantime without any bookkeeping.
//!
//! Detaching therefore never frees anything. Subtrees whose ids nobody else
//! holds (toasts, for one) are released with [`Document::dispose`], and their
//! slots are reused by later nodes.

mod html;
mod selector;

pub use html::MarkupError;
pub use selector::{Selector, SelectorError};

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    // Live input value; falls back to the `value` attribute until edited
    value: Option<String>,
}

/// An in-memory document rooted at a `body` element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    // Disposed slots, reused before the arena grows
    free: Vec<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Element(Element {
                    tag: "body".to_string(),
                    attrs: Vec::new(),
                    value: None,
                }),
            }],
            free: Vec::new(),
        }
    }

    /// Document whose body holds the given markup.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup has an unterminated tag, attribute or
    /// comment.
    pub fn from_html(markup: &str) -> Result<Self, MarkupError> {
        let mut doc = Self::new();
        let body = doc.body();
        doc.append_html(body, markup)?;
        Ok(doc)
    }

    /// The root `body` element.
    #[must_use]
    pub const fn body(&self) -> NodeId {
        NodeId(0)
    }

    // =========================================================================
    // Construction and tree edits
    // =========================================================================

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            value: None,
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            data,
        };
        if let Some(index) = self.free.pop()
            && let Some(slot) = self.nodes.get_mut(index)
        {
            *slot = node;
            return NodeId(index);
        }
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of node slots held, including disposed ones awaiting reuse.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Move `child` to the end of `parent`'s children.
    ///
    /// Returns false (and changes nothing) when `parent` is not an element or
    /// `child` is `parent` itself or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.element(parent).is_none()
            || self.node(child).is_none()
            || self.ancestors(parent).any(|a| a == child)
        {
            return false;
        }
        self.remove(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        true
    }

    /// Detach a node from its parent. Detaching the root is a no-op.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    /// Detach `node` and release it with all of its descendants.
    ///
    /// The released ids are handed out again by later `create_*` calls, so
    /// only dispose of subtrees no one else keeps ids into. Disposing the
    /// root is a no-op.
    pub fn dispose(&mut self, node: NodeId) {
        if node == self.body() || self.node(node).is_none() {
            return;
        }
        self.remove(node);
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.nodes.get_mut(current.0) else {
                continue;
            };
            let released = std::mem::replace(
                slot,
                Node {
                    parent: None,
                    children: Vec::new(),
                    data: NodeData::Text(String::new()),
                },
            );
            stack.extend(released.children);
            self.free.push(current.0);
        }
    }

    /// Detach every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        for child in self.children(node).to_vec() {
            self.remove(child);
        }
    }

    /// Replace the children of `node` with `children`.
    pub fn replace_children(&mut self, node: NodeId, children: &[NodeId]) {
        self.clear_children(node);
        for &child in children {
            self.append_child(node, child);
        }
    }

    /// Parse markup and append it to `parent`. Returns the top-level nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup is malformed; nothing is appended then.
    pub fn append_html(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>, MarkupError> {
        let parsed = self.parse_detached(markup)?;
        for &node in &parsed {
            self.append_child(parent, node);
        }
        Ok(parsed)
    }

    /// Replace the children of `node` with parsed markup.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup is malformed; the old children stay.
    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) -> Result<Vec<NodeId>, MarkupError> {
        let parsed = self.parse_detached(markup)?;
        self.replace_children(node, &parsed);
        Ok(parsed)
    }

    // The holder is released either way; on error it takes the partial parse
    // with it.
    fn parse_detached(&mut self, markup: &str) -> Result<Vec<NodeId>, MarkupError> {
        let holder = self.create_element("template");
        let parsed = html::parse_into(self, holder, markup);
        if parsed.is_ok() {
            self.clear_children(holder);
        }
        self.dispose(holder);
        parsed
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    /// Parent of a node, if attached.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    /// Children of a node (empty for text and unknown nodes).
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map_or(&[] as &[NodeId], |n| n.children.as_slice())
    }

    /// The node followed by each of its ancestors up to the detached root.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(node).map(|_| node), move |&n| self.parent(n))
    }

    /// Whether the node is reachable from the body.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == self.body())
    }

    /// Descendants of `node` in document order, excluding `node`.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    // =========================================================================
    // Element state
    // =========================================================================

    /// Lowercase tag name, for elements.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    /// Whether the node is an element.
    #[must_use]
    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Attribute value.
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set (or add) an attribute.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(node) else {
            return;
        };
        match element
            .attrs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => element
                .attrs
                .push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    /// Remove an attribute.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node) {
            element.attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
    }

    /// Element `id` attribute.
    #[must_use]
    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.attr(node, "id")
    }

    /// `data-*` attribute by its kebab-case suffix (`data(node, "variant-id")`).
    #[must_use]
    pub fn data(&self, node: NodeId, key: &str) -> Option<&str> {
        self.attr(node, &format!("data-{key}"))
    }

    /// Non-blank `data-*` attribute, trimmed.
    #[must_use]
    pub fn data_non_blank(&self, node: NodeId, key: &str) -> Option<&str> {
        self.data(node, key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Set a `data-*` attribute.
    pub fn set_data(&mut self, node: NodeId, key: &str, value: &str) {
        self.set_attr(node, &format!("data-{key}"), value);
    }

    /// Full `class` attribute.
    #[must_use]
    pub fn class_name(&self, node: NodeId) -> &str {
        self.attr(node, "class").unwrap_or_default()
    }

    /// Replace the `class` attribute.
    pub fn set_class_name(&mut self, node: NodeId, class_name: &str) {
        self.set_attr(node, "class", class_name);
    }

    /// Whether the element carries a class.
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.class_name(node).split_whitespace().any(|c| c == class)
    }

    /// Add a class if missing.
    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.is_element(node) || self.has_class(node, class) {
            return;
        }
        let current = self.class_name(node);
        let updated = if current.trim().is_empty() {
            class.to_string()
        } else {
            format!("{} {class}", current.trim())
        };
        self.set_class_name(node, &updated);
    }

    /// Remove a class if present.
    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let updated = self
            .class_name(node)
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_class_name(node, &updated);
    }

    /// Add or remove a class.
    pub fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(Node {
            data: NodeData::Text(text),
            ..
        }) = self.node(node)
        {
            return text.clone();
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|n| match &self.node(n)?.data {
                NodeData::Text(text) => Some(text.as_str()),
                NodeData::Element(_) => None,
            })
            .collect()
    }

    /// Replace the children of an element with a single text node.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        if let Some(Node {
            data: NodeData::Text(existing),
            ..
        }) = self.node_mut(node)
        {
            *existing = text.to_string();
            return;
        }
        if !self.is_element(node) {
            return;
        }
        self.clear_children(node);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node);
        }
    }

    /// Current input value.
    #[must_use]
    pub fn value(&self, node: NodeId) -> String {
        self.element(node)
            .and_then(|e| e.value.clone())
            .or_else(|| self.attr(node, "value").map(String::from))
            .unwrap_or_default()
    }

    /// Set the input value (the `value` attribute keeps its initial value).
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.value = Some(value.to_string());
        }
    }

    /// Whether the element has the `disabled` attribute.
    #[must_use]
    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.attr(node, "disabled").is_some()
    }

    /// Set or clear the `disabled` attribute.
    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) {
        if disabled {
            self.set_attr(node, "disabled", "");
        } else {
            self.remove_attr(node, "disabled");
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether the element matches the selector.
    #[must_use]
    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// Nearest inclusive ancestor matching the selector.
    #[must_use]
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        self.ancestors(node).find(|&n| selector.matches(self, n))
    }

    /// First connected element matching the selector.
    #[must_use]
    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.query_selector_in(self.body(), selector)
    }

    /// Every connected element matching the selector, in document order.
    #[must_use]
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.query_selector_all_in(self.body(), selector)
    }

    /// First descendant of `scope` matching the selector.
    #[must_use]
    pub fn query_selector_in(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| selector.matches(self, n))
    }

    /// Every descendant of `scope` matching the selector.
    #[must_use]
    pub fn query_selector_all_in(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    /// Connected element with the given `id`.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.body())
            .into_iter()
            .find(|&n| self.id(n) == Some(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    #[test]
    fn test_class_edits() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.add_class(div, "cart-count");
        doc.add_class(div, "d-none");
        doc.add_class(div, "d-none");
        assert_eq!(doc.class_name(div), "cart-count d-none");

        doc.remove_class(div, "d-none");
        assert_eq!(doc.class_name(div), "cart-count");
        assert!(!doc.has_class(div, "d-none"));
    }

    #[test]
    fn test_text_content_round_trip() {
        let mut doc = Document::from_html("<span class=\"cart-count\">0</span>").unwrap();
        let badge = doc.query_selector(&sel(".cart-count")).unwrap();
        assert_eq!(doc.text_content(badge), "0");
        doc.set_text_content(badge, "3");
        assert_eq!(doc.text_content(badge), "3");
        assert_eq!(doc.children(badge).len(), 1);
    }

    #[test]
    fn test_disposed_subtree_slots_are_reused() {
        let mut doc = Document::from_html(
            "<div class=\"toast\"><span>hi</span><button>x</button></div><p>kept</p>",
        )
        .unwrap();
        let toast = doc.query_selector(&sel(".toast")).unwrap();
        let kept = doc.query_selector(&sel("p")).unwrap();
        let before = doc.capacity();

        doc.dispose(toast);
        assert!(!doc.is_connected(toast));
        assert!(doc.query_selector(&sel("span")).is_none());
        assert_eq!(doc.text_content(kept), "kept");

        let body = doc.body();
        doc.append_html(body, "<div class=\"toast\"><span>again</span><button>x</button></div>")
            .unwrap();
        assert_eq!(doc.capacity(), before);
        assert_eq!(doc.query_selector_all(&sel(".toast span")).len(), 1);

        doc.dispose(body);
        assert_eq!(doc.children(body).len(), 2);
    }

    #[test]
    fn test_removed_nodes_leave_queries_but_stay_usable() {
        let mut doc = Document::from_html(
            "<div class=\"cart-item\" data-item-id=\"1\"></div><div class=\"cart-item\" data-item-id=\"2\"></div>",
        )
        .unwrap();
        let rows = doc.query_selector_all(&sel(".cart-item"));
        assert_eq!(rows.len(), 2);

        doc.remove(rows[0]);
        assert!(!doc.is_connected(rows[0]));
        assert_eq!(doc.query_selector_all(&sel(".cart-item")).len(), 1);
        assert_eq!(doc.data(rows[0], "item-id"), Some("1"));
    }

    #[test]
    fn test_append_child_refuses_cycles() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        assert!(doc.append_child(outer, inner));
        assert!(!doc.append_child(inner, outer));
        assert!(!doc.append_child(inner, inner));
    }

    #[test]
    fn test_closest_and_scoped_query() {
        let doc = Document::from_html(
            r#"<div class="product-card"><form><input class="qty-input" value="2"><button class="add-to-cart-btn"><i class="icon"></i></button></form></div>"#,
        )
        .unwrap();
        let icon = doc.query_selector(&sel(".icon")).unwrap();
        let button = doc.closest(icon, &sel(".add-to-cart-btn")).unwrap();
        let form = doc.closest(button, &sel("form")).unwrap();
        let input = doc.query_selector_in(form, &sel(".qty-input")).unwrap();
        assert_eq!(doc.value(input), "2");
        assert_eq!(doc.closest(icon, &sel(".wishlist-btn")), None);
    }

    #[test]
    fn test_value_tracks_edits_separately_from_attribute() {
        let mut doc = Document::from_html("<input id=\"q\" value=\"1\">").unwrap();
        let input = doc.get_element_by_id("q").unwrap();
        doc.set_value(input, "5");
        assert_eq!(doc.value(input), "5");
        assert_eq!(doc.attr(input, "value"), Some("1"));
    }

    #[test]
    fn test_disabled_flag() {
        let mut doc = Document::new();
        let button = doc.create_element("button");
        doc.set_disabled(button, true);
        assert!(doc.is_disabled(button));
        doc.set_disabled(button, false);
        assert!(!doc.is_disabled(button));
    }

    #[test]
    fn test_set_inner_html_replaces_children() {
        let mut doc = Document::from_html("<div id=\"qv\"><p>loading</p></div>").unwrap();
        let container = doc.get_element_by_id("qv").unwrap();
        doc.set_inner_html(container, "<button class=\"add-to-cart-btn\" data-variant-id=\"9\">Add</button>")
            .unwrap();
        assert_eq!(doc.text_content(container), "Add");
        assert!(doc.query_selector(&sel("#qv .add-to-cart-btn")).is_some());
    }
}
