//! Event registry with direct and delegated bindings.
//!
//! Handlers are registered against either a concrete node or a selector.
//! A single [`Registry::dispatch`] call routes a gesture: it walks from the
//! event target up to the root and the first node with a matching binding
//! handles the event. Propagation stops there, so a wishlist button inside a
//! product card never also triggers the card's handler. Delegated bindings
//! cover markup injected after registration without any re-binding.
//!
//! Handlers only read the document and return an intent; the caller decides
//! what the intent does. That keeps the registry free of page state.

use crate::dom::{Document, NodeId, Selector};

/// Gesture kinds the page reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Change,
    Submit,
}

/// A gesture aimed at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub target: NodeId,
}

impl Event {
    #[must_use]
    pub const fn click(target: NodeId) -> Self {
        Self {
            kind: EventKind::Click,
            target,
        }
    }

    #[must_use]
    pub const fn change(target: NodeId) -> Self {
        Self {
            kind: EventKind::Change,
            target,
        }
    }

    #[must_use]
    pub const fn submit(target: NodeId) -> Self {
        Self {
            kind: EventKind::Submit,
            target,
        }
    }
}

/// What a handler is attached to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A node known at registration time.
    Direct(NodeId),
    /// Any node matching the selector, now or later.
    Delegated(Selector),
}

/// The match handed to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub kind: EventKind,
    /// Node the gesture was aimed at.
    pub target: NodeId,
    /// Node whose binding matched (the target or one of its ancestors).
    pub current: NodeId,
}

/// Result of routing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<I> {
    /// No binding matched.
    Unhandled,
    /// A handler ran but produced nothing to do.
    Consumed,
    /// A handler produced an intent.
    Intent(I),
}

impl<I> Dispatch<I> {
    /// Whether some handler took the event.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self, Self::Unhandled)
    }

    /// The produced intent, if any.
    #[must_use]
    pub fn into_intent(self) -> Option<I> {
        match self {
            Self::Intent(intent) => Some(intent),
            Self::Unhandled | Self::Consumed => None,
        }
    }
}

type Handler<I> = Box<dyn Fn(&Document, Hit) -> Option<I> + Send>;

struct Entry<I> {
    kind: EventKind,
    binding: Binding,
    handler: Handler<I>,
}

/// Handler registry producing intents of type `I`.
pub struct Registry<I> {
    entries: Vec<Entry<I>>,
}

impl<I> std::fmt::Debug for Registry<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.kind, &e.binding)))
            .finish()
    }
}

impl<I> Default for Registry<I> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<I> Registry<I> {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a handler.
    pub fn on<F>(&mut self, kind: EventKind, binding: Binding, handler: F)
    where
        F: Fn(&Document, Hit) -> Option<I> + Send + 'static,
    {
        self.entries.push(Entry {
            kind,
            binding,
            handler: Box::new(handler),
        });
    }

    /// Register a handler on a specific node.
    pub fn direct<F>(&mut self, kind: EventKind, node: NodeId, handler: F)
    where
        F: Fn(&Document, Hit) -> Option<I> + Send + 'static,
    {
        self.on(kind, Binding::Direct(node), handler);
    }

    /// Register a handler for every node matching `selector`.
    pub fn delegate<F>(&mut self, kind: EventKind, selector: Selector, handler: F)
    where
        F: Fn(&Document, Hit) -> Option<I> + Send + 'static,
    {
        self.on(kind, Binding::Delegated(selector), handler);
    }

    /// Drop every direct binding on the given nodes.
    pub fn unbind(&mut self, nodes: &[NodeId]) {
        self.entries
            .retain(|e| !matches!(e.binding, Binding::Direct(n) if nodes.contains(&n)));
    }

    /// Route an event to at most one handler.
    ///
    /// At each node from the target upwards, direct bindings are tried
    /// before delegated ones, each in registration order. Clicks landing on
    /// or inside a disabled control are dropped, as browsers do.
    pub fn dispatch(&self, doc: &Document, event: Event) -> Dispatch<I> {
        if event.kind == EventKind::Click
            && doc.ancestors(event.target).any(|n| doc.is_disabled(n))
        {
            return Dispatch::Unhandled;
        }

        for current in doc.ancestors(event.target) {
            let entry = self
                .entries
                .iter()
                .filter(|e| e.kind == event.kind)
                .find(|e| matches!(e.binding, Binding::Direct(n) if n == current))
                .or_else(|| {
                    self.entries.iter().filter(|e| e.kind == event.kind).find(|e| {
                        matches!(&e.binding, Binding::Delegated(s) if doc.matches(current, s))
                    })
                });

            if let Some(entry) = entry {
                let hit = Hit {
                    kind: event.kind,
                    target: event.target,
                    current,
                };
                return (entry.handler)(doc, hit).map_or(Dispatch::Consumed, Dispatch::Intent);
            }
        }

        Dispatch::Unhandled
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Routed {
        Card(NodeId),
        Wishlist(NodeId),
        Row,
    }

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn page() -> Document {
        Document::from_html(
            r#"<div class="product-card" id="card">
                 <button class="wishlist-btn" id="wish"><i class="bi-heart" id="icon"></i></button>
                 <span id="title">Scarf</span>
               </div>
               <div class="cart-item" id="row"><button class="qty-plus" id="plus">+</button></div>"#,
        )
        .unwrap()
    }

    fn registry() -> Registry<Routed> {
        let mut registry = Registry::new();
        registry.delegate(EventKind::Click, sel(".product-card"), |_, hit| {
            Some(Routed::Card(hit.current))
        });
        registry.delegate(EventKind::Click, sel(".wishlist-btn"), |_, hit| {
            Some(Routed::Wishlist(hit.current))
        });
        registry
    }

    #[test]
    fn test_innermost_binding_wins() {
        let doc = page();
        let registry = registry();
        let icon = doc.get_element_by_id("icon").unwrap();
        let wish = doc.get_element_by_id("wish").unwrap();
        assert_eq!(
            registry.dispatch(&doc, Event::click(icon)),
            Dispatch::Intent(Routed::Wishlist(wish))
        );

        let title = doc.get_element_by_id("title").unwrap();
        let card = doc.get_element_by_id("card").unwrap();
        assert_eq!(
            registry.dispatch(&doc, Event::click(title)),
            Dispatch::Intent(Routed::Card(card))
        );
    }

    #[test]
    fn test_kind_must_match() {
        let doc = page();
        let registry = registry();
        let wish = doc.get_element_by_id("wish").unwrap();
        assert_eq!(registry.dispatch(&doc, Event::change(wish)), Dispatch::Unhandled);
    }

    #[test]
    fn test_delegation_covers_injected_markup() {
        let mut doc = page();
        let registry = registry();
        let body = doc.body();
        let injected = doc
            .append_html(body, r#"<button class="wishlist-btn">Later</button>"#)
            .unwrap();
        let button = injected.first().copied().unwrap();
        assert_eq!(
            registry.dispatch(&doc, Event::click(button)),
            Dispatch::Intent(Routed::Wishlist(button))
        );
    }

    #[test]
    fn test_direct_before_delegated_on_same_node() {
        let doc = page();
        let mut registry = Registry::new();
        let plus = doc.get_element_by_id("plus").unwrap();
        registry.delegate(EventKind::Click, sel(".qty-plus"), |_, _| Some("delegated"));
        registry.direct(EventKind::Click, plus, |_, _| Some("direct"));
        assert_eq!(
            registry.dispatch(&doc, Event::click(plus)),
            Dispatch::Intent("direct")
        );
    }

    #[test]
    fn test_none_still_consumes() {
        let doc = page();
        let mut registry = Registry::new();
        let row = doc.get_element_by_id("row").unwrap();
        let plus = doc.get_element_by_id("plus").unwrap();
        registry.direct(EventKind::Click, row, |_, _| Some(Routed::Row));
        registry.direct(EventKind::Click, plus, |_, _| None);
        let outcome = registry.dispatch(&doc, Event::click(plus));
        assert!(outcome.is_handled());
        assert_eq!(outcome.into_intent(), None);
    }

    #[test]
    fn test_disabled_control_swallows_click() {
        let mut doc = page();
        let registry = registry();
        let wish = doc.get_element_by_id("wish").unwrap();
        let icon = doc.get_element_by_id("icon").unwrap();
        doc.set_disabled(wish, true);
        assert_eq!(registry.dispatch(&doc, Event::click(icon)), Dispatch::Unhandled);
    }

    #[test]
    fn test_unbind_drops_direct_bindings() {
        let doc = page();
        let mut registry: Registry<Routed> = Registry::new();
        let row = doc.get_element_by_id("row").unwrap();
        registry.direct(EventKind::Click, row, |_, _| Some(Routed::Row));
        assert_eq!(registry.len(), 1);
        registry.unbind(&[row]);
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(&doc, Event::click(row)), Dispatch::Unhandled);
    }
}
