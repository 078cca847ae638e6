//! Transient visual feedback: the add-to-cart "Added" state and the quick
//! view loading and error panels.

use std::collections::HashMap;

use crate::classes;
use crate::dom::{Document, NodeId};

const ADDED_MARKUP: &str =
    r#"<span class="animate-scaleIn"><i class="bi bi-check-lg me-1"></i>Added</span>"#;

/// Button styles swapped out while the "Added" state shows.
const BUTTON_STYLES: [&str; 4] = [
    "btn-primary",
    "btn-secondary",
    "btn-outline-primary",
    "btn-outline-secondary",
];

pub(super) const QUICK_VIEW_LOADING: &str = r#"<div class="col-12 p-5 text-center">
    <div class="spinner-border text-primary" role="status">
        <span class="visually-hidden">Loading...</span>
    </div>
</div>"#;

pub(super) const QUICK_VIEW_ERROR: &str = r#"<div class="col-12 p-5 text-center">
    <i class="bi bi-exclamation-circle text-danger mb-3 display-4"></i>
    <h4>Oops! Something went wrong</h4>
    <p class="text-muted">We couldn't load the product details. Please try again.</p>
</div>"#;

/// Remember a button's classes the first time it is clicked, so feedback
/// can put them back later.
pub(super) fn remember_original_class(doc: &mut Document, button: NodeId) {
    if doc.data(button, "original-class").is_none() {
        let class_name = doc.class_name(button).to_string();
        doc.set_data(button, "original-class", &class_name);
    }
}

/// Buttons currently showing "Added", with their original children.
#[derive(Debug, Default)]
pub(super) struct AddedFeedback {
    saved: HashMap<NodeId, Vec<NodeId>>,
}

impl AddedFeedback {
    /// Switch a button to its "Added" state. Returns false when it already
    /// is, in which case the running timer keeps ownership.
    pub(super) fn start(&mut self, doc: &mut Document, button: NodeId) -> bool {
        if self.saved.contains_key(&button) {
            return false;
        }
        let children = doc.children(button).to_vec();
        if let Err(e) = doc.set_inner_html(button, ADDED_MARKUP) {
            tracing::warn!(error = %e, "Could not render added state");
            return false;
        }
        self.saved.insert(button, children);

        for style in BUTTON_STYLES {
            doc.remove_class(button, style);
        }
        doc.add_class(button, classes::ADDED);
        doc.set_disabled(button, true);
        true
    }

    /// Restore the button's content, classes and enabled state.
    pub(super) fn finish(&mut self, doc: &mut Document, button: NodeId) {
        let Some(children) = self.saved.remove(&button) else {
            return;
        };
        doc.replace_children(button, &children);
        doc.remove_class(button, classes::ADDED);
        match doc.data(button, "original-class").map(String::from) {
            Some(original) => doc.set_class_name(button, &original),
            None => doc.add_class(button, "btn-primary"),
        }
        doc.set_disabled(button, false);
    }

    /// Whether the button is showing "Added".
    #[cfg(test)]
    pub(super) fn is_active(&self, button: NodeId) -> bool {
        self.saved.contains_key(&button)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dom::Selector;

    fn button_doc() -> (Document, NodeId) {
        let doc = Document::from_html(
            r#"<button class="btn btn-primary add-to-cart-btn" data-variant-id="42"><i class="bi bi-bag"></i> Add to Cart</button>"#,
        )
        .unwrap();
        let button = doc.query_selector(&Selector::parse(".add-to-cart-btn").unwrap()).unwrap();
        (doc, button)
    }

    #[test]
    fn test_added_state_round_trip() {
        let (mut doc, button) = button_doc();
        remember_original_class(&mut doc, button);
        let mut feedback = AddedFeedback::default();

        assert!(feedback.start(&mut doc, button));
        assert!(feedback.is_active(button));
        assert!(doc.has_class(button, "btn-added"));
        assert!(!doc.has_class(button, "btn-primary"));
        assert!(doc.is_disabled(button));
        assert_eq!(doc.text_content(button), "Added");

        assert!(!feedback.start(&mut doc, button));

        feedback.finish(&mut doc, button);
        assert!(!feedback.is_active(button));
        assert_eq!(doc.class_name(button), "btn btn-primary add-to-cart-btn");
        assert!(!doc.is_disabled(button));
        assert_eq!(doc.text_content(button), " Add to Cart");
    }

    #[test]
    fn test_finish_without_original_class_defaults_to_primary() {
        let (mut doc, button) = button_doc();
        let mut feedback = AddedFeedback::default();
        feedback.start(&mut doc, button);
        feedback.finish(&mut doc, button);
        assert!(doc.has_class(button, "btn-primary"));
        assert!(!doc.has_class(button, "btn-added"));
    }

    #[test]
    fn test_original_class_recorded_once() {
        let (mut doc, button) = button_doc();
        remember_original_class(&mut doc, button);
        doc.add_class(button, "btn-added");
        remember_original_class(&mut doc, button);
        assert_eq!(
            doc.data(button, "original-class"),
            Some("btn btn-primary add-to-cart-btn")
        );
    }
}
