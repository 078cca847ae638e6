//! UI reconciliation: reflect cart and wishlist state into the document.
//!
//! Every function here is a pure document edit driven by a snapshot, a count
//! or the local cache. Targets are optional; a page without a badge or a
//! summary block is simply left alone.

use dcl_core::{CartSnapshot, ProductId, format_amount};
use rust_decimal::Decimal;

use crate::classes;
use crate::dom::{Document, NodeId};
use crate::storage::LocalCache;

/// Show the count on every cart badge; hide badges when the cart is empty.
pub fn update_cart_count(doc: &mut Document, count: u32) {
    let text = count.to_string();
    for badge in doc.query_selector_all(&classes::CART_BADGES) {
        doc.set_text_content(badge, &text);
        if count > 0 {
            doc.remove_class(badge, classes::HIDDEN);
            doc.add_class(badge, classes::BOUNCE_IN);
        } else {
            doc.add_class(badge, classes::HIDDEN);
        }
    }
}

/// Apply authoritative server totals to badges and the cart summary.
///
/// Fields missing from the snapshot leave their targets untouched.
pub fn apply_snapshot(doc: &mut Document, snapshot: &CartSnapshot) {
    if let Some(count) = snapshot.cart_count {
        update_cart_count(doc, count);
    }

    if let Some(total) = snapshot.cart_total {
        let formatted = format_amount(total);
        for selector in [&*classes::SUBTOTAL, &*classes::TOTAL] {
            if let Some(node) = doc.query_selector(selector) {
                doc.set_text_content(node, &formatted);
            }
        }
    }

    if let Some(count) = snapshot.cart_count {
        if let Some(node) = doc.get_element_by_id(classes::CART_ITEM_COUNT_ID) {
            doc.set_text_content(node, &count.to_string());
        }
        if let Some(node) = doc.query_selector(&classes::SUBTOTAL_CAPTION) {
            doc.set_text_content(node, &format!("Subtotal ({count} items)"));
        }
    }
}

/// Write a line total into a cart row's price label.
pub fn apply_line_total(doc: &mut Document, row: NodeId, item_total: Decimal) {
    if let Some(label) = doc.query_selector_in(row, &classes::LINE_TOTAL) {
        doc.set_text_content(label, &format_amount(item_total));
    }
}

/// Mirror wishlist membership into the `active` class of every wishlist
/// button in `scope` (inclusive).
pub fn sync_wishlist_buttons(doc: &mut Document, scope: NodeId, cache: &LocalCache) {
    let mut buttons = doc.query_selector_all_in(scope, &classes::WISHLIST_BUTTON_WITH_ID);
    if doc.matches(scope, &classes::WISHLIST_BUTTON_WITH_ID) {
        buttons.insert(0, scope);
    }

    for button in buttons {
        let member = doc
            .data_non_blank(button, "product-id")
            .is_some_and(|id| cache.is_wishlisted(&ProductId::new(id)));
        doc.toggle_class(button, classes::ACTIVE, member);
    }
}
