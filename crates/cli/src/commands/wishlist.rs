//! Wishlist commands.
//!
//! The wishlist lives only in the local cache; nothing is sent to the
//! storefront.

use std::fmt::Write as _;

use dcl_core::ProductId;
use dcl_storefront::state::AppState;

/// Add or remove a product. Returns the confirmation line.
pub fn toggle(state: &mut AppState, product: &ProductId) -> String {
    if state.cache_mut().toggle_wishlist(product) {
        format!("Added {product} to wishlist.")
    } else {
        format!("Removed {product} from wishlist.")
    }
}

/// List wishlisted product ids, one per line.
#[must_use]
pub fn list(state: &AppState) -> String {
    let wishlist = state.cache().wishlist();
    if wishlist.is_empty() {
        return "Your wishlist is empty.".to_string();
    }
    let mut out = String::new();
    for (i, product) in wishlist.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{product}");
    }
    out
}
