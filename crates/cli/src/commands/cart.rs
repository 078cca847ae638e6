//! Cart commands.
//!
//! Mirrors the page behaviour: the local cache changes only after the
//! storefront confirms a mutation.
//!
//! # Usage
//!
//! ```bash
//! dcl cart add 42 -q 2 --name "Silk Scarf" --price 19.99
//! dcl cart update 42 3
//! dcl cart remove 42
//! dcl cart show
//! ```

use std::fmt::Write as _;

use dcl_core::{CartSnapshot, VariantId, format_amount};
use dcl_storefront::api::AddToCart;
use dcl_storefront::error::{AppError, add_breadcrumb};
use dcl_storefront::state::AppState;

/// Add a variant to the server cart and record it locally.
///
/// # Errors
///
/// Returns the storefront error when the add is refused or fails.
pub async fn add(state: &mut AppState, request: AddToCart) -> Result<String, AppError> {
    add_breadcrumb("cart", "Add to cart", Some(&[("variant_id", request.variant_id.as_str())]));
    let snapshot = state.storefront().add_to_cart(&request).await?;
    state.cache_mut().record_add(request.to_line());
    Ok(summarize(&snapshot, "Added to cart."))
}

/// Set a line's quantity on the server.
///
/// # Errors
///
/// Returns the storefront error when the update is refused or fails.
pub async fn update(state: &mut AppState, variant: &VariantId, quantity: u32) -> Result<String, AppError> {
    let quantity = state.config().quantity.clamp(quantity);
    add_breadcrumb("cart", "Update quantity", Some(&[("variant_id", variant.as_str())]));
    let snapshot = state.storefront().update_cart(variant, quantity).await?;
    state.cache_mut().set_quantity(variant, quantity);

    let mut out = summarize(&snapshot, "Cart updated.");
    if let Some(item_total) = snapshot.item_total {
        let _ = write!(out, "\nLine total: {}", format_amount(item_total));
    }
    Ok(out)
}

/// Remove a line on the server.
///
/// # Errors
///
/// Returns the storefront error when the removal is refused or fails.
pub async fn remove(state: &mut AppState, variant: &VariantId) -> Result<String, AppError> {
    add_breadcrumb("cart", "Remove item", Some(&[("variant_id", variant.as_str())]));
    let snapshot = state.storefront().remove_from_cart(variant).await?;
    state.cache_mut().remove(variant);

    let mut out = summarize(&snapshot, "Item removed from cart.");
    if snapshot.cart_count == Some(0) {
        out.push_str("\nYour cart is empty.");
    }
    Ok(out)
}

/// Render the locally cached cart.
#[must_use]
pub fn show(state: &AppState) -> String {
    let cache = state.cache();
    if cache.cart().is_empty() {
        return "Your cart is empty.".to_string();
    }

    let mut out = String::new();
    for line in cache.cart() {
        let name = if line.name.is_empty() { line.id.as_str() } else { line.name.as_str() };
        let _ = writeln!(
            out,
            "{:>3} x {name} [{}] @ {} = {}",
            line.quantity,
            line.id,
            format_amount(line.price),
            format_amount(line.line_total())
        );
    }
    let _ = write!(
        out,
        "Subtotal ({} items): {}",
        cache.item_count(),
        format_amount(cache.subtotal())
    );
    out
}

fn summarize(snapshot: &CartSnapshot, fallback: &str) -> String {
    let mut out = snapshot.message().unwrap_or(fallback).to_string();
    if let Some(count) = snapshot.cart_count {
        let _ = write!(out, "\nItems in cart: {count}");
    }
    if let Some(total) = snapshot.cart_total {
        let _ = write!(out, "\nCart total: {}", format_amount(total));
    }
    out
}
