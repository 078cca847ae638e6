//! Cart synchronization against the mock storefront.
//!
//! Each test starts its own mock on an ephemeral port; nothing external is
//! needed.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use dcl_core::{NotificationKind, VariantId};
use dcl_integration_tests::{MockStorefront, await_notification};
use dcl_storefront::dom::{NodeId, Selector};
use dcl_storefront::page::{ADD_FAILED_MESSAGE, PageController};
use dcl_storefront::storage::{MemoryStorage, keys};
use rust_decimal::Decimal;

const PRODUCT_CARD: &str = r#"
    <nav><span class="cart-count d-none">0</span></nav>
    <div class="product-card">
        <div class="d-flex">
            <input class="qty-input" value="1">
            <button class="btn btn-primary add-to-cart-btn" data-variant-id="42"
                data-product-name="Silk Scarf" data-product-price="19.99"
                data-product-image="/media/42.jpg">Add to Cart</button>
        </div>
    </div>"#;

const CART_PAGE: &str = r#"
    <nav><span class="cart-count">1</span></nav>
    <div class="cart-item" data-item-id="42">
        <button class="qty-minus">-</button>
        <input class="qty-input" value="1">
        <button class="qty-plus">+</button>
        <span class="text-primary fw-bold">৳19.99</span>
        <form action="/cart/remove/"><button class="remove-item-btn">Remove</button></form>
    </div>
    <div class="summary-row"><span class="text-muted">Subtotal (1 items)</span><span class="fw-semibold">৳19.99</span></div>
    <div class="summary-total"><span class="h4">৳19.99</span></div>"#;

const CACHED_LINE: &str =
    r#"[{"id":"42","name":"Silk Scarf","price":"19.99","image":"","quantity":1}]"#;

fn node(page: &PageController, selector: &str) -> NodeId {
    page.document()
        .query_selector(&Selector::parse(selector).unwrap())
        .unwrap()
}

fn text(page: &PageController, selector: &str) -> String {
    page.document().text_content(node(page, selector))
}

async fn cart_page(shop: &MockStorefront) -> PageController {
    shop.stock("42", "Silk Scarf", "19.99", 10).await;
    shop.seed_cart("42", 1).await;
    let storage = MemoryStorage::new().with_item(keys::CART, CACHED_LINE);
    PageController::from_html(shop.state(storage), CART_PAGE).unwrap()
}

// ============================================================================
// Add
// ============================================================================

#[tokio::test]
async fn test_add_updates_badge_cache_and_button() {
    let shop = MockStorefront::start().await;
    shop.stock("42", "Silk Scarf", "19.99", 10).await;
    let mut page = shop.page(PRODUCT_CARD);
    let button = node(&page, ".add-to-cart-btn");

    assert!(page.click(button));
    let (kind, message) = await_notification(&mut page).await;
    assert_eq!(kind, NotificationKind::Success);
    assert_eq!(message, "Added Silk Scarf to cart.");

    assert_eq!(text(&page, ".cart-count"), "1");
    assert!(!page.document().has_class(node(&page, ".cart-count"), "d-none"));

    let line = page.cache().line(&VariantId::new("42")).unwrap();
    assert_eq!(line.quantity, 1);
    assert_eq!(line.name, "Silk Scarf");
    assert_eq!(line.price, Decimal::new(1999, 2));
    assert_eq!(line.image, "/media/42.jpg");

    assert!(page.document().has_class(button, "btn-added"));
    assert!(page.document().is_disabled(button));

    page.run_until_idle().await;
    assert!(!page.document().has_class(button, "btn-added"));
    assert!(page.document().has_class(button, "btn-primary"));
    assert!(!page.document().is_disabled(button));
    assert_eq!(page.document().text_content(button), "Add to Cart");

    let received = shop.received().await;
    assert_eq!(received.len(), 1);
    assert!(received.iter().all(|r| r.csrf_ok));
}

#[tokio::test]
async fn test_repeated_adds_sum_and_badge_follows_server() {
    let shop = MockStorefront::start().await;
    shop.stock("42", "Silk Scarf", "19.99", 10).await;
    shop.seed_cart("7", 4).await;
    let mut page = shop.page(PRODUCT_CARD);
    let button = node(&page, ".add-to-cart-btn");

    page.click(button);
    page.run_until_idle().await;
    page.click(button);
    page.run_until_idle().await;

    assert_eq!(page.cache().cart().len(), 1);
    assert_eq!(page.cache().line(&VariantId::new("42")).unwrap().quantity, 2);
    assert_eq!(shop.quantity("42").await, Some(2));
    // Server count includes lines this page never saw
    assert_eq!(text(&page, ".cart-count"), "6");
}

#[tokio::test]
async fn test_add_uses_card_quantity() {
    let shop = MockStorefront::start().await;
    shop.stock("42", "Silk Scarf", "19.99", 10).await;
    let mut page = shop.page(PRODUCT_CARD);
    let input = node(&page, ".qty-input");
    page.document_mut().set_value(input, "3");

    page.click(node(&page, ".add-to-cart-btn"));
    page.run_until_idle().await;

    assert_eq!(shop.quantity("42").await, Some(3));
    assert_eq!(page.cache().item_count(), 3);
    assert_eq!(page.cache().subtotal(), Decimal::new(5997, 2));
}

#[tokio::test]
async fn test_rejected_add_shows_server_message_and_changes_nothing() {
    let shop = MockStorefront::start().await;
    shop.stock("42", "Silk Scarf", "19.99", 1).await;
    let mut page = shop.page(PRODUCT_CARD);
    let input = node(&page, ".qty-input");
    page.document_mut().set_value(input, "3");

    page.click(node(&page, ".add-to-cart-btn"));
    let (kind, message) = await_notification(&mut page).await;
    assert_eq!(kind, NotificationKind::Error);
    assert_eq!(message, "Only 1 left in stock.");

    assert!(page.cache().cart().is_empty());
    assert_eq!(text(&page, ".cart-count"), "0");
    assert!(!page.document().has_class(node(&page, ".add-to-cart-btn"), "btn-added"));
}

#[tokio::test]
async fn test_non_json_response_shows_generic_message() {
    let shop = MockStorefront::start().await;
    // Variant 42 is not stocked, so the mock answers with an HTML 404
    let mut page = shop.page(PRODUCT_CARD);

    page.click(node(&page, ".add-to-cart-btn"));
    let (kind, message) = await_notification(&mut page).await;
    assert_eq!(kind, NotificationKind::Error);
    assert_eq!(message, ADD_FAILED_MESSAGE);
    assert!(page.cache().cart().is_empty());
}

#[tokio::test]
async fn test_missing_csrf_token_is_refused() {
    let shop = MockStorefront::start().await;
    shop.stock("42", "Silk Scarf", "19.99", 10).await;
    let state = dcl_storefront::state::AppState::new(
        dcl_storefront::config::ClientConfig::new(shop.base_url())
            .with_timings(dcl_storefront::config::UiTimings::instant()),
        MemoryStorage::new(),
    )
    .unwrap();
    let mut page = PageController::from_html(state, PRODUCT_CARD).unwrap();

    page.click(node(&page, ".add-to-cart-btn"));
    let (kind, message) = await_notification(&mut page).await;
    assert_eq!(kind, NotificationKind::Error);
    assert_eq!(message, "CSRF verification failed.");
    assert_eq!(shop.quantity("42").await, None);
    assert!(!shop.received().await.iter().any(|r| r.csrf_ok));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_applies_server_totals() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;
    let input = node(&page, ".qty-input");

    page.document_mut().set_value(input, "3");
    assert!(page.change(input));
    page.run_until_idle().await;

    assert_eq!(shop.quantity("42").await, Some(3));
    assert_eq!(text(&page, ".cart-item .text-primary.fw-bold"), "৳59.97");
    assert_eq!(text(&page, ".summary-row .fw-semibold"), "৳59.97");
    assert_eq!(text(&page, ".summary-total .h4"), "৳59.97");
    assert_eq!(text(&page, ".summary-row .text-muted"), "Subtotal (3 items)");
    assert_eq!(text(&page, ".cart-count"), "3");
    assert_eq!(page.cache().line(&VariantId::new("42")).unwrap().quantity, 3);
}

#[tokio::test]
async fn test_stepper_commits_each_step() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;

    page.click(node(&page, ".qty-plus"));
    page.run_until_idle().await;
    page.click(node(&page, ".qty-plus"));
    page.run_until_idle().await;
    page.click(node(&page, ".qty-minus"));
    page.run_until_idle().await;

    assert_eq!(page.document().value(node(&page, ".qty-input")), "2");
    assert_eq!(shop.quantity("42").await, Some(2));
    assert_eq!(shop.received().await.len(), 3);
}

#[tokio::test]
async fn test_rejected_update_reverts_input() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;
    let input = node(&page, ".qty-input");

    page.document_mut().set_value(input, "50");
    page.change(input);
    let (kind, message) = await_notification(&mut page).await;
    assert_eq!(kind, NotificationKind::Error);
    assert_eq!(message, "Only 10 left in stock.");

    assert_eq!(page.document().value(input), "1");
    assert_eq!(shop.quantity("42").await, Some(1));
    assert_eq!(text(&page, ".cart-count"), "1");
    assert_eq!(page.cache().line(&VariantId::new("42")).unwrap().quantity, 1);
}

#[tokio::test]
async fn test_typed_quantity_is_clamped_before_sending() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;
    let input = node(&page, ".qty-input");

    page.document_mut().set_value(input, "0");
    page.change(input);
    assert_eq!(page.document().value(input), "1");
    page.run_until_idle().await;
    assert_eq!(shop.quantity("42").await, Some(1));
}

#[tokio::test]
async fn test_oversized_typed_quantity_clamps_to_max() {
    let shop = MockStorefront::start().await;
    shop.stock("42", "Silk Scarf", "19.99", 1000).await;
    shop.seed_cart("42", 5).await;
    let storage = MemoryStorage::new().with_item(keys::CART, CACHED_LINE);
    let mut page = PageController::from_html(shop.state(storage), CART_PAGE).unwrap();
    let input = node(&page, ".qty-input");

    page.document_mut().set_value(input, "99999999999");
    page.change(input);
    assert_eq!(page.document().value(input), "99");
    page.run_until_idle().await;
    assert_eq!(shop.quantity("42").await, Some(99));
    assert_eq!(text(&page, ".cart-count"), "99");
}

#[tokio::test]
async fn test_input_shows_last_confirmed_quantity_after_rejection() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;
    shop.delay("42", Some(3), Duration::from_millis(300)).await;
    let input = node(&page, ".qty-input");

    // 50 is over stock and fails first; the slower 3 then succeeds
    page.document_mut().set_value(input, "50");
    page.change(input);
    page.document_mut().set_value(input, "3");
    page.change(input);
    page.run_until_idle().await;

    assert_eq!(shop.quantity("42").await, Some(3));
    assert_eq!(page.document().value(input), "3");
    assert_eq!(text(&page, ".cart-item .text-primary.fw-bold"), "৳59.97");
    assert_eq!(text(&page, ".cart-count"), "3");
    assert_eq!(page.cache().line(&VariantId::new("42")).unwrap().quantity, 3);
}

#[tokio::test]
async fn test_overlapping_updates_apply_in_arrival_order() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;
    shop.delay("42", Some(2), Duration::from_millis(300)).await;
    let input = node(&page, ".qty-input");

    page.document_mut().set_value(input, "2");
    page.change(input);
    page.document_mut().set_value(input, "3");
    page.change(input);
    page.run_until_idle().await;

    // The slow response for 2 lands last and wins on both sides
    assert_eq!(shop.quantity("42").await, Some(2));
    assert_eq!(page.document().value(input), "2");
    assert_eq!(text(&page, ".cart-item .text-primary.fw-bold"), "৳39.98");
    assert_eq!(text(&page, ".cart-count"), "2");
    assert_eq!(page.cache().line(&VariantId::new("42")).unwrap().quantity, 2);
}

// ============================================================================
// Remove
// ============================================================================

#[tokio::test]
async fn test_removing_last_line_requests_reload() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;
    let row = node(&page, ".cart-item");

    assert!(page.click(node(&page, ".remove-item-btn")));
    let (kind, message) = await_notification(&mut page).await;
    assert_eq!(kind, NotificationKind::Success);
    assert_eq!(message, "Item removed from cart.");
    assert!(page.document().has_class(row, "animate-fadeOut"));
    assert!(page.cache().cart().is_empty());

    page.run_until_idle().await;
    assert!(!page.document().is_connected(row));
    assert!(page.reload_requested());
    assert_eq!(text(&page, ".cart-count"), "0");
    assert_eq!(shop.quantity("42").await, None);
}

#[tokio::test]
async fn test_removing_one_of_two_lines_keeps_the_page() {
    let shop = MockStorefront::start().await;
    shop.stock("42", "Silk Scarf", "19.99", 10).await;
    shop.stock("7", "Linen Shirt", "45.00", 10).await;
    shop.seed_cart("42", 1).await;
    shop.seed_cart("7", 1).await;
    let markup = r#"
        <span class="cart-count">2</span>
        <div class="cart-item" data-item-id="42">
            <input class="qty-input" value="1">
            <form><button class="remove-item-btn">Remove</button></form>
        </div>
        <div class="cart-item" data-item-id="7">
            <input class="qty-input" value="1">
            <span class="text-primary fw-bold">৳45.00</span>
            <form><button class="remove-item-btn">Remove</button></form>
        </div>"#;
    let mut page = shop.page(markup);

    page.click(node(&page, ".remove-item-btn"));
    page.run_until_idle().await;
    assert!(!page.reload_requested());
    assert_eq!(page.document().query_selector_all(&Selector::parse(".cart-item").unwrap()).len(), 1);
    assert_eq!(text(&page, ".cart-count"), "1");

    // The surviving row keeps its bindings
    let input = node(&page, ".cart-item .qty-input");
    page.document_mut().set_value(input, "2");
    page.change(input);
    page.run_until_idle().await;
    assert_eq!(shop.quantity("7").await, Some(2));
    assert_eq!(text(&page, ".cart-item .text-primary.fw-bold"), "৳90.00");
}

#[tokio::test]
async fn test_failed_remove_keeps_row() {
    let shop = MockStorefront::start().await;
    let mut page = cart_page(&shop).await;
    let row = node(&page, ".cart-item");
    // Drop the line server-side so the removal is refused
    shop.seed_cart("42", 0).await;
    page.click(node(&page, ".remove-item-btn"));
    page.run_until_idle().await;

    assert!(page.document().is_connected(row));
    assert!(!page.document().has_class(row, "animate-fadeOut"));
    assert!(!page.reload_requested());
    assert_eq!(page.cache().cart().len(), 1);
}
