//! The CSS-class contract between page markup and the client.
//!
//! Templates are free to omit any of these; every lookup is optional.

use std::sync::LazyLock;

use crate::dom::Selector;

// =============================================================================
// State classes
// =============================================================================

pub const HIDDEN: &str = "d-none";
pub const BOUNCE_IN: &str = "animate-bounceIn";
pub const FADE_OUT: &str = "animate-fadeOut";
pub const SLIDE_IN_RIGHT: &str = "animate-slideInRight";
pub const HEARTBEAT: &str = "animate-heartbeat";
pub const ACTIVE: &str = "active";
pub const ADDED: &str = "btn-added";
pub const SHOW: &str = "show";

// =============================================================================
// Notifications
// =============================================================================

pub const NOTIFICATION_CONTAINER: &str = "notification-container";
pub const NOTIFICATION_TOAST: &str = "notification-toast";
pub const NOTIFICATION_MESSAGE: &str = "notification-message";
pub const NOTIFICATION_CLOSE: &str = "notification-close";

// =============================================================================
// Quick view
// =============================================================================

pub const QUICK_VIEW_MODAL_ID: &str = "quickViewModal";
pub const QUICK_VIEW_CONTENT_ID: &str = "qv-modal-content";
pub const CART_ITEM_COUNT_ID: &str = "cartItemCount";

// =============================================================================
// Selectors
// =============================================================================

macro_rules! selectors {
    ($($(#[$meta:meta])* $name:ident = $source:literal;)*) => {
        $(
            $(#[$meta])*
            pub static $name: LazyLock<Selector> = LazyLock::new(|| Selector::fixed($source));
        )*

        #[cfg(test)]
        const ALL_SELECTORS: &[&str] = &[$($source),*];
    };
}

selectors! {
    /// Header and floating cart badges.
    CART_BADGES = ".cart-count, .floating-cart-count";
    /// Cart page subtotal label.
    SUBTOTAL = ".summary-row .fw-semibold";
    /// Cart page total label.
    TOTAL = ".summary-total .h4";
    /// "Subtotal (N items)" caption.
    SUBTOTAL_CAPTION = ".summary-row .text-muted";
    /// A cart page row.
    CART_ITEM = ".cart-item";
    /// Per-line total inside a cart row.
    LINE_TOTAL = ".text-primary.fw-bold";
    /// Quantity input.
    QTY_INPUT = ".qty-input";
    /// Decrement stepper.
    QTY_MINUS = ".qty-minus";
    /// Increment stepper.
    QTY_PLUS = ".qty-plus";
    /// Remove button inside a cart row.
    REMOVE_BUTTON = ".remove-item-btn";
    /// Preferred ancestor scoping a card's quantity input.
    FLEX_ROW = ".d-flex";
    FORM = "form";
    ADD_TO_CART = ".add-to-cart-btn";
    WISHLIST_BUTTON = ".wishlist-btn";
    WISHLIST_BUTTON_WITH_ID = ".wishlist-btn[data-product-id]";
    QUICK_VIEW_BUTTON = ".quick-view-btn";
    /// Product-page quantity selector.
    QUANTITY_SELECTOR = ".quantity-selector";
    /// Stepper buttons inside a product-page quantity selector.
    QUANTITY_SELECTOR_STEPPER = ".quantity-selector .qty-minus, .quantity-selector .qty-plus";
    /// Quantity input inside a product-page quantity selector.
    QUANTITY_SELECTOR_INPUT = ".quantity-selector .qty-input";
    NOTIFICATION_CONTAINER_SELECTOR = ".notification-container";
    NOTIFICATION_CLOSE_SELECTOR = ".notification-close";
}
