//! Gesture handlers: read the document, produce an [`Intent`].

use std::collections::HashMap;
use std::str::FromStr;

use dcl_core::{ProductId, QuantityBounds, VariantId};
use rust_decimal::Decimal;

use super::{Intent, Step};
use crate::api::AddToCart;
use crate::classes;
use crate::dispatch::{EventKind, Hit, Registry};
use crate::dom::{Document, NodeId};
use crate::notify::NotificationId;

/// Delegated bindings: these keep working for markup injected later.
pub(super) fn bind_delegated(registry: &mut Registry<Intent>) {
    registry.delegate(
        EventKind::Click,
        classes::QUICK_VIEW_BUTTON.clone(),
        |doc, hit| {
            Some(Intent::QuickView {
                product: ProductId::new(doc.data(hit.current, "product-id").unwrap_or_default()),
            })
        },
    );

    registry.delegate(EventKind::Click, classes::ADD_TO_CART.clone(), |doc, hit| {
        Some(Intent::AddToCart {
            button: hit.current,
            request: read_add_request(doc, hit.current),
        })
    });

    registry.delegate(
        EventKind::Click,
        classes::WISHLIST_BUTTON.clone(),
        |doc, hit| {
            let product = doc.data_non_blank(hit.current, "product-id")?;
            Some(Intent::ToggleWishlist {
                button: hit.current,
                product: ProductId::new(product),
            })
        },
    );

    registry.delegate(
        EventKind::Click,
        classes::NOTIFICATION_CLOSE_SELECTOR.clone(),
        |doc, hit| {
            doc.data(hit.current, "notification-id")
                .and_then(NotificationId::parse)
                .map(Intent::CloseNotification)
        },
    );

    registry.delegate(
        EventKind::Click,
        classes::QUANTITY_SELECTOR_STEPPER.clone(),
        |doc, hit| {
            let selector = doc.closest(hit.current, &classes::QUANTITY_SELECTOR)?;
            let input = doc.query_selector_in(selector, &classes::QTY_INPUT)?;
            Some(Intent::Step {
                input,
                step: step_for(doc, hit.current),
            })
        },
    );

    registry.delegate(
        EventKind::Change,
        classes::QUANTITY_SELECTOR_INPUT.clone(),
        |doc, hit| {
            let selector = doc.closest(hit.current, &classes::QUANTITY_SELECTOR)?;
            let product = doc.data_non_blank(selector, "product-id")?;
            Some(Intent::MirrorQuantity {
                id: VariantId::new(product),
                quantity: QuantityBounds::parse_input(&doc.value(hit.current)),
            })
        },
    );
}

/// Direct bindings for the cart rows present at load.
///
/// Returns the initial committed quantity of every bound row input.
pub(super) fn bind_cart_rows(registry: &mut Registry<Intent>, doc: &Document) -> HashMap<NodeId, u32> {
    let mut committed = HashMap::new();

    for row in doc.query_selector_all(&classes::CART_ITEM) {
        let Some(variant) = doc.data_non_blank(row, "item-id").map(VariantId::new) else {
            tracing::warn!("Cart row without data-item-id; leaving it unbound");
            continue;
        };

        if let Some(input) = doc.query_selector_in(row, &classes::QTY_INPUT) {
            committed.insert(input, QuantityBounds::parse_input(&doc.value(input)));

            let line = variant.clone();
            registry.direct(EventKind::Change, input, move |doc: &Document, hit: Hit| {
                Some(Intent::UpdateLine {
                    row,
                    input: hit.current,
                    variant: line.clone(),
                    quantity: QuantityBounds::parse_input(&doc.value(hit.current)),
                })
            });

            for (selector, step) in [(&*classes::QTY_MINUS, Step::Down), (&*classes::QTY_PLUS, Step::Up)] {
                if let Some(button) = doc.query_selector_in(row, selector) {
                    registry.direct(EventKind::Click, button, move |_, _| {
                        Some(Intent::Step { input, step })
                    });
                }
            }
        }

        let remove_form = doc
            .query_selector_in(row, &classes::REMOVE_BUTTON)
            .and_then(|button| doc.closest(button, &classes::FORM).map(|form| (button, form)));
        if let Some((button, form)) = remove_form {
            registry.direct(EventKind::Submit, form, move |_, _| {
                Some(Intent::RemoveLine {
                    row,
                    variant: variant.clone(),
                })
            });
            registry.direct(EventKind::Click, button, move |_, _| Some(Intent::SubmitForm(form)));
        }
    }

    committed
}

fn step_for(doc: &Document, button: NodeId) -> Step {
    if doc.matches(button, &classes::QTY_MINUS) {
        Step::Down
    } else {
        Step::Up
    }
}

/// Read an add-to-cart request from a button and its surroundings.
///
/// The quantity comes from a `.qty-input` in the button's nearest `.d-flex`
/// container, or failing that its form; without one it is 1.
pub(super) fn read_add_request(doc: &Document, button: NodeId) -> AddToCart {
    let variant_id = doc
        .data_non_blank(button, "variant-id")
        .or_else(|| doc.data_non_blank(button, "product-id"))
        .unwrap_or_default();

    let quantity = doc
        .closest(button, &classes::FLEX_ROW)
        .or_else(|| doc.closest(button, &classes::FORM))
        .and_then(|scope| doc.query_selector_in(scope, &classes::QTY_INPUT))
        .map_or(QuantityBounds::MIN, |input| QuantityBounds::parse_input(&doc.value(input)));

    let unit_price = doc
        .data(button, "product-price")
        .and_then(|raw| Decimal::from_str(raw.trim()).ok())
        .unwrap_or_default();

    AddToCart {
        variant_id: VariantId::new(variant_id),
        quantity,
        name: doc.data(button, "product-name").unwrap_or_default().to_string(),
        unit_price,
        image: doc.data(button, "product-image").unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::dispatch::{Dispatch, Event};
    use crate::dom::Selector;

    fn node(doc: &Document, selector: &str) -> NodeId {
        doc.query_selector(&Selector::parse(selector).unwrap()).unwrap()
    }

    #[test]
    fn test_add_request_reads_card() {
        let doc = Document::from_html(
            r#"<div class="product-card"><div class="d-flex">
                 <input class="qty-input" value="3">
                 <button class="add-to-cart-btn" data-product-id="p1" data-variant-id="42"
                   data-product-name="Silk Scarf" data-product-price="19.99" data-product-image="/m/42.jpg">Add</button>
               </div></div>"#,
        )
        .unwrap();
        let request = read_add_request(&doc, node(&doc, ".add-to-cart-btn"));
        assert_eq!(request.variant_id.as_str(), "42");
        assert_eq!(request.quantity, 3);
        assert_eq!(request.name, "Silk Scarf");
        assert_eq!(request.unit_price, Decimal::from_str("19.99").unwrap());
        assert_eq!(request.image, "/m/42.jpg");
    }

    #[test]
    fn test_add_request_falls_back_to_product_id_and_one() {
        let doc = Document::from_html(
            r#"<button class="add-to-cart-btn" data-product-id="7" data-product-price="n/a">Add</button>"#,
        )
        .unwrap();
        let request = read_add_request(&doc, node(&doc, ".add-to-cart-btn"));
        assert_eq!(request.variant_id.as_str(), "7");
        assert_eq!(request.quantity, 1);
        assert_eq!(request.unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_add_request_flex_row_wins_over_form() {
        let doc = Document::from_html(
            r#"<form><input class="qty-input" value="5">
                 <div class="d-flex"><button class="add-to-cart-btn" data-variant-id="1">Add</button></div>
               </form>"#,
        )
        .unwrap();
        let request = read_add_request(&doc, node(&doc, ".add-to-cart-btn"));
        assert_eq!(request.quantity, 1);
    }

    #[test]
    fn test_cart_rows_bind_controls() {
        let doc = Document::from_html(
            r#"<div class="cart-item" data-item-id="42">
                 <button class="qty-minus">-</button><input class="qty-input" value="2"><button class="qty-plus">+</button>
                 <form action="/cart/remove/"><input type="hidden" name="variant_id" value="42"><button class="remove-item-btn">x</button></form>
               </div>
               <div class="cart-item"><input class="qty-input" value="1"></div>"#,
        )
        .unwrap();
        let mut registry = Registry::new();
        let committed = bind_cart_rows(&mut registry, &doc);
        assert_eq!(committed.len(), 1);
        assert_eq!(registry.len(), 5);

        let input = node(&doc, ".cart-item .qty-input");
        assert_eq!(committed.get(&input), Some(&2));
        assert_eq!(
            registry.dispatch(&doc, Event::click(node(&doc, ".qty-plus"))),
            Dispatch::Intent(Intent::Step { input, step: Step::Up })
        );

        let form = node(&doc, "form");
        assert_eq!(
            registry.dispatch(&doc, Event::click(node(&doc, ".remove-item-btn"))),
            Dispatch::Intent(Intent::SubmitForm(form))
        );
        assert!(matches!(
            registry.dispatch(&doc, Event::submit(form)),
            Dispatch::Intent(Intent::RemoveLine { .. })
        ));
    }

    #[test]
    fn test_wishlist_without_product_is_consumed() {
        let doc = Document::from_html(r#"<button class="wishlist-btn">♡</button>"#).unwrap();
        let mut registry = Registry::new();
        bind_delegated(&mut registry);
        assert_eq!(
            registry.dispatch(&doc, Event::click(node(&doc, ".wishlist-btn"))),
            Dispatch::Consumed
        );
    }

    #[test]
    fn test_quantity_selector_change_mirrors_only_with_product() {
        let doc = Document::from_html(
            r#"<div class="quantity-selector" data-product-id="42"><input class="qty-input" value="4"></div>
               <div class="quantity-selector" id="bare"><input class="qty-input" value="2"></div>"#,
        )
        .unwrap();
        let mut registry = Registry::new();
        bind_delegated(&mut registry);

        let inputs = doc.query_selector_all(&classes::QTY_INPUT);
        assert_eq!(
            registry.dispatch(&doc, Event::change(inputs[0])),
            Dispatch::Intent(Intent::MirrorQuantity {
                id: VariantId::new("42"),
                quantity: 4
            })
        );
        assert_eq!(registry.dispatch(&doc, Event::change(inputs[1])), Dispatch::Consumed);
    }
}
