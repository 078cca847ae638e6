//! End-to-end test support for the DCL storefront client.
//!
//! [`MockStorefront`] serves the cart and quick view endpoints on an
//! ephemeral port with an in-memory catalog, so the real
//! [`StorefrontClient`](dcl_storefront::api::StorefrontClient) and
//! [`PageController`] can be exercised without a live shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dcl-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let shop = MockStorefront::start().await;
//! shop.stock("42", "Silk Scarf", "19.99", 10).await;
//!
//! let mut page = shop.page(PRODUCT_CARD);
//! page.click(button);
//! let (kind, message) = await_notification(&mut page).await;
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use dcl_core::NotificationKind;
use dcl_storefront::config::{ClientConfig, UiTimings};
use dcl_storefront::page::PageController;
use dcl_storefront::state::AppState;
use dcl_storefront::storage::MemoryStorage;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use url::Url;

/// Token the mock expects in `X-CSRFToken`.
pub const CSRF_TOKEN: &str = "test-csrf-token";

// =============================================================================
// Mock storefront
// =============================================================================

#[derive(Debug, Clone)]
struct Product {
    name: String,
    price: Decimal,
    stock: u32,
}

/// A request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub path: &'static str,
    pub variant_id: String,
    pub csrf_ok: bool,
}

#[derive(Debug, Default)]
struct Shop {
    catalog: HashMap<String, Product>,
    cart: BTreeMap<String, u32>,
    quick_views: HashMap<String, String>,
    delays: HashMap<(String, Option<u32>), Duration>,
    received: Vec<Received>,
}

impl Shop {
    fn cart_count(&self) -> u32 {
        self.cart.values().sum()
    }

    fn cart_total(&self) -> Decimal {
        self.cart
            .iter()
            .filter_map(|(id, qty)| Some(self.catalog.get(id)?.price * Decimal::from(*qty)))
            .sum()
    }

    fn record(&mut self, path: &'static str, variant_id: &str, headers: &HeaderMap) -> bool {
        let csrf_ok = headers
            .get("X-CSRFToken")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == CSRF_TOKEN);
        self.received.push(Received {
            path,
            variant_id: variant_id.to_string(),
            csrf_ok,
        });
        csrf_ok
    }
}

type Shared = Arc<Mutex<Shop>>;

/// In-process storefront serving the cart AJAX endpoints.
#[derive(Debug, Clone)]
pub struct MockStorefront {
    addr: SocketAddr,
    shop: Shared,
}

impl MockStorefront {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let shop = Shared::default();
        let router = Router::new()
            .route("/cart/add/", post(add))
            .route("/cart/update/", post(update))
            .route("/cart/remove/", post(remove))
            .route("/catalog/product/{id}/quickview/", get(quick_view))
            .with_state(shop.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind mock storefront: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("mock storefront address: {e}"));

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                panic!("mock storefront stopped: {e}");
            }
        });

        Self { addr, shop }
    }

    /// Origin of the mock.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr))
            .unwrap_or_else(|e| panic!("mock storefront URL: {e}"))
    }

    /// Put a variant on sale with `stock` units available.
    ///
    /// # Panics
    ///
    /// Panics if `price` is not a decimal.
    pub async fn stock(&self, variant_id: &str, name: &str, price: &str, stock: u32) {
        let price = Decimal::from_str(price).unwrap_or_else(|e| panic!("price {price}: {e}"));
        self.shop.lock().await.catalog.insert(
            variant_id.to_string(),
            Product {
                name: name.to_string(),
                price,
                stock,
            },
        );
    }

    /// Set a server cart line without going through the endpoints. A zero
    /// quantity drops the line.
    pub async fn seed_cart(&self, variant_id: &str, quantity: u32) {
        let mut shop = self.shop.lock().await;
        if quantity == 0 {
            shop.cart.remove(variant_id);
        } else {
            shop.cart.insert(variant_id.to_string(), quantity);
        }
    }

    /// Serve `fragment` as the product's quick view.
    pub async fn quick_view_fragment(&self, product_id: &str, fragment: &str) {
        self.shop
            .lock()
            .await
            .quick_views
            .insert(product_id.to_string(), fragment.to_string());
    }

    /// Hold back every request for `variant_id` carrying `quantity` (`None`
    /// for removals) by `delay` before it is processed.
    pub async fn delay(&self, variant_id: &str, quantity: Option<u32>, delay: Duration) {
        self.shop
            .lock()
            .await
            .delays
            .insert((variant_id.to_string(), quantity), delay);
    }

    /// Server-side quantity of a line.
    pub async fn quantity(&self, variant_id: &str) -> Option<u32> {
        self.shop.lock().await.cart.get(variant_id).copied()
    }

    /// Every request received so far, oldest first.
    pub async fn received(&self) -> Vec<Received> {
        self.shop.lock().await.received.clone()
    }

    /// Client configuration pointing at this mock, with the anti-forgery
    /// cookie set and instant timers.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url())
            .with_cookies(format!("sessionid=s1; csrftoken={CSRF_TOKEN}"))
            .with_timings(UiTimings::instant())
    }

    /// Application state backed by in-memory storage.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn state(&self, storage: MemoryStorage) -> AppState {
        AppState::new(self.config(), storage)
            .unwrap_or_else(|e| panic!("storefront client: {e}"))
    }

    /// A page over `markup` with an empty local cache.
    ///
    /// # Panics
    ///
    /// Panics if the markup does not parse.
    #[must_use]
    pub fn page(&self, markup: &str) -> PageController {
        PageController::from_html(self.state(MemoryStorage::new()), markup)
            .unwrap_or_else(|e| panic!("page markup: {e}"))
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
struct LineForm {
    variant_id: String,
    quantity: Option<u32>,
}

fn rejected(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Html("<h1>Not Found</h1>")).into_response()
}

async fn hold(shop: &Shared, form: &LineForm) {
    let key = (form.variant_id.clone(), form.quantity);
    let delay = shop.lock().await.delays.get(&key).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

async fn add(State(shop): State<Shared>, headers: HeaderMap, Form(form): Form<LineForm>) -> Response {
    hold(&shop, &form).await;
    let mut shop = shop.lock().await;
    if !shop.record("/cart/add/", &form.variant_id, &headers) {
        return rejected(StatusCode::FORBIDDEN, "CSRF verification failed.");
    }
    let Some(product) = shop.catalog.get(&form.variant_id).cloned() else {
        return not_found();
    };

    let quantity = form.quantity.unwrap_or(1);
    let in_cart = shop.cart.get(&form.variant_id).copied().unwrap_or(0);
    if in_cart + quantity > product.stock {
        return rejected(
            StatusCode::BAD_REQUEST,
            &format!("Only {} left in stock.", product.stock),
        );
    }

    shop.cart.insert(form.variant_id, in_cart + quantity);
    Json(json!({
        "status": "success",
        "message": format!("Added {} to cart.", product.name),
        "cart_count": shop.cart_count(),
        "cart_total": shop.cart_total(),
    }))
    .into_response()
}

async fn update(State(shop): State<Shared>, headers: HeaderMap, Form(form): Form<LineForm>) -> Response {
    hold(&shop, &form).await;
    let mut shop = shop.lock().await;
    if !shop.record("/cart/update/", &form.variant_id, &headers) {
        return rejected(StatusCode::FORBIDDEN, "CSRF verification failed.");
    }
    let Some(product) = shop.catalog.get(&form.variant_id).cloned() else {
        return not_found();
    };
    if !shop.cart.contains_key(&form.variant_id) {
        return rejected(StatusCode::BAD_REQUEST, "Item is not in your cart.");
    }

    let quantity = form.quantity.unwrap_or(1).max(1);
    if quantity > product.stock {
        return rejected(
            StatusCode::BAD_REQUEST,
            &format!("Only {} left in stock.", product.stock),
        );
    }

    shop.cart.insert(form.variant_id, quantity);
    Json(json!({
        "status": "success",
        "cart_count": shop.cart_count(),
        "cart_total": shop.cart_total(),
        "item_total": product.price * Decimal::from(quantity),
    }))
    .into_response()
}

async fn remove(State(shop): State<Shared>, headers: HeaderMap, Form(form): Form<LineForm>) -> Response {
    hold(&shop, &form).await;
    let mut shop = shop.lock().await;
    if !shop.record("/cart/remove/", &form.variant_id, &headers) {
        return rejected(StatusCode::FORBIDDEN, "CSRF verification failed.");
    }
    if shop.cart.remove(&form.variant_id).is_none() {
        return rejected(StatusCode::BAD_REQUEST, "Item is not in your cart.");
    }

    Json(json!({
        "status": "success",
        "message": "Item removed from cart.",
        "cart_count": shop.cart_count(),
        "cart_total": shop.cart_total(),
    }))
    .into_response()
}

async fn quick_view(State(shop): State<Shared>, Path(id): Path<String>) -> Response {
    shop.lock()
        .await
        .quick_views
        .get(&id)
        .cloned()
        .map_or_else(not_found, |fragment| Html(fragment).into_response())
}

// =============================================================================
// Page helpers
// =============================================================================

/// Apply completions until a notification that was not showing before
/// appears, and return its kind and message.
///
/// # Panics
///
/// Panics if the page runs out of pending work first.
pub async fn await_notification(page: &mut PageController) -> (NotificationKind, String) {
    let before: HashSet<_> = page.notifications().active().map(|(id, _, _)| id).collect();
    loop {
        let fresh = page
            .notifications()
            .active()
            .find(|(id, _, _)| !before.contains(id))
            .map(|(_, kind, message)| (kind, message.to_string()));
        if let Some(fresh) = fresh {
            return fresh;
        }
        assert!(page.next().await, "page went idle without a notification");
    }
}
