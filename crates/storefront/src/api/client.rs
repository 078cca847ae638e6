//! Storefront AJAX client implementation.
//!
//! Mutations are form-encoded POSTs carrying the anti-forgery token; every
//! response body is parsed as a [`CartSnapshot`] regardless of HTTP status,
//! since business failures arrive as `400` with a JSON body.

use std::sync::Arc;

use dcl_core::{CartLine, CartSnapshot, ProductId, VariantId};
use moka::future::Cache;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::ApiError;
use crate::config::{CSRF_COOKIE_NAME, ClientConfig};
use crate::csrf;

const ADD_PATH: &str = "/cart/add/";
const UPDATE_PATH: &str = "/cart/update/";
const REMOVE_PATH: &str = "/cart/remove/";

/// Message for an add or update without a variant.
pub const MISSING_VARIANT_MESSAGE: &str = "Please select a product option.";

/// Longest body excerpt written to the logs.
const LOG_BODY_LIMIT: usize = 500;

/// An add-to-cart request as read from a product card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCart {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub name: String,
    pub unit_price: Decimal,
    pub image: String,
}

impl AddToCart {
    /// Request with only the fields the server needs.
    #[must_use]
    pub fn new(variant_id: impl Into<VariantId>, quantity: u32) -> Self {
        Self {
            variant_id: variant_id.into(),
            quantity,
            name: String::new(),
            unit_price: Decimal::ZERO,
            image: String::new(),
        }
    }

    /// The local cart line this request produces once confirmed.
    #[must_use]
    pub fn to_line(&self) -> CartLine {
        CartLine {
            id: self.variant_id.clone(),
            name: self.name.clone(),
            price: self.unit_price,
            image: self.image.clone(),
            quantity: self.quantity,
        }
    }
}

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the storefront cart and catalog endpoints.
///
/// Cheap to clone; clones share the HTTP connection pool and fragment cache.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    base_url: Url,
    cookies: Option<SecretString>,
    csrf_token: Option<SecretString>,
    quick_views: Cache<ProductId, String>,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("has_csrf_token", &self.inner.csrf_token.is_some())
            .finish_non_exhaustive()
    }
}

impl StorefrontClient {
    /// Create a new storefront client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "X-Requested-With",
            reqwest::header::HeaderValue::from_static("XMLHttpRequest"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let csrf_token = config
            .cookies
            .as_ref()
            .and_then(|cookies| csrf::csrf_token(cookies, CSRF_COOKIE_NAME));
        if csrf_token.is_none() {
            tracing::warn!("No {CSRF_COOKIE_NAME} cookie configured; cart mutations may be refused");
        }

        let quick_views = Cache::builder()
            .max_capacity(200)
            .time_to_live(config.quick_view_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(StorefrontClientInner {
                client,
                base_url: config.base_url.clone(),
                cookies: config.cookies.clone(),
                csrf_token,
                quick_views,
            }),
        })
    }

    /// Storefront origin this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Attach the configured session cookies, if any.
    fn with_cookies(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.cookies {
            Some(cookies) => request.header(reqwest::header::COOKIE, cookies.expose_secret()),
            None => request,
        }
    }

    /// POST a form to a cart endpoint and interpret the snapshot.
    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<CartSnapshot, ApiError> {
        let url = self.inner.base_url.join(path)?;
        let request_id = Uuid::new_v4();

        let mut request = self
            .with_cookies(self.inner.client.post(url))
            .header("X-Request-Id", request_id.to_string())
            .form(form);
        if let Some(token) = &self.inner.csrf_token {
            request = request.header("X-CSRFToken", token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let snapshot: CartSnapshot = match serde_json::from_str(&body) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    status = %status,
                    request_id = %request_id,
                    body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                    "Cart endpoint returned a body that is not a cart snapshot"
                );
                return Err(ApiError::Parse(e));
            }
        };

        if !snapshot.is_success() {
            tracing::warn!(
                status = %status,
                request_id = %request_id,
                message = snapshot.message().unwrap_or_default(),
                "Cart mutation rejected"
            );
            return Err(ApiError::Rejected {
                message: snapshot.message().map(String::from),
            });
        }

        debug!(
            request_id = %request_id,
            cart_count = ?snapshot.cart_count,
            "Cart mutation accepted"
        );
        Ok(snapshot)
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Add a variant to the server cart.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without sending anything when the variant id is
    /// blank or the quantity is zero, `Rejected` when the server refuses the
    /// add, and a transport error when the call or body parsing fails.
    #[instrument(skip(self, request), fields(variant_id = %request.variant_id, quantity = request.quantity))]
    pub async fn add_to_cart(&self, request: &AddToCart) -> Result<CartSnapshot, ApiError> {
        if request.variant_id.is_blank() {
            return Err(ApiError::Validation(MISSING_VARIANT_MESSAGE.to_string()));
        }
        if request.quantity == 0 {
            return Err(ApiError::Validation(
                "Quantity must be at least 1.".to_string(),
            ));
        }

        self.post_form(
            ADD_PATH,
            &[
                ("variant_id", request.variant_id.to_string()),
                ("quantity", request.quantity.to_string()),
            ],
        )
        .await
    }

    /// Set the quantity of a cart line. Quantities below 1 are sent as 1.
    ///
    /// # Errors
    ///
    /// Same classes as [`Self::add_to_cart`].
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn update_cart(
        &self,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<CartSnapshot, ApiError> {
        if variant_id.is_blank() {
            return Err(ApiError::Validation(MISSING_VARIANT_MESSAGE.to_string()));
        }

        self.post_form(
            UPDATE_PATH,
            &[
                ("variant_id", variant_id.to_string()),
                ("quantity", quantity.max(1).to_string()),
            ],
        )
        .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Same classes as [`Self::add_to_cart`].
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn remove_from_cart(&self, variant_id: &VariantId) -> Result<CartSnapshot, ApiError> {
        if variant_id.is_blank() {
            return Err(ApiError::Validation(
                "Unable to identify the item to remove.".to_string(),
            ));
        }

        self.post_form(REMOVE_PATH, &[("variant_id", variant_id.to_string())])
            .await
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Fetch the quick view HTML fragment for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product id is blank, the request fails, or the
    /// server answers with a non-success status.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn quick_view(&self, product_id: &ProductId) -> Result<String, ApiError> {
        if product_id.is_blank() {
            return Err(ApiError::Validation("Unknown product.".to_string()));
        }

        if let Some(fragment) = self.inner.quick_views.get(product_id).await {
            debug!("Cache hit for quick view");
            return Ok(fragment);
        }

        let path = format!(
            "/catalog/product/{}/quickview/",
            urlencoding::encode(product_id.as_str())
        );
        let url = self.inner.base_url.join(&path)?;

        let response = self.with_cookies(self.inner.client.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Quick view request failed");
            return Err(ApiError::Status(status.as_u16()));
        }

        let fragment = response.text().await?;
        self.inner
            .quick_views
            .insert(product_id.clone(), fragment.clone())
            .await;

        Ok(fragment)
    }
}
