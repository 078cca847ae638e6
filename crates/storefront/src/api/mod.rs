//! Storefront HTTP API client.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the storefront's AJAX endpoints
//! - The server is the source of truth: every mutation returns a
//!   [`CartSnapshot`](dcl_core::CartSnapshot) with authoritative totals
//! - No retries, no timeouts, no request deduplication; a failed call is
//!   terminal for the gesture that issued it
//! - Quick view fragments are cached in memory via `moka`
//!
//! # Endpoints
//!
//! - `POST /cart/add/` - `variant_id`, `quantity`
//! - `POST /cart/update/` - `variant_id`, `quantity`
//! - `POST /cart/remove/` - `variant_id`
//! - `GET /catalog/product/{id}/quickview/` - HTML fragment
//!
//! # Example
//!
//! ```rust,ignore
//! use dcl_storefront::api::{AddToCart, StorefrontClient};
//!
//! let client = StorefrontClient::new(&config)?;
//! let snapshot = client.add_to_cart(&AddToCart::new("42", 1)).await?;
//! println!("{} items in cart", snapshot.cart_count.unwrap_or(0));
//! ```

mod client;

pub use client::{AddToCart, MISSING_VARIANT_MESSAGE, StorefrontClient};

use thiserror::Error;

/// Errors that can occur when talking to the storefront.
///
/// Variants follow the three failure classes the UI distinguishes:
/// validation (nothing sent), business rejection (server message shown
/// verbatim) and transport (generic message, logged for diagnostics).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request rejected locally before anything was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server answered with a non-success status.
    #[error("Rejected: {}", message.as_deref().unwrap_or("(no message)"))]
    Rejected { message: Option<String> },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Non-success HTTP status on an endpoint that returns markup.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Endpoint URL could not be built from the base URL.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Text to show the user for this failure.
    ///
    /// Validation and server messages are shown as-is; everything else (and a
    /// rejection without a message) falls back to `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(message) | Self::Rejected { message: Some(message) } => {
                message.clone()
            }
            _ => fallback.to_string(),
        }
    }

    /// Whether this is a transport or protocol failure worth reporting.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Parse(_) | Self::Status(_) | Self::Url(_)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Failed to add product to cart. Please try again.";

    #[test]
    fn test_rejection_message_is_verbatim() {
        let err = ApiError::Rejected {
            message: Some("Only 2 items available in stock.".to_string()),
        };
        assert_eq!(err.user_message(FALLBACK), "Only 2 items available in stock.");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_rejection_without_message_uses_fallback() {
        let err = ApiError::Rejected { message: None };
        assert_eq!(err.user_message(FALLBACK), FALLBACK);
        assert_eq!(err.to_string(), "Rejected: (no message)");
    }

    #[test]
    fn test_parse_error_uses_fallback() {
        let err = ApiError::from(serde_json::from_str::<u32>("<html>").unwrap_err());
        assert_eq!(err.user_message(FALLBACK), FALLBACK);
        assert!(err.is_transport());
    }

    #[test]
    fn test_validation_message() {
        let err = ApiError::Validation("Please select a product option.".to_string());
        assert_eq!(err.user_message(FALLBACK), "Please select a product option.");
        assert_eq!(
            err.to_string(),
            "Validation error: Please select a product option."
        );
    }

    #[test]
    fn test_status_error_display() {
        assert_eq!(ApiError::Status(404).to_string(), "Unexpected HTTP status 404");
    }
}
