//! Unified error handling with Sentry integration.
//!
//! Subsystems keep their own error types; `AppError` gathers them for
//! callers (the CLI, page setup) that can fail in more than one way. Failures
//! inside user gestures never surface here: they degrade to a notification.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::dom::{MarkupError, SelectorError};
use crate::storage::StorageError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storefront call failed.
    #[error("Storefront error: {0}")]
    Api(#[from] ApiError),

    /// Persistent storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Page markup could not be parsed.
    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    /// Selector could not be parsed.
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),
}

impl AppError {
    /// Whether this error is worth a Sentry event.
    ///
    /// Validation failures and business rejections are expected outcomes of
    /// user input; everything else points at a broken deployment or network.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_transport(),
            Self::Config(_) | Self::Storage(_) | Self::Markup(_) | Self::Selector(_) => true,
        }
    }

    /// Log the error and capture it to Sentry when reportable.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront client error"
            );
        } else {
            tracing::warn!(error = %self, "Storefront client error");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Log a transport failure from a gesture and capture it to Sentry.
pub fn capture_api_error(operation: &str, err: &ApiError) {
    if err.is_transport() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            operation,
            error = %err,
            sentry_event_id = %event_id,
            "Storefront request failed"
        );
    } else {
        tracing::warn!(operation, error = %err, "Storefront request refused");
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Add to cart", Some(&[("variant_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
