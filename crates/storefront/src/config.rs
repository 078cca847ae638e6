//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DCL_BASE_URL` - Storefront origin the cart endpoints live under
//!
//! ## Optional
//! - `DCL_COOKIE` - Raw cookie string (holds the `csrftoken` anti-forgery cookie)
//! - `DCL_STORAGE_DIR` - Directory for persistent local storage (default: .dcl)
//! - `DCL_MAX_QUANTITY` - Stepper upper bound (default: 99)
//! - `DCL_NOTIFICATION_MS` - How long a notification stays visible (default: 5000)
//! - `DCL_NOTIFICATION_EXIT_MS` - Notification exit animation (default: 400)
//! - `DCL_ROW_EXIT_MS` - Cart row exit animation (default: 400)
//! - `DCL_ADDED_FEEDBACK_MS` - "Added" button feedback (default: 2000)
//! - `DCL_HEARTBEAT_MS` - Wishlist heartbeat animation (default: 500)
//! - `DCL_QUICKVIEW_CACHE_SECS` - Quick view fragment cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dcl_core::QuantityBounds;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Name of the cookie carrying the anti-forgery token.
pub const CSRF_COOKIE_NAME: &str = "csrftoken";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the cookie string.
#[derive(Clone)]
pub struct ClientConfig {
    /// Storefront origin (e.g., <https://shop.example.com/>)
    pub base_url: Url,
    /// Raw `document.cookie`-style string
    pub cookies: Option<SecretString>,
    /// Directory backing persistent local storage
    pub storage_dir: PathBuf,
    /// Quantity stepper bounds
    pub quantity: QuantityBounds,
    /// Animation and display durations
    pub timings: UiTimings,
    /// Quick view fragment cache TTL
    pub quick_view_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("cookies", &self.cookies.as_ref().map(|_| "[REDACTED]"))
            .field("storage_dir", &self.storage_dir)
            .field("quantity", &self.quantity)
            .field("timings", &self.timings)
            .field("quick_view_ttl", &self.quick_view_ttl)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

/// Display durations for transient UI states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiTimings {
    /// Time a notification stays visible before dismissing itself.
    pub notification_display: Duration,
    /// Notification exit animation.
    pub notification_exit: Duration,
    /// Cart row exit animation before the row is detached.
    pub row_exit: Duration,
    /// How long an add-to-cart button shows "Added".
    pub added_feedback: Duration,
    /// Wishlist heartbeat animation.
    pub heartbeat: Duration,
}

impl Default for UiTimings {
    fn default() -> Self {
        Self {
            notification_display: Duration::from_millis(5000),
            notification_exit: Duration::from_millis(400),
            row_exit: Duration::from_millis(400),
            added_feedback: Duration::from_millis(2000),
            heartbeat: Duration::from_millis(500),
        }
    }
}

impl UiTimings {
    /// Every transition happens on the next turn of the task loop.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            notification_display: Duration::ZERO,
            notification_exit: Duration::ZERO,
            row_exit: Duration::ZERO,
            added_feedback: Duration::ZERO,
            heartbeat: Duration::ZERO,
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the storefront origin.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            cookies: None,
            storage_dir: PathBuf::from(".dcl"),
            quantity: QuantityBounds::default(),
            timings: UiTimings::default(),
            quick_view_ttl: Duration::from_secs(300),
            sentry_dsn: None,
        }
    }

    /// Attach a cookie string.
    #[must_use]
    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(SecretString::from(cookies.into()));
        self
    }

    /// Replace the UI timings.
    #[must_use]
    pub const fn with_timings(mut self, timings: UiTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = Url::parse(&get_required_env("DCL_BASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("DCL_BASE_URL".to_string(), e.to_string()))?;

        let defaults = UiTimings::default();
        let timings = UiTimings {
            notification_display: get_millis("DCL_NOTIFICATION_MS", defaults.notification_display)?,
            notification_exit: get_millis("DCL_NOTIFICATION_EXIT_MS", defaults.notification_exit)?,
            row_exit: get_millis("DCL_ROW_EXIT_MS", defaults.row_exit)?,
            added_feedback: get_millis("DCL_ADDED_FEEDBACK_MS", defaults.added_feedback)?,
            heartbeat: get_millis("DCL_HEARTBEAT_MS", defaults.heartbeat)?,
        };

        Ok(Self {
            base_url,
            cookies: get_optional_env("DCL_COOKIE").map(SecretString::from),
            storage_dir: PathBuf::from(get_env_or_default("DCL_STORAGE_DIR", ".dcl")),
            quantity: QuantityBounds::new(get_parsed("DCL_MAX_QUANTITY", "99")?),
            timings,
            quick_view_ttl: Duration::from_secs(get_parsed("DCL_QUICKVIEW_CACHE_SECS", "300")?),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn get_millis(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match get_optional_env(key) {
        Some(raw) => parse_value::<u64>(key, &raw).map(Duration::from_millis),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u32>("DCL_MAX_QUANTITY", "many").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "DCL_MAX_QUANTITY"));
    }

    #[test]
    fn test_parse_value_trims() {
        assert_eq!(parse_value::<u64>("X", " 250 ").unwrap(), 250);
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(Url::parse("http://localhost:8000").unwrap());
        assert_eq!(config.quantity.max(), 99);
        assert_eq!(config.timings.notification_display, Duration::from_secs(5));
        assert_eq!(config.timings.notification_exit, Duration::from_millis(400));
        assert_eq!(config.quick_view_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_debug_redacts_cookies() {
        let config = ClientConfig::new(Url::parse("http://localhost:8000").unwrap())
            .with_cookies("csrftoken=super_secret_token_value");

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:8000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_value"));
    }
}
