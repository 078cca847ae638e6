//! Anti-forgery token lookup.
//!
//! The storefront sets a `csrftoken` cookie; mutation requests echo it back in
//! the `X-CSRFToken` header.

use secrecy::{ExposeSecret, SecretString};

/// Find a cookie by exact name in a `document.cookie`-style string.
///
/// Entries are `;`-separated and may carry surrounding whitespace. Values are
/// percent-decoded; a value that does not decode is returned as-is.
#[must_use]
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|entry| {
            entry
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(|raw| {
            urlencoding::decode(raw).map_or_else(|_| raw.to_string(), std::borrow::Cow::into_owned)
        })
}

/// Read the anti-forgery token out of a secret cookie string.
#[must_use]
pub fn csrf_token(cookies: &SecretString, name: &str) -> Option<SecretString> {
    cookie_value(cookies.expose_secret(), name).map(SecretString::from)
}
