//! Application state handed to the page controller.

use crate::api::{ApiError, StorefrontClient};
use crate::config::ClientConfig;
use crate::storage::{FileStorage, LocalCache, Storage};

/// Everything a page needs besides its document: configuration, the
/// storefront client and the local cart/wishlist cache.
///
/// Owned by exactly one page controller; the cache is mutated in place by
/// gesture handlers, which never run concurrently.
#[derive(Debug)]
pub struct AppState {
    config: ClientConfig,
    storefront: StorefrontClient,
    cache: LocalCache,
}

impl AppState {
    /// Create application state over the given storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, storage: impl Storage + 'static) -> Result<Self, ApiError> {
        let storefront = StorefrontClient::new(&config)?;
        let cache = LocalCache::load(storage);
        Ok(Self {
            config,
            storefront,
            cache,
        })
    }

    /// Create application state backed by files in `config.storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_file_storage(config: ClientConfig) -> Result<Self, ApiError> {
        let storage = FileStorage::new(config.storage_dir.clone());
        Self::new(config, storage)
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the storefront client.
    #[must_use]
    pub const fn storefront(&self) -> &StorefrontClient {
        &self.storefront
    }

    /// Get a reference to the local cache.
    #[must_use]
    pub const fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Get a mutable reference to the local cache.
    pub const fn cache_mut(&mut self) -> &mut LocalCache {
        &mut self.cache
    }
}
