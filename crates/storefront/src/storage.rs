//! Local cache of the cart and wishlist in persistent key-value storage.
//!
//! The cache is best-effort redundancy next to the server cart: it is loaded
//! once at startup, mutated only after the server confirms a change (or, for
//! the wishlist, immediately) and written back synchronously. Reading never
//! fails; anything absent or unreadable starts out empty.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dcl_core::{CartLine, ProductId, VariantId};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys.
pub mod keys {
    /// Serialized array of cart lines.
    pub const CART: &str = "dcl_cart";

    /// Serialized array of wishlisted product ids.
    pub const WISHLIST: &str = "dcl_wishlist";
}

/// Errors from the persistent storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// A string key-value store that survives restarts.
pub trait Storage: Send {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with one entry.
    #[must_use]
    pub fn with_item(mut self, key: &str, value: &str) -> Self {
        self.items.insert(key.to_string(), value.to_string());
        self
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

/// File-backed storage: one `<key>.json` file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write-then-rename so a crash never leaves a truncated entry
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// LocalCache
// =============================================================================

/// In-memory cart and wishlist mirrored to persistent storage.
pub struct LocalCache {
    storage: Box<dyn Storage>,
    cart: Vec<CartLine>,
    wishlist: Vec<ProductId>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("cart", &self.cart)
            .field("wishlist", &self.wishlist)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Load the cart and wishlist from storage.
    ///
    /// Never fails: missing or corrupt entries are logged and start empty.
    /// Duplicate cart lines are merged and zero-quantity lines dropped.
    pub fn load(storage: impl Storage + 'static) -> Self {
        let cart = normalize_cart(load_array::<CartLine>(&storage, keys::CART));
        let mut wishlist: Vec<ProductId> = Vec::new();
        for id in load_array::<ProductId>(&storage, keys::WISHLIST) {
            if !wishlist.contains(&id) {
                wishlist.push(id);
            }
        }

        tracing::debug!(
            cart_lines = cart.len(),
            wishlist = wishlist.len(),
            "Local cache loaded"
        );

        Self {
            storage: Box::new(storage),
            cart,
            wishlist,
        }
    }

    /// Cached cart lines in insertion order.
    #[must_use]
    pub fn cart(&self) -> &[CartLine] {
        &self.cart
    }

    /// Wishlisted product ids in insertion order.
    #[must_use]
    pub fn wishlist(&self) -> &[ProductId] {
        &self.wishlist
    }

    /// The cached line for a variant.
    #[must_use]
    pub fn line(&self, id: &VariantId) -> Option<&CartLine> {
        self.cart.iter().find(|line| &line.id == id)
    }

    /// Whether a product is on the wishlist.
    #[must_use]
    pub fn is_wishlisted(&self, id: &ProductId) -> bool {
        self.wishlist.contains(id)
    }

    /// Sum of cached quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart
            .iter()
            .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
    }

    /// Sum of cached line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.cart.iter().map(CartLine::line_total).sum()
    }

    /// Raw persisted value for a key, as last written.
    #[must_use]
    pub fn persisted(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    /// Record a confirmed add: increment the existing line or append a new one.
    pub fn record_add(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }
        match self.cart.iter_mut().find(|existing| existing.id == line.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => self.cart.push(line),
        }
        self.save_cart();
    }

    /// Set a line's quantity (at least 1). Returns false for unknown ids.
    pub fn set_quantity(&mut self, id: &VariantId, quantity: u32) -> bool {
        let Some(line) = self.cart.iter_mut().find(|line| &line.id == id) else {
            return false;
        };
        line.quantity = quantity.max(1);
        self.save_cart();
        true
    }

    /// Drop a line. Returns false for unknown ids.
    pub fn remove(&mut self, id: &VariantId) -> bool {
        let before = self.cart.len();
        self.cart.retain(|line| &line.id != id);
        let removed = self.cart.len() != before;
        if removed {
            self.save_cart();
        }
        removed
    }

    /// Flip wishlist membership and persist. Returns the new membership.
    pub fn toggle_wishlist(&mut self, id: &ProductId) -> bool {
        let member = if let Some(index) = self.wishlist.iter().position(|w| w == id) {
            self.wishlist.remove(index);
            false
        } else {
            self.wishlist.push(id.clone());
            true
        };
        self.save_wishlist();
        member
    }

    /// Persist the cart array.
    pub fn save_cart(&mut self) {
        persist(self.storage.as_mut(), keys::CART, &self.cart);
    }

    /// Persist the wishlist array.
    pub fn save_wishlist(&mut self) {
        persist(self.storage.as_mut(), keys::WISHLIST, &self.wishlist);
    }
}

fn load_array<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Vec<T> {
    match storage.get_item(key) {
        Ok(Some(raw)) => serde_json::from_str::<Vec<T>>(&raw).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Discarding unreadable local cache entry");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Local storage unavailable, starting empty");
            Vec::new()
        }
    }
}

fn persist<T: Serialize + ?Sized>(storage: &mut dyn Storage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|raw| storage.set_item(key, &raw));
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "Failed to persist local cache");
    }
}

fn normalize_cart(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines.into_iter().filter(|line| line.quantity > 0) {
        match merged.iter_mut().find(|existing| existing.id == line.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line),
        }
    }
    merged
}
