//! Headless storefront client library.
//!
//! Keeps a shopping cart in sync with the storefront server, mirrors cart and
//! wishlist into a local cache, and reflects both into a page document driven
//! by delegated gesture handlers.
//!
//! # Modules
//!
//! - [`api`] - storefront AJAX client (cart mutations, quick view fragments)
//! - [`storage`] - persistent key-value storage and the local cart cache
//! - [`dom`] - in-memory document with selector queries
//! - [`reconcile`] - reflects snapshots and cache state into the document
//! - [`dispatch`] - direct and delegated event bindings
//! - [`notify`] - stacking, auto-dismissing notifications
//! - [`page`] - the page controller tying everything together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod classes;
pub mod config;
pub mod csrf;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod notify;
pub mod page;
pub mod reconcile;
pub mod state;
pub mod storage;
