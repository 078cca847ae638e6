//! DCL Core - Shared types library.
//!
//! This crate provides the domain types shared by the storefront client
//! components:
//! - `storefront` - Cart synchronization, local cache and page behaviour
//! - `cli` - Command-line driver for cart and wishlist operations
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no document access. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, cart lines, server snapshots, statuses
//!   and quantity bounds

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
