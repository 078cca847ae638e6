//! Core types for the DCL storefront client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use cart::{CartLine, CartSnapshot};
pub use id::*;
pub use price::{CurrencyCode, Price, format_amount};
pub use quantity::{DEFAULT_MAX_QUANTITY, QuantityBounds};
pub use status::*;
