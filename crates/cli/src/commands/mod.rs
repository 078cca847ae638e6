//! Command implementations.
//!
//! Each command returns the text to print; `main` owns the terminal.

pub mod cart;
pub mod quickview;
pub mod wishlist;
