//! Cart lines held in the local cache and snapshots returned by the server.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::VariantId;
use super::status::SnapshotStatus;

/// One row of the locally cached cart.
///
/// At most one line exists per variant id; repeat adds increase `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Variant identifier.
    pub id: VariantId,
    /// Product display name.
    #[serde(default)]
    pub name: String,
    /// Unit price as shown on the product card.
    #[serde(default)]
    pub price: Decimal,
    /// Product image URL.
    #[serde(default)]
    pub image: String,
    /// Positive quantity.
    pub quantity: u32,
}

impl CartLine {
    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Authoritative cart totals returned with every mutation response.
///
/// Add responses may omit `cart_total`; only update responses carry
/// `item_total`. Absent fields leave the corresponding UI untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub status: SnapshotStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cart_count: Option<u32>,
    #[serde(default)]
    pub cart_total: Option<Decimal>,
    #[serde(default)]
    pub item_total: Option<Decimal>,
}

impl CartSnapshot {
    /// Whether the server accepted the mutation.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SnapshotStatus::Success
    }

    /// Server message, if one was sent and is not blank.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cart_line_accepts_numeric_price() {
        let line: CartLine = serde_json::from_str(
            r#"{"id":"42","name":"Silk Scarf","price":19.99,"image":"/m/42.jpg","quantity":2}"#,
        )
        .unwrap();
        assert_eq!(line.price, Decimal::from_str("19.99").unwrap());
        assert_eq!(line.line_total(), Decimal::from_str("39.98").unwrap());
    }

    #[test]
    fn test_snapshot_from_add_response_without_total() {
        let snapshot: CartSnapshot = serde_json::from_str(
            r#"{"status":"success","message":"Added Silk Scarf to cart.","cart_count":1}"#,
        )
        .unwrap();
        assert!(snapshot.is_success());
        assert_eq!(snapshot.cart_count, Some(1));
        assert_eq!(snapshot.cart_total, None);
        assert_eq!(snapshot.message(), Some("Added Silk Scarf to cart."));
    }

    #[test]
    fn test_snapshot_from_update_response() {
        let snapshot: CartSnapshot = serde_json::from_str(
            r#"{"status":"success","message":"Cart updated.","item_total":59.97,"cart_count":3,"cart_total":59.97}"#,
        )
        .unwrap();
        assert_eq!(snapshot.item_total, Some(Decimal::from_str("59.97").unwrap()));
        assert_eq!(snapshot.cart_total, snapshot.item_total);
    }

    #[test]
    fn test_error_snapshot_is_not_success() {
        let snapshot: CartSnapshot = serde_json::from_str(
            r#"{"status":"error","message":"Only 2 items available in stock."}"#,
        )
        .unwrap();
        assert!(!snapshot.is_success());
        assert_eq!(snapshot.message(), Some("Only 2 items available in stock."));
    }

    #[test]
    fn test_blank_message_is_absent() {
        let snapshot = CartSnapshot {
            message: Some("   ".to_string()),
            ..CartSnapshot::default()
        };
        assert_eq!(snapshot.message(), None);
    }
}
