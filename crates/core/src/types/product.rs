//! Product payload as served by the backend catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, UserId};
use super::price::format_price;

/// A product from the backend catalog.
///
/// Read-only from the storefront's point of view. Missing optional fields are
/// tolerated; `price` is accepted both as a JSON number and as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub img_path: Option<String>,
    /// Units in stock.
    #[serde(default)]
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<i32>,
}

impl Product {
    /// Lowercased category, the form used for filtering.
    #[must_use]
    pub fn category_key(&self) -> String {
        self.category.trim().to_lowercase()
    }

    /// Price formatted for display.
    #[must_use]
    pub fn price_display(&self) -> String {
        format_price(self.price)
    }

    /// Whether any unit is left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.amount > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_payload() {
        let json = r#"{
            "id": 3,
            "artist_id": 1,
            "name": "Moon lamp",
            "category": "HOME_DECORATION",
            "details": "Hand-thrown ceramic",
            "amount": 4,
            "price": 45,
            "discount": 0,
            "created_at": "Tue, 14 Oct 2025 10:00:00 GMT"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price, Decimal::new(45, 0));
        assert_eq!(product.category_key(), "home_decoration");
        assert_eq!(product.img_path, None);
        assert!(product.in_stock());
    }

    #[test]
    fn test_deserialize_string_price() {
        let json = r#"{"id": 2, "name": "Torso", "price": "120.5", "amount": 1}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Decimal::new(1205, 1));
    }

    #[test]
    fn test_serializes_price_as_number() {
        let json = r#"{"id": 2, "name": "Torso", "price": "120.5"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        let value = serde_json::to_value(&product).unwrap();
        assert!(value["price"].is_number());
    }

    #[test]
    fn test_deserialize_fractional_price() {
        let json = r#"{"id": 1, "name": "Bust", "price": 19.99}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price_display(), "19.99 €");
        assert_eq!(product.amount, 0);
        assert!(!product.in_stock());
    }
}
