//! Request and response payloads for the backend API.
//!
//! Field names follow the backend's JSON exactly, including `currentUser`
//! in the cart and favorites bodies.

use atelier_core::{CheckoutItem, OrderItemId, Product, ProductId, User};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `POST /login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /login` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// `POST /register` body.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub address: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// One entry of `GET /my-favorites/{user_id}`.
///
/// Entries carry either `prod_id` (favorite rows) or `id` (joined product
/// rows); `prod_id` wins when both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteEntry {
    #[serde(default)]
    pub prod_id: Option<ProductId>,
    #[serde(default)]
    pub id: Option<ProductId>,
}

impl FavoriteEntry {
    #[must_use]
    pub fn product_id(&self) -> Option<ProductId> {
        self.prod_id.or(self.id)
    }
}

/// `POST /my-favorites` body.
#[derive(Debug, Serialize)]
pub struct AddFavoriteRequest<'a> {
    pub prod_id: ProductId,
    #[serde(rename = "currentUser")]
    pub current_user: &'a User,
}

/// Body for user-scoped deletes (`DELETE /my-favorites/{id}`, `DELETE /my-cart/{id}`).
#[derive(Debug, Serialize)]
pub struct CurrentUserBody<'a> {
    #[serde(rename = "currentUser")]
    pub current_user: &'a User,
}

/// `POST /my-cart` body.
#[derive(Debug, Serialize)]
pub struct AddToCartRequest<'a> {
    pub item: &'a Product,
    #[serde(rename = "currentUser")]
    pub current_user: &'a User,
}

/// `POST /my-cart` response.
///
/// Both fields are optional; when present they say whether the line has
/// reached the product's stock.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddToCartResponse {
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub stock: Option<u32>,
}

impl AddToCartResponse {
    /// True when the backend reports the line at full stock.
    #[must_use]
    pub fn stock_reached(&self) -> bool {
        matches!((self.quantity, self.stock), (Some(quantity), Some(stock)) if quantity >= stock)
    }
}

/// `PUT /my-cart` body.
#[derive(Debug, Serialize)]
pub struct UpdateQuantityRequest {
    pub counter: u32,
    pub order_item_id: OrderItemId,
}

/// `POST /create-checkout-session` body.
#[derive(Debug, Serialize)]
pub struct CheckoutRequest<'a> {
    pub items: &'a [CheckoutItem],
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub subtotal: Decimal,
}

/// `POST /create-checkout-session` response.
#[derive(Debug, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Product form fields, sent as entered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProductForm {
    pub name: String,
    pub category: String,
    pub details: String,
    pub price: String,
    #[serde(default)]
    pub amount: String,
}

/// Image reference attached to a new product.
#[derive(Debug, Serialize)]
pub struct ImageRef<'a> {
    pub img_path: &'a str,
}

/// `POST /product` body.
#[derive(Debug, Serialize)]
pub struct NewProductRequest<'a> {
    pub form: &'a NewProductForm,
    pub user_id: atelier_core::UserId,
    pub img: ImageRef<'a>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use atelier_core::{Role, UserId};
    use serde_json::json;

    fn user() -> User {
        User {
            id: UserId::new(7),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            rol: Role::Customer,
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_favorite_entry_prefers_prod_id() {
        let entry: FavoriteEntry = serde_json::from_value(json!({"id": 3, "prod_id": 9})).unwrap();
        assert_eq!(entry.product_id(), Some(ProductId::new(9)));

        let entry: FavoriteEntry = serde_json::from_value(json!({"id": 3, "name": "Vase"})).unwrap();
        assert_eq!(entry.product_id(), Some(ProductId::new(3)));

        let entry: FavoriteEntry = serde_json::from_value(json!({"name": "?"})).unwrap();
        assert_eq!(entry.product_id(), None);
    }

    #[test]
    fn test_add_favorite_body_uses_current_user_key() {
        let user = user();
        let body = serde_json::to_value(AddFavoriteRequest {
            prod_id: ProductId::new(4),
            current_user: &user,
        })
        .unwrap();

        assert_eq!(body["prod_id"], 4);
        assert_eq!(body["currentUser"]["id"], 7);
        assert_eq!(body["currentUser"]["rol"], "costumer");
    }

    #[test]
    fn test_update_quantity_body() {
        let body = serde_json::to_value(UpdateQuantityRequest {
            counter: 3,
            order_item_id: OrderItemId::new(11),
        })
        .unwrap();
        assert_eq!(body, json!({"counter": 3, "order_item_id": 11}));
    }

    #[test]
    fn test_stock_reached() {
        let full = AddToCartResponse {
            quantity: Some(2),
            stock: Some(2),
        };
        assert!(full.stock_reached());
        assert!(!AddToCartResponse::default().stock_reached());
        let partial = AddToCartResponse {
            quantity: Some(1),
            stock: Some(5),
        };
        assert!(!partial.stock_reached());
    }

    #[test]
    fn test_checkout_request_serializes_subtotal_as_number() {
        let items = vec![CheckoutItem {
            name: "Vase".to_string(),
            unit_amount: 1250,
            quantity: 2,
        }];
        let body = serde_json::to_value(CheckoutRequest {
            items: &items,
            subtotal: Decimal::new(2500, 2),
        })
        .unwrap();
        assert_eq!(body["subtotal"], 25.0);
        assert_eq!(body["items"][0]["unit_amount"], 1250);
    }
}
