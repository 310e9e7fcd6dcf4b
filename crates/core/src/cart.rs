//! Cart lines, subtotal and checkout items.
//!
//! The backend owns the cart. What lives here is the mirror the storefront
//! edits between requests: quantities per line and the subtotal derived from
//! them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{OrderItemId, Product, ProductId, to_minor_units};

/// Errors raised while editing the cart mirror.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// No line with this order item id.
    #[error("cart line {0} not found")]
    LineNotFound(OrderItemId),

    /// Requested quantity is outside `min..=max`.
    #[error("quantity {requested} out of range {min}..={max}")]
    QuantityOutOfRange { requested: u32, min: u32, max: u32 },

    /// A price could not be expressed in minor units.
    #[error("price of {0} cannot be converted to minor units")]
    PriceOutOfRange(String),
}

/// One product entry in the pending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: OrderItemId,
    #[serde(rename = "quantity_ordered")]
    pub quantity: u32,
    #[serde(rename = "product_details")]
    pub product: Product,
}

impl CartLine {
    /// `quantity × price` for this line.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }

    /// Highest quantity the counter may reach.
    ///
    /// Normally the product's stock; if the backend already accepted more than
    /// the current stock, the existing quantity stays reachable.
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        self.product.amount.max(self.quantity).max(1)
    }
}

/// One order as returned by `GET /my-cart/{user_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartOrder {
    #[serde(default)]
    pub products: Vec<CartLine>,
}

/// The cart mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// Build the mirror from the backend's order list.
    ///
    /// Only the first order is the pending one; an empty list is an empty cart.
    #[must_use]
    pub fn from_orders(orders: Vec<CartOrder>) -> Self {
        let lines = orders
            .into_iter()
            .next()
            .map(|order| order.products)
            .unwrap_or_default();
        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of `quantity × price` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::total).sum()
    }

    #[must_use]
    pub fn line(&self, item_id: OrderItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.item_id == item_id)
    }

    /// Set the quantity of one line.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` for an unknown item and `QuantityOutOfRange`
    /// when the quantity is below 1 or above [`CartLine::max_quantity`].
    pub fn set_quantity(
        &mut self,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<&CartLine, CartError> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.item_id == item_id)
            .ok_or(CartError::LineNotFound(item_id))?;

        let max = line.max_quantity();
        if !(1..=max).contains(&quantity) {
            return Err(CartError::QuantityOutOfRange {
                requested: quantity,
                min: 1,
                max,
            });
        }

        line.quantity = quantity;
        Ok(line)
    }

    /// Remove every line for a product and return the first removed line.
    pub fn remove_product(&mut self, product_id: ProductId) -> Option<CartLine> {
        let position = self
            .lines
            .iter()
            .position(|line| line.product.id == product_id)?;
        let removed = self.lines.remove(position);
        self.lines.retain(|line| line.product.id != product_id);
        Some(removed)
    }

    /// Checkout payload items: name, minor-unit price and quantity per line.
    ///
    /// # Errors
    ///
    /// Returns `PriceOutOfRange` if a price does not fit in minor units.
    pub fn checkout_items(&self) -> Result<Vec<CheckoutItem>, CartError> {
        self.lines
            .iter()
            .map(|line| {
                let unit_amount = to_minor_units(line.product.price)
                    .ok_or_else(|| CartError::PriceOutOfRange(line.product.name.clone()))?;
                Ok(CheckoutItem {
                    name: line.product.name.clone(),
                    unit_amount,
                    quantity: line.quantity,
                })
            })
            .collect()
    }
}

/// One entry of the checkout session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutItem {
    pub name: String,
    /// Unit price in minor units (cents).
    pub unit_amount: i64,
    pub quantity: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(item: i32, product: i32, price: Decimal, quantity: u32, stock: u32) -> CartLine {
        CartLine {
            item_id: OrderItemId::new(item),
            quantity,
            product: Product {
                id: ProductId::new(product),
                name: format!("Piece {product}"),
                category: "sculptures".to_string(),
                price,
                details: String::new(),
                img_path: None,
                amount: stock,
                artist_id: None,
                discount: None,
            },
        }
    }

    fn sample() -> Cart {
        Cart::new(vec![
            line(10, 1, Decimal::new(2550, 2), 2, 5),
            line(11, 2, Decimal::new(100, 0), 1, 3),
        ])
    }

    #[test]
    fn test_subtotal_is_sum_of_quantity_times_price() {
        let cart = sample();
        // 2 × 25.50 + 1 × 100
        assert_eq!(cart.subtotal(), Decimal::new(151, 0));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_subtotal_follows_quantity_changes() {
        let mut cart = sample();
        cart.set_quantity(OrderItemId::new(11), 3).unwrap();
        assert_eq!(cart.subtotal(), Decimal::new(351, 0));

        cart.remove_product(ProductId::new(1));
        assert_eq!(cart.subtotal(), Decimal::new(300, 0));
    }

    #[test]
    fn test_empty_cart_subtotal() {
        assert_eq!(Cart::default().subtotal(), Decimal::ZERO);
        assert!(Cart::from_orders(Vec::new()).is_empty());
    }

    #[test]
    fn test_set_quantity_bounds() {
        let mut cart = sample();
        assert_eq!(
            cart.set_quantity(OrderItemId::new(10), 0),
            Err(CartError::QuantityOutOfRange {
                requested: 0,
                min: 1,
                max: 5
            })
        );
        assert!(cart.set_quantity(OrderItemId::new(10), 6).is_err());
        assert_eq!(cart.set_quantity(OrderItemId::new(10), 5).unwrap().quantity, 5);
        assert_eq!(
            cart.set_quantity(OrderItemId::new(99), 1),
            Err(CartError::LineNotFound(OrderItemId::new(99)))
        );
    }

    #[test]
    fn test_max_quantity_keeps_accepted_quantity_reachable() {
        let over = line(1, 1, Decimal::ONE, 4, 2);
        assert_eq!(over.max_quantity(), 4);
        let no_stock = line(1, 1, Decimal::ONE, 0, 0);
        assert_eq!(no_stock.max_quantity(), 1);
    }

    #[test]
    fn test_remove_product() {
        let mut cart = sample();
        let removed = cart.remove_product(ProductId::new(2)).unwrap();
        assert_eq!(removed.item_id, OrderItemId::new(11));
        assert_eq!(cart.lines().len(), 1);
        assert!(cart.remove_product(ProductId::new(2)).is_none());
    }

    #[test]
    fn test_checkout_items_use_minor_units() {
        let items = sample().checkout_items().unwrap();
        assert_eq!(
            items,
            vec![
                CheckoutItem {
                    name: "Piece 1".to_string(),
                    unit_amount: 2550,
                    quantity: 2
                },
                CheckoutItem {
                    name: "Piece 2".to_string(),
                    unit_amount: 10000,
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn test_from_orders_reads_first_order() {
        let json = r#"[
            {"products": [
                {"item_id": 7, "quantity_ordered": 2,
                 "product_details": {"id": 3, "name": "Vase", "price": 12.5, "amount": 9}}
            ]},
            {"products": []}
        ]"#;
        let orders: Vec<CartOrder> = serde_json::from_str(json).unwrap();
        let cart = Cart::from_orders(orders);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.subtotal(), Decimal::new(25, 0));
        assert_eq!(cart.line(OrderItemId::new(7)).unwrap().quantity, 2);
    }
}
