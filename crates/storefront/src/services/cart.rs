//! Cart mirror, quantity sequencing and checkout.
//!
//! The cart lives on the backend; the session holds the copy the cart page
//! renders and edits. Quantity changes for one order item are pushed one at a
//! time and in issue order. A change that was overtaken by a newer one while
//! waiting its turn is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use atelier_core::{Cart, CartError, OrderItemId, Product, ProductId, User};
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{AddToCartResponse, BackendClient, BackendError};
use crate::models::keys;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// Nobody is logged in.
    #[error("not logged in")]
    Unauthenticated,

    /// Nothing to pay for.
    #[error("cart is empty")]
    Empty,

    /// The requested edit is not valid for the mirror.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store error.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Result of a quantity change.
#[derive(Debug)]
pub enum QuantityUpdate {
    /// Pushed to the backend; the updated mirror.
    Pushed(Cart),
    /// A newer change for the same line arrived first.
    Superseded,
}

// =============================================================================
// LineSequencer
// =============================================================================

/// Orders quantity pushes per order item.
///
/// Every change takes a ticket. Tickets for one item are served one at a
/// time, and a ticket that is no longer the newest when its turn comes is
/// told to give up.
#[derive(Default)]
pub struct LineSequencer {
    lines: Mutex<HashMap<OrderItemId, Arc<LineSlot>>>,
}

#[derive(Default)]
struct LineSlot {
    latest: AtomicU64,
    turn: AsyncMutex<()>,
}

/// A place in the queue of one order item.
pub struct Ticket {
    seq: u64,
    slot: Arc<LineSlot>,
}

/// Held while a push for the item is in flight.
pub struct Turn<'a> {
    _guard: AsyncMutexGuard<'a, ()>,
}

impl LineSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next ticket for an item.
    pub fn issue(&self, item_id: OrderItemId) -> Ticket {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);

        // Slots nobody holds a ticket for can go
        lines.retain(|_, slot| Arc::strong_count(slot) > 1);

        let slot = Arc::clone(lines.entry(item_id).or_default());
        let seq = slot.latest.fetch_add(1, Ordering::SeqCst) + 1;

        Ticket { seq, slot }
    }

    /// Number of items with outstanding tickets.
    #[must_use]
    pub fn active_lines(&self) -> usize {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}

impl Ticket {
    /// Whether no newer ticket was issued for the item.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.slot.latest.load(Ordering::SeqCst) == self.seq
    }

    /// Wait for this item's turn.
    ///
    /// Returns `None` if a newer ticket was issued in the meantime.
    pub async fn wait(&self) -> Option<Turn<'_>> {
        let guard = self.slot.turn.lock().await;
        self.is_current().then_some(Turn { _guard: guard })
    }
}

// =============================================================================
// CartService
// =============================================================================

/// Cart operations for one visitor.
pub struct CartService<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
    sequencer: &'a LineSequencer,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(
        backend: &'a BackendClient,
        session: &'a Session,
        sequencer: &'a LineSequencer,
    ) -> Self {
        Self {
            backend,
            session,
            sequencer,
        }
    }

    /// Fetch the cart from the backend and store the mirror.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the fetch fails.
    #[instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn load(
        &self,
        user: &User,
        token: Option<&SecretString>,
    ) -> Result<Cart, CartServiceError> {
        let cart = self.backend.cart(token, user.id).await?;
        self.store(&cart).await?;
        Ok(cart)
    }

    /// The stored mirror, fetched when missing.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the mirror is missing and the fetch fails.
    pub async fn current(
        &self,
        user: &User,
        token: Option<&SecretString>,
    ) -> Result<Cart, CartServiceError> {
        match self.session.get::<Cart>(keys::CART).await? {
            Some(cart) => Ok(cart),
            None => self.load(user, token).await,
        }
    }

    async fn store(&self, cart: &Cart) -> Result<(), CartServiceError> {
        self.session.insert(keys::CART, cart).await?;
        Ok(())
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a user, `Backend` if the product is
    /// unknown or the addition is rejected.
    #[instrument(skip(self, user, token))]
    pub async fn add(
        &self,
        user: Option<&User>,
        token: Option<&SecretString>,
        product_id: ProductId,
    ) -> Result<(Product, AddToCartResponse), CartServiceError> {
        let user = user.ok_or(CartServiceError::Unauthenticated)?;
        let product = self.backend.get_product(product_id).await?;
        let response = self.backend.add_to_cart(token, user, &product).await?;

        // Refetched on the next cart page view
        self.session.remove_value(keys::CART).await?;

        Ok((product, response))
    }

    /// Change the quantity of one line.
    ///
    /// The new quantity must lie in `1..=stock`. Changes for the same line
    /// are pushed in order; an overtaken change is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Cart` for an unknown line or out-of-range quantity and
    /// `Backend` if the push fails.
    #[instrument(skip(self, user, token))]
    pub async fn update_quantity(
        &self,
        user: &User,
        token: Option<&SecretString>,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<QuantityUpdate, CartServiceError> {
        let ticket = self.sequencer.issue(item_id);

        let mut cart = self.current(user, token).await?;
        cart.set_quantity(item_id, quantity)?;

        let Some(_turn) = ticket.wait().await else {
            tracing::debug!("Quantity change overtaken, dropping it");
            return Ok(QuantityUpdate::Superseded);
        };

        self.backend
            .update_cart_quantity(token, item_id, quantity)
            .await?;

        // Another request of this visitor may have changed other lines
        let mut latest = self.session.get::<Cart>(keys::CART).await?.unwrap_or(cart);
        if latest.set_quantity(item_id, quantity).is_err() {
            tracing::debug!("Line left the mirror while pushing");
        }
        self.store(&latest).await?;

        Ok(QuantityUpdate::Pushed(latest))
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the backend does not confirm; the mirror is then
    /// unchanged.
    #[instrument(skip(self, user, token))]
    pub async fn remove(
        &self,
        user: &User,
        token: Option<&SecretString>,
        product_id: ProductId,
    ) -> Result<Cart, CartServiceError> {
        self.backend
            .remove_from_cart(token, user, product_id)
            .await?;

        let mut cart = self.current(user, token).await?;
        cart.remove_product(product_id);
        self.store(&cart).await?;
        Ok(cart)
    }

    /// Ask the backend for a payment session and return its URL.
    ///
    /// # Errors
    ///
    /// Returns `Empty` for an empty cart, `Cart` for a price that cannot be
    /// expressed in cents and `Backend` if no session is created.
    #[instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn checkout(
        &self,
        user: &User,
        token: Option<&SecretString>,
    ) -> Result<String, CartServiceError> {
        let cart = self.current(user, token).await?;
        if cart.is_empty() {
            return Err(CartServiceError::Empty);
        }

        let items = cart.checkout_items()?;
        let url = self
            .backend
            .create_checkout_session(&items, cart.subtotal())
            .await?;

        tracing::info!(lines = items.len(), subtotal = %cart.subtotal(), "Checkout session created");
        Ok(url)
    }
}
