//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives on the backend; the session holds the mirror these
//! handlers render.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::{
    Cart, CartLine, OrderItemId, ProductId, catalog::normalize_img_path, format_price,
};
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{CurrentUser, RequireUser, SignedIn};
use crate::routes::{PageContext, Toast};
use crate::services::{CartServiceError, QuantityUpdate};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub item_id: i32,
    pub product_id: i32,
    pub name: String,
    pub img: String,
    pub price: String,
    pub quantity: u32,
    pub max_quantity: u32,
    pub line_price: String,
}

impl CartItemView {
    #[must_use]
    pub const fn can_decrease(&self) -> bool {
        self.quantity > 1
    }

    #[must_use]
    pub const fn can_increase(&self) -> bool {
        self.quantity < self.max_quantity
    }
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            item_id: line.item_id.as_i32(),
            product_id: line.product.id.as_i32(),
            name: line.product.name.clone(),
            img: normalize_img_path(line.product.img_path.as_deref()),
            price: line.product.price_display(),
            quantity: line.quantity,
            max_quantity: line.max_quantity(),
            line_price: format_price(line.total()),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            subtotal: format_price(cart.subtotal()),
            item_count: cart.total_quantity(),
        }
    }
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::from(&Cart::default())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: i32,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
}

/// Query parameters of the cart page.
#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub error: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: Option<CartView>,
    pub error: Option<&'static str>,
    /// Always empty on a full page; shared with the items fragment.
    pub toast: Option<Toast>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub toast: Option<Toast>,
}

/// Add to cart button fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/add_to_cart.html")]
pub struct AddToCartTemplate {
    pub product_id: i32,
    /// No more units can be added.
    pub exhausted: bool,
    pub toast: Option<Toast>,
}

fn checkout_error_message(code: &str) -> &'static str {
    match code {
        "empty" => "Your cart is empty.",
        _ => "The payment could not be started. Please try again.",
    }
}

/// Display cart page.
#[instrument(skip(state, session, current))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
    Query(query): Query<CartQuery>,
) -> impl IntoResponse {
    let page = PageContext::new(&current);
    let mut error = query.error.as_deref().map(checkout_error_message);

    let cart = match current.user() {
        Some(user) => match state.cart(&session).load(user, current.token()).await {
            Ok(cart) => Some(CartView::from(&cart)),
            Err(e) => {
                tracing::error!("Failed to fetch cart: {e}");
                error = Some("Your cart cannot be shown right now.");
                Some(CartView::empty())
            }
        },
        None => None,
    };

    CartShowTemplate {
        page,
        cart,
        error,
        toast: None,
    }
}

/// Add one unit of a product to the cart (HTMX).
///
/// Returns the add button with a toast; the button is disabled once the
/// backend reports that the visitor holds the whole stock.
#[instrument(skip(state, session, current))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let result = state
        .cart(&session)
        .add(current.user(), current.token(), ProductId::new(form.product_id))
        .await;

    let (exhausted, toast) = match result {
        Ok((product, response)) => {
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product", product.name.as_str())]),
            );
            if response.stock_reached() {
                (true, Toast::success("Added to cart. No more stock for you!"))
            } else {
                (false, Toast::success(format!("{} added to cart", product.name)))
            }
        }
        Err(CartServiceError::Unauthenticated) => {
            (false, Toast::error("Log in to add products to the cart"))
        }
        Err(e) => {
            tracing::error!("Failed to add item to cart: {e}");
            (false, Toast::error("Could not add to cart, please try again"))
        }
    };

    AddToCartTemplate {
        product_id: form.product_id,
        exhausted,
        toast: Some(toast),
    }
    .into_response()
}

/// Re-render the mirror after a failed edit.
async fn current_items(
    state: &AppState,
    session: &Session,
    visitor: &SignedIn,
    toast: Toast,
) -> Response {
    let cart = match state.cart(session).current(&visitor.user, visitor.token()).await {
        Ok(cart) => CartView::from(&cart),
        Err(e) => {
            tracing::error!("Failed to read cart: {e}");
            CartView::empty()
        }
    };

    CartItemsTemplate {
        cart,
        toast: Some(toast),
    }
    .into_response()
}

/// Update cart line quantity (HTMX).
///
/// Answers 204 when a newer change for the same line overtook this one, so
/// the page keeps the fragment of the newer change.
#[instrument(skip(state, session, visitor))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireUser(visitor): RequireUser,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let result = state
        .cart(&session)
        .update_quantity(
            &visitor.user,
            visitor.token(),
            OrderItemId::new(form.item_id),
            form.quantity,
        )
        .await;

    match result {
        Ok(QuantityUpdate::Pushed(cart)) => CartItemsTemplate {
            cart: CartView::from(&cart),
            toast: None,
        }
        .into_response(),
        Ok(QuantityUpdate::Superseded) => StatusCode::NO_CONTENT.into_response(),
        Err(CartServiceError::Cart(e)) => {
            tracing::warn!("Rejected quantity change: {e}");
            let toast = Toast::error("That quantity is not available");
            current_items(&state, &session, &visitor, toast).await
        }
        Err(e) => {
            tracing::error!("Failed to update cart: {e}");
            let toast = Toast::error("Could not update the cart");
            current_items(&state, &session, &visitor, toast).await
        }
    }
}

/// Remove a product from the cart (HTMX).
#[instrument(skip(state, session, visitor))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireUser(visitor): RequireUser,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let result = state
        .cart(&session)
        .remove(&visitor.user, visitor.token(), ProductId::new(form.product_id))
        .await;

    match result {
        Ok(cart) => CartItemsTemplate {
            cart: CartView::from(&cart),
            toast: Some(Toast::success("Removed from cart")),
        }
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to remove from cart: {e}");
            let toast = Toast::error("Could not remove the product");
            current_items(&state, &session, &visitor, toast).await
        }
    }
}

/// Redirect to the payment page.
#[instrument(skip(state, session, visitor))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireUser(visitor): RequireUser,
) -> Response {
    match state.cart(&session).checkout(&visitor.user, visitor.token()).await {
        Ok(url) => {
            add_breadcrumb("cart", "Checkout started", None);
            Redirect::to(&url).into_response()
        }
        Err(CartServiceError::Empty) => Redirect::to("/cart?error=empty").into_response(),
        Err(e) => {
            tracing::error!("Failed to start checkout: {e}");
            Redirect::to("/cart?error=checkout").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use atelier_core::{Product, UserId};
    use rust_decimal::Decimal;

    use super::*;

    fn line(item: i32, quantity: u32, stock: u32, price: Decimal) -> CartLine {
        CartLine {
            item_id: OrderItemId::new(item),
            quantity,
            product: Product {
                id: ProductId::new(item * 10),
                name: format!("Piece {item}"),
                category: "statue".to_string(),
                price,
                details: String::new(),
                img_path: Some("img/piece.png".to_string()),
                amount: stock,
                artist_id: Some(UserId::new(1)),
                discount: None,
            },
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let cart = Cart::new(vec![
            line(1, 2, 5, Decimal::new(1000, 2)),
            line(2, 1, 3, Decimal::new(550, 2)),
        ]);
        let view = CartView::from(&cart);

        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, format_price(Decimal::new(2550, 2)));
        assert_eq!(view.items[0].line_price, format_price(Decimal::new(2000, 2)));
        assert_eq!(view.items[0].img, "/img/piece.png");
    }

    #[test]
    fn test_counter_bounds() {
        let view = CartItemView::from(&line(1, 1, 2, Decimal::ONE));
        assert!(!view.can_decrease());
        assert!(view.can_increase());

        let full = CartItemView::from(&line(1, 2, 2, Decimal::ONE));
        assert!(full.can_decrease());
        assert!(!full.can_increase());
    }

    #[test]
    fn test_counter_posts_absolute_quantity() {
        let cart = Cart::new(vec![line(4, 2, 5, Decimal::ONE)]);
        let html = CartItemsTemplate {
            cart: CartView::from(&cart),
            toast: None,
        }
        .render()
        .unwrap();

        // Clicks only move the local counter; the form sends its final value
        assert!(html.contains(r#"hx-trigger="change delay:300ms""#));
        assert!(html.contains(r#"name="item_id" value="4""#));
        assert!(html.contains(r#"name="quantity""#));
        assert!(html.contains(r#"value="2" min="1" max="5""#));
        assert!(!html.contains("click delay"));
    }

    #[test]
    fn test_empty_view() {
        assert!(CartView::empty().is_empty());
        assert_eq!(CartView::empty().item_count, 0);
    }
}
