//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Products
//! GET  /products               - Catalog, filtered by ?q= and ?cat=
//! GET  /products/{id}          - Product detail
//! GET  /products/new           - New product form (requires auth)
//! POST /products/new           - Create product (requires auth)
//!
//! # Favorites
//! GET  /favorites              - Favorite products
//! POST /favorites/{id}/toggle  - Toggle (returns favorite_button fragment)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns add_to_cart fragment + toast)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove product (returns cart_items fragment)
//! POST /cart/checkout          - Redirect to the payment page
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Private area
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod favorites;
pub mod home;
pub mod products;

use atelier_core::{FavoriteSet, Product, catalog::normalize_img_path};
use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{CurrentUser, auth_rate_limiter};
use crate::state::AppState;

// =============================================================================
// Shared View Types
// =============================================================================

/// Layout data every full page needs.
#[derive(Clone, Default)]
pub struct PageContext {
    /// Display name of the logged-in user.
    pub user_name: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn new(current: &CurrentUser) -> Self {
        Self {
            user_name: current.user().map(atelier_core::User::display_name),
        }
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user_name.is_some()
    }
}

/// Toast message shown for two seconds.
#[derive(Clone)]
pub struct Toast {
    /// `success` or `error`
    pub kind: &'static str,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCard {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub details: String,
    pub price: String,
    pub img: String,
    pub stock: u32,
    pub favorite: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, favorites: &FavoriteSet) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            category: product.category_key(),
            details: product.details.clone(),
            price: product.price_display(),
            img: normalize_img_path(product.img_path.as_deref()),
            stock: product.amount,
            favorite: favorites.contains(product.id),
        }
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout));

    if rate_limited {
        router.layer(auth_rate_limiter())
    } else {
        router
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/new", get(products::new_page).post(products::create))
        .route("/{id}", get(products::show))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/{id}/toggle", post(favorites::toggle))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/checkout", post(cart::checkout))
}

/// Create all routes for the storefront.
pub fn routes(rate_limit_auth: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/favorites", favorite_routes())
        .nest("/cart", cart_routes())
        .route("/account", get(account::index))
        .nest("/auth", auth_routes(rate_limit_auth))
}
