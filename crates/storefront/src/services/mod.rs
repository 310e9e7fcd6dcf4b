//! Storefront services.
//!
//! # Services
//!
//! - `auth` - Token-backed session holder (login, register, restore, logout)
//! - `favorites` - Favorites mirror between the session and the backend
//! - `cart` - Cart mirror, quantity sequencing and checkout

pub mod auth;
pub mod cart;
pub mod favorites;

pub use auth::{AuthError, AuthService, LoginForm, RegistrationForm};
pub use cart::{CartService, CartServiceError, LineSequencer, QuantityUpdate};
pub use favorites::{
    BackendFavorites, FavoritesCache, FavoritesError, FavoritesMirror, FavoritesRemote,
    MutationOutcome, SessionFavoritesCache, Toggled,
};
