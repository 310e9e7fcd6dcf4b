//! Atelier Core - Shared types and storefront logic.
//!
//! This crate provides the types used across all Atelier components:
//! - `storefront` - Server-rendered shop that talks to the Atelier backend
//! - `cli` - Command-line tools for the session store and the catalog
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The storefront decides where state lives and
//! when the backend is called; this crate decides what the state means.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, products and users
//! - [`favorites`] - The favorite product set
//! - [`catalog`] - Client-side catalog filtering
//! - [`cart`] - Cart lines, subtotal and checkout items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod types;

pub use cart::{Cart, CartError, CartLine, CartOrder, CheckoutItem};
pub use catalog::{CatalogParams, CatalogQuery, CategoryFilter};
pub use favorites::FavoriteSet;
pub use types::*;
