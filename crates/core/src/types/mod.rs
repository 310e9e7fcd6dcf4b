//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! payloads exchanged with the backend.

pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{format_price, to_minor_units};
pub use product::Product;
pub use user::{Role, User};
