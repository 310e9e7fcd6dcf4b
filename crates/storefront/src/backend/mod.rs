//! Client for the Atelier backend JSON API.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`; no generated bindings
//! - The backend is the source of truth for products, carts and favorites
//! - The bearer token is attached per call, never stored in the client
//! - The catalog is cached in memory via `moka` (60 second TTL)
//!
//! # Endpoints
//!
//! ```text
//! GET    /products                  catalog
//! GET    /products/{id}             product detail
//! POST   /products                  bulk insert (seeding)
//! POST   /product                   create one product
//! POST   /login                     {email, password} -> {token, user}
//! POST   /register                  create account
//! GET    /protected                 user behind the bearer token
//! GET    /my-favorites/{user_id}    favorite list
//! POST   /my-favorites              add favorite
//! DELETE /my-favorites/{product_id} remove favorite
//! GET    /my-cart/{user_id}         pending orders
//! POST   /my-cart                   add product
//! PUT    /my-cart                   change a line quantity
//! DELETE /my-cart/{product_id}      remove product
//! POST   /create-checkout-session   payment redirect URL
//! ```

mod cache;
mod client;
pub mod types;

pub use client::BackendClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined onto the base URL.
    #[error("Invalid endpoint {0}")]
    InvalidEndpoint(String),

    /// Bearer token missing, expired or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Checkout answered without a redirect URL.
    #[error("Checkout session not created: {0}")]
    Checkout(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

impl BackendError {
    /// Whether the error means the stored token is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Pull a readable message out of an error body.
///
/// The backend answers errors as `{"msg": ...}`, `{"message": ...}` or
/// `{"error": ...}`; anything else is truncated raw text.
fn error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error"] {
            if let Some(serde_json::Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "(empty body)".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("products/9".to_string());
        assert_eq!(err.to_string(), "Not found: products/9");

        let err = BackendError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn test_error_message_known_keys() {
        assert_eq!(error_message(r#"{"msg": "User exists"}"#), "User exists");
        assert_eq!(error_message(r#"{"message": "Bad"}"#), "Bad");
        assert_eq!(error_message(r#"{"error": "Stripe down"}"#), "Stripe down");
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message("   "), "(empty body)");
        assert_eq!(error_message("<html>oops</html>"), "<html>oops</html>");
        assert_eq!(error_message(&"x".repeat(500)).len(), 200);
        assert_eq!(error_message(r#"{"detail": 1}"#), r#"{"detail": 1}"#);
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(BackendError::Unauthorized.is_unauthorized());
        assert!(!BackendError::RateLimited(3).is_unauthorized());
    }
}
