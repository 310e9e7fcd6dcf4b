//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field is empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] atelier_core::EmailError),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The backend rejected the credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store error.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Message safe to show on the login and register pages.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "Please fill in all fields.",
            Self::InvalidEmail(_) => "Please enter a valid email address.",
            Self::PasswordMismatch => "Passwords do not match.",
            Self::InvalidCredentials => "Invalid email or password.",
            Self::Backend(_) | Self::Session(_) => {
                "Something went wrong. Please try again later."
            }
        }
    }

    /// Whether the failure is the visitor's input rather than ours.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::InvalidEmail(_)
                | Self::PasswordMismatch
                | Self::InvalidCredentials
        )
    }
}
