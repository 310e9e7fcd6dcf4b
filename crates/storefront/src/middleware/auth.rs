//! Authentication extractors.
//!
//! Both read the session only. Token expiry and `/protected` lookups are
//! handled earlier by [`super::restore_visitor`].

use atelier_core::User;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use secrecy::SecretString;
use tower_sessions::Session;

use crate::models::{StoredToken, keys};

/// A logged-in visitor and their bearer token.
pub struct SignedIn {
    pub user: User,
    token: Option<SecretString>,
}

impl SignedIn {
    /// Token to attach to backend calls.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }
}

/// Extractor that requires a logged-in user.
///
/// Page requests are redirected to the login page; htmx and API requests
/// get a bare 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn account(RequireUser(visitor): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", visitor.user.display_name())
/// }
/// ```
pub struct RequireUser(pub SignedIn);

/// Extractor for the logged-in user, if any.
pub struct CurrentUser(pub Option<SignedIn>);

impl CurrentUser {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|visitor| &visitor.user)
    }

    #[must_use]
    pub fn token(&self) -> Option<&SecretString> {
        self.0.as_ref().and_then(SignedIn::token)
    }
}

/// Error returned when a user is required but nobody is logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for page requests).
    RedirectToLogin,
    /// Unauthorized response (for htmx and API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn signed_in(parts: &Parts) -> Option<SignedIn> {
    let session = parts.extensions.get::<Session>()?;

    let user: User = session.get(keys::CURRENT_USER).await.ok().flatten()?;
    let token = session
        .get::<StoredToken>(keys::AUTH_TOKEN)
        .await
        .ok()
        .flatten()
        .filter(|token| !token.is_expired(Utc::now()))
        .map(|token| token.secret());

    Some(SignedIn { user, token })
}

fn wants_fragment(parts: &Parts) -> bool {
    parts.headers.contains_key("hx-request") || parts.uri.path().starts_with("/api/")
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        signed_in(parts).await.map(Self).ok_or_else(|| {
            if wants_fragment(parts) {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin
            }
        })
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(signed_in(parts).await))
    }
}
