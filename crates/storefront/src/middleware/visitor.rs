//! Per-request visitor bookkeeping.
//!
//! Runs inside the session layer before every page handler: restores the
//! user from the stored token, then reconciles the favorites cache when the
//! user changed. Full page loads may re-check the token with the backend.
//! Failures are logged and never fail the request.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::services::{BackendFavorites, FavoritesMirror, SessionFavoritesCache};
use crate::state::AppState;

/// Restore the visitor's user and keep favorites in sync.
pub async fn restore_visitor(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let auth = state.auth(&session);

    match auth.restore(is_page_load(&request)).await {
        Ok(Some(user)) => {
            set_sentry_user(&user.id, Some(&user.email));
            tracing::Span::current().record("user_id", tracing::field::display(user.id));

            match auth.token().await {
                Ok(token) => {
                    let mirror = FavoritesMirror::new(
                        SessionFavoritesCache::new(session.clone()),
                        BackendFavorites::new(state.backend(), token.as_ref()),
                    );
                    if let Err(e) = mirror.reconcile(Some(&user)).await {
                        tracing::warn!(error = %e, "Failed to reconcile favorites");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to read token"),
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to restore visitor"),
    }

    next.run(request).await
}

/// A full page navigation: a GET that htmx did not issue.
fn is_page_load(request: &Request) -> bool {
    request.method() == Method::GET && !request.headers().contains_key("hx-request")
}
