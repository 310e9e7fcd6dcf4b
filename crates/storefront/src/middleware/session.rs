//! Session middleware configuration.
//!
//! The session is where a visitor's token, user, favorites cache and cart
//! mirror live. Cookies are signed with the configured session secret.

use secrecy::ExposeSecret;
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "atelier_session";

/// Session expiry on inactivity (30 days); the favorites cache is meant to
/// outlive a login.
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// The session secret cannot be used as a signing key.
#[derive(Debug, thiserror::Error)]
#[error("session secret is not a valid signing key: {0}")]
pub struct SessionKeyError(String);

/// Create the session layer over any store.
///
/// Production uses `PostgresStore`; tests use `MemoryStore`.
///
/// # Errors
///
/// Returns `SessionKeyError` if the secret is shorter than 64 bytes.
pub fn create_session_layer<S>(
    store: S,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<S, SignedCookie>, SessionKeyError>
where
    S: SessionStore + Clone,
{
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())
        .map_err(|e| SessionKeyError(e.to_string()))?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
