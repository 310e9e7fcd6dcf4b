//! Session-related types.
//!
//! The session is the storefront's stand-in for browser storage. The bearer
//! token is short-lived and expires on its own; the favorites mirror outlives
//! logout.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Bearer token issued by `POST /login`, with the time it stops being used
/// and the last time the backend accepted it.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredToken {
    token: String,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    checked_at: DateTime<Utc>,
}

impl StoredToken {
    /// Wrap a fresh token that expires `ttl` from `now`.
    #[must_use]
    pub fn issue(token: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token,
            expires_at: now + ttl,
            checked_at: now,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the last backend check is at least `interval` old.
    #[must_use]
    pub fn needs_check(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        now - self.checked_at >= interval
    }

    /// Record a successful backend check.
    pub const fn mark_checked(&mut self, now: DateTime<Utc>) {
        self.checked_at = now;
    }

    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// The token, wrapped for passing to the backend client.
    #[must_use]
    pub fn secret(&self) -> SecretString {
        SecretString::from(self.token.clone())
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// Bearer token ([`super::StoredToken`]).
    pub const AUTH_TOKEN: &str = "auth_token";

    /// The signed-in user as returned by the backend.
    pub const CURRENT_USER: &str = "current_user";

    /// Favorite product ids. Kept across logout.
    pub const FAVORITES: &str = "favorites";

    /// User id the favorites were last reconciled for.
    pub const FAVORITES_SYNCED_FOR: &str = "favorites_synced_for";

    /// Cart mirror.
    pub const CART: &str = "cart";
}
