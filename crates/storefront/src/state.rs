//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tower_sessions::Session;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::services::{AuthService, CartService, LineSequencer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    backend: BackendClient,
    sequencer: LineSequencer,
    token_ttl: chrono::Duration,
    token_check_interval: chrono::Duration,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let token_ttl =
            chrono::Duration::from_std(config.token_ttl).unwrap_or(chrono::Duration::hours(2));
        let token_check_interval = chrono::Duration::from_std(config.token_check_interval)
            .unwrap_or(chrono::Duration::minutes(1));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backend,
                sequencer: LineSequencer::new(),
                token_ttl,
                token_check_interval,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the session store's connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Authentication service for one visitor session.
    #[must_use]
    pub fn auth<'a>(&'a self, session: &'a Session) -> AuthService<'a> {
        AuthService::new(
            &self.inner.backend,
            session,
            self.inner.token_ttl,
            self.inner.token_check_interval,
        )
    }

    /// Cart service for one visitor session.
    #[must_use]
    pub fn cart<'a>(&'a self, session: &'a Session) -> CartService<'a> {
        CartService::new(&self.inner.backend, session, &self.inner.sequencer)
    }
}
