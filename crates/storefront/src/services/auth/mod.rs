//! Authentication service.
//!
//! Holds one authenticated user per visitor session, backed by the bearer
//! token issued by the backend. The token is stored with an expiry; an
//! expired token is dropped without asking the backend. Page loads re-check
//! the token against `GET /protected` at most once per check interval, so a
//! token revoked by the backend ends the session on the next page load.

mod error;

pub use error::AuthError;

use atelier_core::{Email, User};
use chrono::{Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendClient, BackendError, RegisterRequest};
use crate::models::{StoredToken, keys};

/// Login form fields.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form fields.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Check the form locally before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` for the first empty field, `InvalidEmail` for a
    /// malformed address and `PasswordMismatch` when the two passwords differ.
    pub fn validate(&self) -> Result<Email, AuthError> {
        let fields = [
            ("firstname", self.firstname.as_str()),
            ("lastname", self.lastname.as_str()),
            ("address", self.address.as_str()),
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
            ("confirm_password", self.confirm_password.as_str()),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AuthError::MissingField(*name));
        }

        let email = Email::parse(&self.email)?;

        if self.password != self.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        Ok(email)
    }
}

/// Authentication service bound to one visitor session.
pub struct AuthService<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
    token_ttl: Duration,
    check_interval: Duration,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(
        backend: &'a BackendClient,
        session: &'a Session,
        token_ttl: Duration,
        check_interval: Duration,
    ) -> Self {
        Self {
            backend,
            session,
            token_ttl,
            check_interval,
        }
    }

    /// Log in with email and password and store the token and user.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` for empty input, `InvalidCredentials` when the
    /// backend refuses and `Backend`/`Session` for infrastructure failures.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn login(&self, form: &LoginForm) -> Result<User, AuthError> {
        let email = form.email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if form.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let response = self
            .backend
            .login(email, &form.password)
            .await
            .map_err(|e| match e {
                BackendError::Unauthorized | BackendError::NotFound(_) => {
                    AuthError::InvalidCredentials
                }
                BackendError::Status { status, .. } if (400..500).contains(&status) => {
                    AuthError::InvalidCredentials
                }
                other => AuthError::Backend(other),
            })?;

        let token = StoredToken::issue(response.token, Utc::now(), self.token_ttl);

        // New privilege level, new session id; the favorites cache is kept
        // but reconciled again, the cart mirror belongs to the previous user.
        self.session.cycle_id().await?;
        self.session.remove_value(keys::FAVORITES_SYNCED_FOR).await?;
        self.session.remove_value(keys::CART).await?;
        self.session.insert(keys::AUTH_TOKEN, &token).await?;
        self.session.insert(keys::CURRENT_USER, &response.user).await?;

        tracing::info!(user_id = %response.user.id, "User logged in");
        Ok(response.user)
    }

    /// Validate and submit a registration.
    ///
    /// Does not log the new user in.
    ///
    /// # Errors
    ///
    /// Returns a validation error from [`RegistrationForm::validate`] or
    /// `Backend` if the backend rejects the account.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<(), AuthError> {
        let email = form.validate()?;

        self.backend
            .register(&RegisterRequest {
                firstname: form.firstname.trim(),
                lastname: form.lastname.trim(),
                address: form.address.trim(),
                email: email.as_str(),
                password: &form.password,
            })
            .await?;

        tracing::info!("User registered");
        Ok(())
    }

    /// Bring the session's user in line with its token.
    ///
    /// - no token: any cached user is dropped
    /// - expired token: the session's user state is dropped without a
    ///   backend call
    /// - no cached user, or a page load whose last check is older than the
    ///   check interval: `GET /protected`; failure drops the user state
    ///
    /// # Errors
    ///
    /// Returns `Session` if the session store fails. Backend failures are
    /// logged and end the session instead.
    #[instrument(skip(self))]
    pub async fn restore(&self, page_load: bool) -> Result<Option<User>, AuthError> {
        let Some(mut token) = self.session.get::<StoredToken>(keys::AUTH_TOKEN).await? else {
            self.session.remove_value(keys::CURRENT_USER).await?;
            return Ok(None);
        };

        let now = Utc::now();
        if token.is_expired(now) {
            tracing::info!(expired_at = %token.expires_at(), "Dropping expired token");
            self.clear().await?;
            return Ok(None);
        }

        let due = page_load && token.needs_check(now, self.check_interval);
        let cached = self.session.get::<User>(keys::CURRENT_USER).await?;
        if let Some(user) = cached.filter(|_| !due) {
            return Ok(Some(user));
        }

        match self.backend.protected(&token.secret()).await {
            Ok(user) => {
                token.mark_checked(now);
                self.session.insert(keys::AUTH_TOKEN, &token).await?;
                self.session.insert(keys::CURRENT_USER, &user).await?;
                tracing::debug!(user_id = %user.id, "Token accepted");
                Ok(Some(user))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token rejected, dropping it");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Log out.
    ///
    /// The favorites cache stays; the next login reconciles it again.
    ///
    /// # Errors
    ///
    /// Returns `Session` if the session store fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.clear().await?;
        tracing::info!("User logged out");
        Ok(())
    }

    /// The user currently held by the session.
    ///
    /// # Errors
    ///
    /// Returns `Session` if the session store fails.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        Ok(self.session.get::<User>(keys::CURRENT_USER).await?)
    }

    /// The bearer token, unless missing or expired.
    ///
    /// # Errors
    ///
    /// Returns `Session` if the session store fails.
    pub async fn token(&self) -> Result<Option<SecretString>, AuthError> {
        let token = self.session.get::<StoredToken>(keys::AUTH_TOKEN).await?;
        Ok(token
            .filter(|token| !token.is_expired(Utc::now()))
            .map(|token| token.secret()))
    }

    /// Drop everything tied to the signed-in user. Favorites stay cached.
    async fn clear(&self) -> Result<(), AuthError> {
        self.session.remove_value(keys::AUTH_TOKEN).await?;
        self.session.remove_value(keys::CURRENT_USER).await?;
        self.session.remove_value(keys::FAVORITES_SYNCED_FOR).await?;
        self.session.remove_value(keys::CART).await?;
        Ok(())
    }
}
