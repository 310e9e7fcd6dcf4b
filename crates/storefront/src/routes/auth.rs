//! Authentication route handlers.
//!
//! Handles login, registration and logout against the backend's token
//! endpoints. Failures redirect back to the form with an `?error=` code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::CurrentUser;
use crate::routes::PageContext;
use crate::services::{AuthError, LoginForm, RegistrationForm};
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Message shown for an `?error=` code.
fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Incorrect email or password.",
        "missing" => "Please fill in every field.",
        "email" => "Please enter a valid email address.",
        "password_mismatch" => "The passwords do not match.",
        "session" => "We could not sign you in. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Message shown for a `?success=` code.
fn success_message(code: &str) -> Option<&'static str> {
    match code {
        "logged_out" => Some("You have been logged out."),
        _ => None,
    }
}

/// The `?error=` code for a failed auth action.
const fn error_code(error: &AuthError) -> &'static str {
    match error {
        AuthError::MissingField(_) => "missing",
        AuthError::InvalidEmail(_) => "email",
        AuthError::PasswordMismatch => "password_mismatch",
        AuthError::InvalidCredentials => "credentials",
        AuthError::Session(_) => "session",
        AuthError::Backend(_) => "backend",
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub error: Option<&'static str>,
}

/// Registration success page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub page: PageContext,
    pub email: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    current: CurrentUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        page: PageContext::new(&current),
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().and_then(success_message),
    }
}

/// Handle login form submission.
///
/// On success the visitor lands on the home page, where the favorites are
/// reconciled for the new user.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth(&session).login(&form).await {
        Ok(user) => {
            set_sentry_user(&user.id, Some(&user.email));
            tracing::info!(user_id = %user.id, "User logged in");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!("Login failed: {e}");
            } else {
                tracing::error!("Login failed: {e}");
            }
            Redirect::to(&format!("/auth/login?error={}", error_code(&e))).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    current: CurrentUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::new(&current),
        error: query.error.as_deref().map(error_message),
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, current, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
    Form(form): Form<RegistrationForm>,
) -> Response {
    match state.auth(&session).register(&form).await {
        Ok(()) => RegisterSuccessTemplate {
            page: PageContext::new(&current),
            email: form.email.trim().to_string(),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            Redirect::to(&format!("/auth/register?error={}", error_code(&e))).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = state.auth(&session).logout().await {
        tracing::error!("Failed to clear session on logout: {e}");
    }
    clear_sentry_user();

    Redirect::to("/auth/login?success=logged_out").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_have_messages() {
        for code in ["credentials", "missing", "email", "password_mismatch", "session"] {
            assert_ne!(
                error_message(code),
                error_message("unknown"),
                "{code} should have its own message"
            );
        }
    }

    #[test]
    fn test_error_code_for_auth_errors() {
        assert_eq!(error_code(&AuthError::InvalidCredentials), "credentials");
        assert_eq!(error_code(&AuthError::MissingField("email")), "missing");
        assert_eq!(error_code(&AuthError::PasswordMismatch), "password_mismatch");
    }

    #[test]
    fn test_unknown_success_code_is_ignored() {
        assert!(success_message("logged_out").is_some());
        assert!(success_message("<script>").is_none());
    }
}
