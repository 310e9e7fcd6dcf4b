//! Login, registration, logout and the private area.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::Ordering;
use std::time::Duration;

use atelier_integration_tests::{TestApp, USER_EMAIL, location};
use axum::http::StatusCode;

#[tokio::test]
async fn test_login_then_private_area() {
    let app = TestApp::spawn().await;
    app.login().await;

    let page = app.get_text("/account").await;
    assert!(page.contains("Welcome, Ada Lovelace"));
    assert!(page.contains(USER_EMAIL));
    assert!(page.contains("October 14, 2025"));
    assert!(page.contains("Customer"));
}

#[tokio::test]
async fn test_bad_credentials_store_nothing() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", USER_EMAIL), ("password", "wrong")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?error=credentials");

    let page = app.get_text("/auth/login?error=credentials").await;
    assert!(page.contains("Incorrect email or password."));

    let account = app.get("/account").await;
    assert_eq!(account.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&account), "/auth/login");
}

#[tokio::test]
async fn test_token_check_waits_for_interval() {
    let app = TestApp::spawn().await;
    app.login().await;

    app.get("/").await;
    app.get("/products").await;

    // Login just proved the token; the next check is a minute away
    assert_eq!(app.backend.protected_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_revoked_token_ends_session_on_next_page_load() {
    let app = TestApp::spawn_with(|config| config.token_check_interval = Duration::ZERO).await;
    app.login().await;
    assert!(app.get_text("/").await.contains("Ada Lovelace"));
    assert_eq!(app.backend.protected_calls.load(Ordering::SeqCst), 1);

    app.backend.revoke_token.store(true, Ordering::SeqCst);

    let home = app.get_text("/").await;
    assert!(!home.contains("Ada Lovelace"));
    assert!(home.contains("Log in"));
    assert_eq!(location(&app.get("/account").await), "/auth/login");
}

#[tokio::test]
async fn test_only_page_loads_check_the_token() {
    let app = TestApp::spawn_with(|config| config.token_check_interval = Duration::ZERO).await;
    app.login().await;

    let asset = app.get("/static/css/main.css").await;
    assert_eq!(asset.status(), StatusCode::OK);
    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
    app.htmx_post("/favorites/1/toggle", &[]).await;
    assert_eq!(app.backend.protected_calls.load(Ordering::SeqCst), 0);

    app.get("/products").await;
    assert_eq!(app.backend.protected_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expired_token_resyncs_favorites_on_next_login() {
    let app = TestApp::spawn_with(|config| config.token_ttl = Duration::from_secs(1)).await;
    app.backend.favorites.lock().unwrap().insert(1);
    app.login().await;
    assert!(app.get_text("/favorites").await.contains("Paper Lamp"));
    assert_eq!(app.backend.favorites_fetches.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(app.get_text("/").await.contains("Log in"));

    {
        let mut favorites = app.backend.favorites.lock().unwrap();
        favorites.clear();
        favorites.insert(3);
    }
    app.login().await;

    let page = app.get_text("/favorites").await;
    assert!(page.contains("Clay Vase"));
    assert!(!page.contains("Paper Lamp"));
    assert_eq!(app.backend.favorites_fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?success=logged_out");

    let account = app.get("/account").await;
    assert_eq!(location(&account), "/auth/login");

    let home = app.get_text("/").await;
    assert!(home.contains("Log in"));
    assert!(!home.contains("Ada Lovelace"));
}

#[tokio::test]
async fn test_register_success() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("firstname", "Grace"),
                ("lastname", "Hopper"),
                ("address", "1 Navy Yard"),
                ("email", "grace@example.com"),
                ("password", "cobol"),
                ("confirm_password", "cobol"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("grace@example.com"));

    let registrations = app.backend.registrations.lock().unwrap();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0]["firstname"], "Grace");
    assert!(registrations[0].get("confirm_password").is_none());
}

#[tokio::test]
async fn test_register_password_mismatch_never_reaches_backend() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("firstname", "Grace"),
                ("lastname", "Hopper"),
                ("address", "1 Navy Yard"),
                ("email", "grace@example.com"),
                ("password", "cobol"),
                ("confirm_password", "fortran"),
            ],
        )
        .await;
    assert_eq!(
        location(&response),
        "/auth/register?error=password_mismatch"
    );
    assert!(app.backend.registrations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_existing_user_shows_generic_error() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/auth/register",
            &[
                ("firstname", "Ada"),
                ("lastname", "Lovelace"),
                ("address", "12 St James's Square"),
                ("email", USER_EMAIL),
                ("password", "engine"),
                ("confirm_password", "engine"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/auth/register?error=backend");
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    // No database behind the lazy pool
    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
}
