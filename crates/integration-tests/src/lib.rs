//! Integration test harness for the Atelier storefront.
//!
//! Every test spawns the storefront router on a random port next to an
//! in-process fake of the Atelier backend, then drives it over HTTP with a
//! cookie-keeping `reqwest` client. Sessions live in `MemoryStore`; the
//! `PostgreSQL` pool is lazy and never connected.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower_sessions::MemoryStore;

use atelier_storefront::config::{BackendConfig, SentryConfig, StorefrontConfig};
use atelier_storefront::middleware::create_session_layer;
use atelier_storefront::state::AppState;

pub const USER_ID: i32 = 1;
pub const USER_EMAIL: &str = "ada@example.com";
pub const USER_PASSWORD: &str = "correct horse";
pub const USER_TOKEN: &str = "token-ada";
pub const CHECKOUT_URL: &str = "https://pay.example.com/session/cs_test_1";

/// Session secret used by every test server.
const TEST_SESSION_SECRET: &str =
    "k3J9qLm2Xv8RtZp4Wn7Yb5Hc1Gd6Fs0Ae2Uo9Ij4Kl7Mn3Bv8Cx5Za1Qw6Er0Ty2Ui4Op9As3Df7";

// =============================================================================
// Fake Backend
// =============================================================================

/// One line of the fake cart.
#[derive(Debug, Clone)]
pub struct FakeLine {
    pub item_id: i32,
    pub product_id: i32,
    pub quantity: u32,
}

/// Recorded state of the fake backend.
#[derive(Default)]
pub struct FakeState {
    pub products: Mutex<Vec<Value>>,
    pub favorites: Mutex<BTreeSet<i32>>,
    pub cart: Mutex<Vec<FakeLine>>,
    /// `(order_item_id, counter)` of every accepted `PUT /my-cart`
    pub quantity_pushes: Mutex<Vec<(i32, u32)>>,
    pub created_products: Mutex<Vec<Value>>,
    pub registrations: Mutex<Vec<Value>>,
    pub checkouts: Mutex<Vec<Value>>,
    /// Every favorites mutation answers 500 while set
    pub fail_favorites: AtomicBool,
    /// Checkout answers `{error}` instead of `{url}` while set
    pub fail_checkout: AtomicBool,
    /// Delay applied to `PUT /my-cart`, in milliseconds
    pub update_delay_ms: AtomicU64,
    pub protected_calls: AtomicUsize,
    /// `GET /protected` refuses the token while set
    pub revoke_token: AtomicBool,
    /// Number of `GET /my-favorites/{user_id}` calls
    pub favorites_fetches: AtomicUsize,
    next_item_id: AtomicUsize,
}

impl FakeState {
    fn product(&self, id: i32) -> Option<Value> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p["id"] == json!(id))
            .cloned()
    }

    /// Put a product in the cart directly.
    pub fn seed_cart_line(&self, product_id: i32, quantity: u32) -> i32 {
        let next = self.next_item_id.fetch_add(1, Ordering::SeqCst);
        let item_id = i32::try_from(next + 100).unwrap();
        self.cart.lock().unwrap().push(FakeLine {
            item_id,
            product_id,
            quantity,
        });
        item_id
    }
}

/// The user payload the backend returns.
#[must_use]
pub fn user_json() -> Value {
    json!({
        "id": USER_ID,
        "firstname": "Ada",
        "lastname": "Lovelace",
        "email": USER_EMAIL,
        "rol": "costumer",
        "is_active": true,
        "created_at": "Tue, 14 Oct 2025 10:00:00 GMT"
    })
}

fn default_products() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Paper Lamp", "category": "home_decoration", "price": 45.0,
               "details": "Washi paper on oak", "img_path": "img/lamp.jpg", "amount": 3}),
        json!({"id": 2, "name": "Bronze Cat", "category": "Statue", "price": "120.50",
               "details": "Lost-wax bronze", "img_path": "/img/cat.jpg", "amount": 1}),
        json!({"id": 3, "name": "Clay Vase", "category": "sculptures", "price": 30,
               "details": "Hand thrown", "img_path": null, "amount": 5}),
        json!({"id": 4, "name": "Blue Lamp", "category": "home_decoration", "price": 60,
               "details": "Glazed ceramic base", "img_path": "img/blue.jpg", "amount": 0}),
    ]
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {USER_TOKEN}"))
}

fn msg(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "msg": text }))).into_response()
}

async fn list_products(State(state): State<Arc<FakeState>>) -> Json<Value> {
    Json(Value::Array(state.products.lock().unwrap().clone()))
}

async fn get_product(State(state): State<Arc<FakeState>>, Path(id): Path<i32>) -> Response {
    state.product(id).map_or_else(
        || msg(StatusCode::NOT_FOUND, "Product not found"),
        |product| Json(product).into_response(),
    )
}

async fn seed_products(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Vec<Value>>,
) -> Response {
    let mut products = state.products.lock().unwrap();
    for (offset, mut product) in body.into_iter().enumerate() {
        product["id"] = json!(100 + offset);
        products.push(product);
    }
    msg(StatusCode::CREATED, "Products created")
}

async fn create_product(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return msg(StatusCode::UNAUTHORIZED, "Missing Authorization Header");
    }
    {
        let mut products = state.products.lock().unwrap();
        let id = products.len() + 1;
        let mut product = body["form"].clone();
        product["id"] = json!(id);
        product["img_path"] = body["img"]["img_path"].clone();
        product["amount"] = json!(
            product["amount"]
                .as_str()
                .and_then(|amount| amount.parse::<u32>().ok())
                .unwrap_or(0)
        );
        products.push(product);
    }
    state.created_products.lock().unwrap().push(body);
    msg(StatusCode::CREATED, "Product created")
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == json!(USER_EMAIL) && body["password"] == json!(USER_PASSWORD) {
        Json(json!({ "token": USER_TOKEN, "user": user_json() })).into_response()
    } else {
        msg(StatusCode::UNAUTHORIZED, "Bad email or password")
    }
}

async fn register(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    if body["email"] == json!(USER_EMAIL) {
        return msg(StatusCode::BAD_REQUEST, "User already exists");
    }
    state.registrations.lock().unwrap().push(body);
    msg(StatusCode::CREATED, "User created")
}

async fn protected(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.protected_calls.fetch_add(1, Ordering::SeqCst);
    if authorized(&headers) && !state.revoke_token.load(Ordering::SeqCst) {
        Json(user_json()).into_response()
    } else {
        msg(StatusCode::UNAUTHORIZED, "Token has expired")
    }
}

async fn list_favorites(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
) -> Response {
    state.favorites_fetches.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) || user_id != USER_ID {
        return msg(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let rows: Vec<Value> = state
        .favorites
        .lock()
        .unwrap()
        .iter()
        .enumerate()
        .map(|(row, prod_id)| json!({ "id": row + 1, "prod_id": prod_id, "user_id": USER_ID }))
        .collect();
    Json(Value::Array(rows)).into_response()
}

async fn add_favorite(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return msg(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if state.fail_favorites.load(Ordering::SeqCst) {
        return msg(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }
    assert_eq!(body["currentUser"]["id"], json!(USER_ID));
    let prod_id = i32::try_from(body["prod_id"].as_i64().unwrap()).unwrap();
    state.favorites.lock().unwrap().insert(prod_id);
    msg(StatusCode::CREATED, "Favorite added")
}

async fn remove_favorite(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(prod_id): Path<i32>,
) -> Response {
    if !authorized(&headers) {
        return msg(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if state.fail_favorites.load(Ordering::SeqCst) {
        return msg(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }
    state.favorites.lock().unwrap().remove(&prod_id);
    msg(StatusCode::OK, "Favorite removed")
}

async fn get_cart(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(user_id): Path<i32>,
) -> Response {
    state.favorites_fetches.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) || user_id != USER_ID {
        return msg(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let lines: Vec<Value> = state
        .cart
        .lock()
        .unwrap()
        .iter()
        .map(|line| {
            json!({
                "item_id": line.item_id,
                "quantity_ordered": line.quantity,
                "product_details": state.product(line.product_id).unwrap(),
            })
        })
        .collect();

    if lines.is_empty() {
        Json(json!([])).into_response()
    } else {
        Json(json!([{ "id": 7, "status": "pending", "products": lines }])).into_response()
    }
}

async fn add_to_cart(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return msg(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let product_id = i32::try_from(body["item"]["id"].as_i64().unwrap()).unwrap();
    let stock = u32::try_from(body["item"]["amount"].as_u64().unwrap_or(0)).unwrap();

    let existing = state
        .cart
        .lock()
        .unwrap()
        .iter_mut()
        .find(|line| line.product_id == product_id)
        .map(|line| {
            line.quantity += 1;
            line.quantity
        });
    let quantity = match existing {
        Some(quantity) => quantity,
        None => {
            state.seed_cart_line(product_id, 1);
            1
        }
    };

    (StatusCode::CREATED, Json(json!({ "quantity": quantity, "stock": stock }))).into_response()
}

async fn update_cart(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return msg(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let delay = state.update_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let item_id = i32::try_from(body["order_item_id"].as_i64().unwrap()).unwrap();
    let counter = u32::try_from(body["counter"].as_u64().unwrap()).unwrap();
    if let Some(line) = state
        .cart
        .lock()
        .unwrap()
        .iter_mut()
        .find(|line| line.item_id == item_id)
    {
        line.quantity = counter;
    }
    state.quantity_pushes.lock().unwrap().push((item_id, counter));
    msg(StatusCode::OK, "Quantity updated")
}

async fn remove_from_cart(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(product_id): Path<i32>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return msg(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    assert_eq!(body["currentUser"]["id"], json!(USER_ID));
    state
        .cart
        .lock()
        .unwrap()
        .retain(|line| line.product_id != product_id);
    msg(StatusCode::OK, "Product removed")
}

async fn create_checkout_session(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.checkouts.lock().unwrap().push(body);
    if state.fail_checkout.load(Ordering::SeqCst) {
        Json(json!({ "error": "Stripe is not configured" }))
    } else {
        Json(json!({ "url": CHECKOUT_URL }))
    }
}

/// Serve the fake backend and return its state and base URL.
pub async fn spawn_backend() -> (Arc<FakeState>, String) {
    let state = Arc::new(FakeState {
        products: Mutex::new(default_products()),
        ..FakeState::default()
    });

    let router = Router::new()
        .route("/products", get(list_products).post(seed_products))
        .route("/products/{id}", get(get_product))
        .route("/product", post(create_product))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/protected", get(protected))
        .route("/my-favorites", post(add_favorite))
        .route("/my-favorites/{id}", get(list_favorites).delete(remove_favorite))
        .route("/my-cart", post(add_to_cart).put(update_cart))
        .route("/my-cart/{id}", get(get_cart).delete(remove_from_cart))
        .route("/create-checkout-session", post(create_checkout_session))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (state, format!("http://{addr}/"))
}

// =============================================================================
// Storefront
// =============================================================================

/// A running storefront wired to a fake backend.
pub struct TestApp {
    pub url: String,
    pub client: reqwest::Client,
    pub backend: Arc<FakeState>,
}

impl TestApp {
    /// Start a fresh backend and storefront.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Start a fresh backend and a storefront with adjusted configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut StorefrontConfig)) -> Self {
        let (backend, backend_url) = spawn_backend().await;

        let mut config = StorefrontConfig {
            database_url: SecretString::from("postgres://atelier@127.0.0.1:1/atelier_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            session_secret: SecretString::from(TEST_SESSION_SECRET),
            token_ttl: Duration::from_secs(2 * 60 * 60),
            token_check_interval: Duration::from_secs(60),
            rate_limit_auth: false,
            backend: BackendConfig::for_url(&backend_url).unwrap(),
            sentry: SentryConfig::default(),
        };
        configure(&mut config);

        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://atelier@127.0.0.1:1/atelier_test")
            .unwrap();
        let session_layer = create_session_layer(MemoryStore::default(), &config).unwrap();
        let state = AppState::new(config, pool).unwrap();
        let app = atelier_storefront::app(state, session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            client: new_client(),
            backend,
        }
    }

    /// A second visitor on the same storefront.
    #[must_use]
    pub fn new_visitor(&self) -> reqwest::Client {
        new_client()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.url))
            .send()
            .await
            .unwrap()
    }

    pub async fn get_text(&self, path: &str) -> String {
        self.get(path).await.text().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.url))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// POST the way htmx does, with the `HX-Request` header.
    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.url))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Log in as the fake backend's user.
    pub async fn login(&self) {
        let response = self
            .post_form(
                "/auth/login",
                &[("email", USER_EMAIL), ("password", USER_PASSWORD)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }
}

fn new_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
