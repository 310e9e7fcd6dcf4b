//! HTTP client for the Atelier backend.

use std::sync::Arc;
use std::time::Duration;

use atelier_core::{
    Cart, CartOrder, CheckoutItem, OrderItemId, Product, ProductId, User, UserId,
};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AddFavoriteRequest, AddToCartRequest, AddToCartResponse, CheckoutRequest, CheckoutResponse,
    CurrentUserBody, FavoriteEntry, ImageRef, LoginRequest, LoginResponse, NewProductForm,
    NewProductRequest, RegisterRequest, UpdateQuantityRequest,
};
use super::{BackendError, error_message};
use crate::config::BackendConfig;

/// Client for the Atelier backend API.
///
/// Cheap to clone. The catalog (`/products`, `/products/{id}`) is cached for
/// 60 seconds; everything user-scoped goes to the backend every time.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("atelier-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(60))
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<RequestBuilder, BackendError> {
        let url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| BackendError::InvalidEndpoint(path.to_string()))?;

        let builder = self.inner.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    /// Send a request and decode the JSON response.
    ///
    /// An empty success body decodes as JSON `null`.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                endpoint,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
                StatusCode::NOT_FOUND => BackendError::NotFound(endpoint.to_string()),
                _ => BackendError::Status {
                    status: status.as_u16(),
                    message: error_message(&body),
                },
            });
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                endpoint,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Get the full catalog.
    ///
    /// A response that is not a JSON array is treated as an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or an entry is malformed.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for catalog");
            return Ok(products);
        }

        let request = self.request(Method::GET, "products", None)?;
        let value: serde_json::Value = self.execute(request, "products").await?;

        let products = if value.is_array() {
            serde_json::from_value::<Vec<Product>>(value)?
        } else {
            tracing::warn!("Catalog response is not an array, showing an empty catalog");
            Vec::new()
        };

        let products = Arc::new(products);
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let endpoint = format!("products/{id}");
        let request = self.request(Method::GET, &endpoint, None)?;
        let product: Option<Product> = self.execute(request, &endpoint).await?;
        let product = product.ok_or(BackendError::NotFound(endpoint))?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Create one product listed by the given user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, token, form), fields(name = %form.name))]
    pub async fn create_product(
        &self,
        token: Option<&SecretString>,
        form: &NewProductForm,
        user_id: UserId,
        img_path: &str,
    ) -> Result<(), BackendError> {
        let body = NewProductRequest {
            form,
            user_id,
            img: ImageRef { img_path },
        };
        let request = self.request(Method::POST, "product", token)?.json(&body);
        let _: serde_json::Value = self.execute(request, "product").await?;

        self.inner.cache.invalidate_all();
        Ok(())
    }

    /// Bulk insert products (`POST /products`).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the batch.
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub async fn seed_products(&self, products: &[serde_json::Value]) -> Result<(), BackendError> {
        let request = self.request(Method::POST, "products", None)?.json(products);
        let _: serde_json::Value = self.execute(request, "products").await?;

        self.inner.cache.invalidate_all();
        Ok(())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a token and the user.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` for rejected credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, BackendError> {
        let request = self
            .request(Method::POST, "login", None)?
            .json(&LoginRequest { email, password });
        self.execute(request, "login").await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Status` with the backend's message on rejection.
    #[instrument(skip(self, registration), fields(email = registration.email))]
    pub async fn register(&self, registration: &RegisterRequest<'_>) -> Result<(), BackendError> {
        let request = self.request(Method::POST, "register", None)?.json(registration);
        let _: serde_json::Value = self.execute(request, "register").await?;
        Ok(())
    }

    /// Resolve the user behind a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the token is not accepted.
    #[instrument(skip(self, token))]
    pub async fn protected(&self, token: &SecretString) -> Result<User, BackendError> {
        let request = self.request(Method::GET, "protected", Some(token))?;
        self.execute(request, "protected").await
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Get a user's favorites.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn favorites(
        &self,
        token: Option<&SecretString>,
        user_id: UserId,
    ) -> Result<Vec<FavoriteEntry>, BackendError> {
        let endpoint = format!("my-favorites/{user_id}");
        let request = self.request(Method::GET, &endpoint, token)?;
        let entries: Option<Vec<FavoriteEntry>> = self.execute(request, &endpoint).await?;
        Ok(entries.unwrap_or_default())
    }

    /// Mark a product as favorite.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not confirm.
    #[instrument(skip(self, token, user), fields(user_id = %user.id))]
    pub async fn add_favorite(
        &self,
        token: Option<&SecretString>,
        user: &User,
        product_id: ProductId,
    ) -> Result<(), BackendError> {
        let body = AddFavoriteRequest {
            prod_id: product_id,
            current_user: user,
        };
        let request = self.request(Method::POST, "my-favorites", token)?.json(&body);
        let _: serde_json::Value = self.execute(request, "my-favorites").await?;
        Ok(())
    }

    /// Unmark a favorite product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not confirm.
    #[instrument(skip(self, token, user), fields(user_id = %user.id))]
    pub async fn remove_favorite(
        &self,
        token: Option<&SecretString>,
        user: &User,
        product_id: ProductId,
    ) -> Result<(), BackendError> {
        let endpoint = format!("my-favorites/{product_id}");
        let request = self
            .request(Method::DELETE, &endpoint, token)?
            .json(&CurrentUserBody { current_user: user });
        let _: serde_json::Value = self.execute(request, &endpoint).await?;
        Ok(())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Get a user's pending cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the orders are malformed.
    #[instrument(skip(self, token))]
    pub async fn cart(
        &self,
        token: Option<&SecretString>,
        user_id: UserId,
    ) -> Result<Cart, BackendError> {
        let endpoint = format!("my-cart/{user_id}");
        let request = self.request(Method::GET, &endpoint, token)?;
        let orders: Option<Vec<CartOrder>> = self.execute(request, &endpoint).await?;
        Ok(Cart::from_orders(orders.unwrap_or_default()))
    }

    /// Add one unit of a product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the addition.
    #[instrument(skip(self, token, user, product), fields(user_id = %user.id, product_id = %product.id))]
    pub async fn add_to_cart(
        &self,
        token: Option<&SecretString>,
        user: &User,
        product: &Product,
    ) -> Result<AddToCartResponse, BackendError> {
        let body = AddToCartRequest {
            item: product,
            current_user: user,
        };
        let request = self.request(Method::POST, "my-cart", token)?.json(&body);
        let value: serde_json::Value = self.execute(request, "my-cart").await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Push a new quantity for one cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the quantity.
    #[instrument(skip(self, token))]
    pub async fn update_cart_quantity(
        &self,
        token: Option<&SecretString>,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let body = UpdateQuantityRequest {
            counter: quantity,
            order_item_id: item_id,
        };
        let request = self.request(Method::PUT, "my-cart", token)?.json(&body);
        let _: serde_json::Value = self.execute(request, "my-cart").await?;
        Ok(())
    }

    /// Remove a product from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not confirm.
    #[instrument(skip(self, token, user), fields(user_id = %user.id))]
    pub async fn remove_from_cart(
        &self,
        token: Option<&SecretString>,
        user: &User,
        product_id: ProductId,
    ) -> Result<(), BackendError> {
        let endpoint = format!("my-cart/{product_id}");
        let request = self
            .request(Method::DELETE, &endpoint, token)?
            .json(&CurrentUserBody { current_user: user });
        let _: serde_json::Value = self.execute(request, &endpoint).await?;
        Ok(())
    }

    /// Request a payment session and return its redirect URL.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Checkout` when no URL comes back.
    #[instrument(skip(self, items), fields(lines = items.len(), subtotal = %subtotal))]
    pub async fn create_checkout_session(
        &self,
        items: &[CheckoutItem],
        subtotal: Decimal,
    ) -> Result<String, BackendError> {
        let request = self
            .request(Method::POST, "create-checkout-session", None)?
            .json(&CheckoutRequest { items, subtotal });
        let response: CheckoutResponse =
            self.execute(request, "create-checkout-session").await?;

        match response.url {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(BackendError::Checkout(
                response
                    .error
                    .unwrap_or_else(|| "no redirect URL".to_string()),
            )),
        }
    }
}
