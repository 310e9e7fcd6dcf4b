//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::{
    CatalogParams, CatalogQuery, FavoriteSet, ProductId,
    catalog::{PLACEHOLDER_IMAGE, available_categories, category_label},
};
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendError, NewProductForm};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{CurrentUser, RequireUser};
use crate::routes::{PageContext, ProductCard};
use crate::services::{FavoritesCache, SessionFavoritesCache};
use crate::state::AppState;

/// Category option for the filter bar.
#[derive(Clone)]
pub struct CategoryOption {
    pub key: String,
    pub label: String,
    pub selected: bool,
    /// Listing URL selecting this category, keeping the search text.
    pub href: String,
}

fn category_href(key: &str, query: &str) -> String {
    if query.trim().is_empty() {
        format!("/products?cat={}", urlencoding::encode(key))
    } else {
        format!(
            "/products?q={}&cat={}",
            urlencoding::encode(query.trim()),
            urlencoding::encode(key)
        )
    }
}

/// Query parameters of the new product page.
#[derive(Debug, Deserialize)]
pub struct NewProductQuery {
    pub error: Option<String>,
    pub created: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
    pub categories: Vec<CategoryOption>,
    pub query: String,
    pub error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductCard,
}

/// Product not found page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/not_found.html")]
pub struct ProductNotFoundTemplate {
    pub page: PageContext,
}

/// New product page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/new.html")]
pub struct NewProductTemplate {
    pub page: PageContext,
    pub error: Option<&'static str>,
    pub created: bool,
}

/// Favorites held by the session, empty when unreadable.
pub(crate) async fn session_favorites(session: Session) -> FavoriteSet {
    SessionFavoritesCache::new(session)
        .load()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to read favorites from session: {e}");
            FavoriteSet::new()
        })
}

/// Display the product listing page, filtered by `?q=` and `?cat=`.
#[instrument(skip(state, session, current))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
    Query(params): Query<CatalogParams>,
) -> impl IntoResponse {
    let filter = CatalogQuery::from_params(&params);
    let favorites = session_favorites(session).await;

    let (products, categories, error) = match state.backend().list_products().await {
        Ok(products) => {
            let cards = filter
                .apply(&products)
                .into_iter()
                .map(|product| ProductCard::new(product, &favorites))
                .collect();
            (cards, available_categories(&products), None)
        }
        Err(e) => {
            tracing::error!("Failed to load products: {e}");
            (
                Vec::new(),
                Vec::new(),
                Some("The catalog is unavailable right now.".to_string()),
            )
        }
    };

    let query = params.q.unwrap_or_default();
    let selected = filter.category().as_param();
    let categories = categories
        .into_iter()
        .map(|key| CategoryOption {
            label: category_label(&key),
            selected: key == selected,
            href: category_href(&key, &query),
            key,
        })
        .collect();

    ProductsIndexTemplate {
        page: PageContext::new(&current),
        products,
        categories,
        query,
        error,
    }
}

/// Display the product detail page.
#[instrument(skip(state, session, current))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let page = PageContext::new(&current);

    match state.backend().get_product(ProductId::new(id)).await {
        Ok(product) => {
            let favorites = session_favorites(session).await;
            Ok(ProductShowTemplate {
                page,
                product: ProductCard::new(&product, &favorites),
            }
            .into_response())
        }
        Err(BackendError::NotFound(_)) => {
            Ok((StatusCode::NOT_FOUND, ProductNotFoundTemplate { page }).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// New Product
// =============================================================================

/// Check a new product form before it is sent.
///
/// Returns the `?error=` code of the first problem.
fn validate_product(form: &NewProductForm) -> Result<(), &'static str> {
    if [&form.name, &form.category, &form.details, &form.price]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err("missing");
    }

    match form.price.trim().parse::<Decimal>() {
        Ok(price) if price.is_sign_negative() => return Err("price"),
        Ok(_) => {}
        Err(_) => return Err("price"),
    }

    let amount = form.amount.trim();
    if !amount.is_empty() && amount.parse::<u32>().is_err() {
        return Err("amount");
    }

    Ok(())
}

fn product_error_message(code: &str) -> &'static str {
    match code {
        "missing" => "Name, category, details and price are required.",
        "price" => "The price must be a positive number.",
        "amount" => "The stock must be a whole number.",
        _ => "The product could not be created.",
    }
}

/// Display the new product form.
pub async fn new_page(
    RequireUser(visitor): RequireUser,
    Query(query): Query<NewProductQuery>,
) -> impl IntoResponse {
    NewProductTemplate {
        page: PageContext::new(&CurrentUser(Some(visitor))),
        error: query.error.as_deref().map(product_error_message),
        created: query.created.is_some(),
    }
}

/// Handle new product form submission.
#[instrument(skip(state, visitor, form), fields(user_id = %visitor.user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(visitor): RequireUser,
    Form(form): Form<NewProductForm>,
) -> Response {
    if let Err(code) = validate_product(&form) {
        return Redirect::to(&format!("/products/new?error={code}")).into_response();
    }

    match state
        .backend()
        .create_product(visitor.token(), &form, visitor.user.id, PLACEHOLDER_IMAGE)
        .await
    {
        Ok(()) => {
            tracing::info!(name = %form.name, "Product created");
            Redirect::to("/products/new?created=1").into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create product: {e}");
            Redirect::to("/products/new?error=backend").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(price: &str) -> NewProductForm {
        NewProductForm {
            name: "Vase".to_string(),
            category: "sculptures".to_string(),
            details: "Hand thrown".to_string(),
            price: price.to_string(),
            amount: String::new(),
        }
    }

    #[test]
    fn test_category_href_keeps_search_text() {
        assert_eq!(category_href("statue", ""), "/products?cat=statue");
        assert_eq!(
            category_href("statue", " blue vase "),
            "/products?q=blue%20vase&cat=statue"
        );
    }

    #[test]
    fn test_valid_product() {
        assert_eq!(validate_product(&form("25.50")), Ok(()));
        assert_eq!(validate_product(&form("0")), Ok(()));
    }

    #[test]
    fn test_missing_fields() {
        let mut missing_name = form("10");
        missing_name.name = "   ".to_string();
        assert_eq!(validate_product(&missing_name), Err("missing"));
        assert_eq!(validate_product(&form("")), Err("missing"));
    }

    #[test]
    fn test_price_must_be_non_negative_number() {
        assert_eq!(validate_product(&form("abc")), Err("price"));
        assert_eq!(validate_product(&form("-3")), Err("price"));
    }

    #[test]
    fn test_amount_is_optional_but_numeric() {
        let mut with_amount = form("10");
        with_amount.amount = "4".to_string();
        assert_eq!(validate_product(&with_amount), Ok(()));

        with_amount.amount = "four".to_string();
        assert_eq!(validate_product(&with_amount), Err("amount"));
    }
}
