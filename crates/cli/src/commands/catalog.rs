//! Print the catalog as the storefront would filter it.

use atelier_core::{CatalogParams, CatalogQuery, catalog::category_label};
use tracing::info;

use atelier_storefront::backend::BackendClient;
use atelier_storefront::config::BackendConfig;

/// List products matching the optional text and category filters.
///
/// # Errors
///
/// Returns an error if `ATELIER_BACKEND_URL` is missing or the backend call
/// fails.
pub async fn list(
    q: Option<String>,
    cat: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let backend = BackendClient::new(&BackendConfig::from_env()?)?;
    let products = backend.list_products().await?;

    let query = CatalogQuery::from_params(&CatalogParams { q, cat });
    let found = query.apply(&products);

    info!(
        "{} of {} products (category: {})",
        found.len(),
        products.len(),
        category_label(query.category().as_param())
    );
    for product in found {
        info!(
            "  #{:<5} {:<32} {:<12} {:>10}  stock {}",
            product.id,
            product.name,
            category_label(&product.category_key()),
            product.price_display(),
            product.amount
        );
    }

    Ok(())
}
