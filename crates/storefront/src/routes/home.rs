//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::CurrentUser;
use crate::routes::{PageContext, ProductCard, products::session_favorites};
use crate::state::AppState;

/// Number of products in the featured strip.
const FEATURED_COUNT: usize = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub featured: Vec<ProductCard>,
}

/// Display the home page.
#[instrument(skip(state, session, current))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
) -> impl IntoResponse {
    let favorites = session_favorites(session).await;

    let featured = match state.backend().list_products().await {
        Ok(products) => products
            .iter()
            .take(FEATURED_COUNT)
            .map(|product| ProductCard::new(product, &favorites))
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to load featured products: {e}");
            Vec::new()
        }
    };

    HomeTemplate {
        page: PageContext::new(&current),
        featured,
    }
}
