//! Favorites route handlers.
//!
//! Toggling answers with the favorite button fragment plus an out-of-band
//! toast so the catalog card updates in place.

use askama::Template;
use askama_web::WebTemplate;
use atelier_core::ProductId;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::CurrentUser;
use crate::routes::{PageContext, ProductCard, Toast, products::session_favorites};
use crate::services::{
    BackendFavorites, FavoritesMirror, MutationOutcome, SessionFavoritesCache, Toggled,
};
use crate::state::AppState;

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "favorites/index.html")]
pub struct FavoritesIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
    pub error: Option<String>,
}

/// Favorite button fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorite_button.html")]
pub struct FavoriteButtonTemplate {
    pub product_id: i32,
    pub favorite: bool,
    pub toast: Option<Toast>,
}

/// Toast for a toggle result.
fn toggle_toast(toggled: Toggled) -> Toast {
    match toggled.outcome {
        MutationOutcome::Applied if toggled.favorite => Toast::success("Added to favorites"),
        MutationOutcome::Applied => Toast::success("Removed from favorites"),
        MutationOutcome::Unauthenticated => Toast::error("Log in to save favorites"),
        MutationOutcome::RemoteFailed => {
            Toast::error("Could not update favorites, please try again")
        }
    }
}

/// Display the favorite products.
#[instrument(skip(state, session, current))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
) -> impl IntoResponse {
    let favorites = session_favorites(session).await;

    let (products, error) = if favorites.is_empty() {
        (Vec::new(), None)
    } else {
        match state.backend().list_products().await {
            Ok(products) => (
                products
                    .iter()
                    .filter(|product| favorites.contains(product.id))
                    .map(|product| ProductCard::new(product, &favorites))
                    .collect(),
                None,
            ),
            Err(e) => {
                tracing::error!("Failed to load products for favorites: {e}");
                (
                    Vec::new(),
                    Some("Your favorites cannot be shown right now.".to_string()),
                )
            }
        }
    };

    FavoritesIndexTemplate {
        page: PageContext::new(&current),
        products,
        error,
    }
}

/// Toggle a favorite (HTMX).
#[instrument(skip(state, session, current))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let product_id = ProductId::new(id);
    let mirror = FavoritesMirror::new(
        SessionFavoritesCache::new(session),
        BackendFavorites::new(state.backend(), current.token()),
    );

    let toggled = mirror.toggle(current.user(), product_id).await?;
    if toggled.outcome == MutationOutcome::Applied {
        add_breadcrumb(
            "favorites",
            if toggled.favorite { "Favorite added" } else { "Favorite removed" },
            Some(&[("product_id", id.to_string().as_str())]),
        );
    }

    Ok(FavoriteButtonTemplate {
        product_id: id,
        favorite: toggled.favorite,
        toast: Some(toggle_toast(toggled)),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_toast_messages() {
        let added = toggle_toast(Toggled {
            outcome: MutationOutcome::Applied,
            favorite: true,
        });
        assert_eq!(added.message, "Added to favorites");
        assert_eq!(added.kind, "success");

        let removed = toggle_toast(Toggled {
            outcome: MutationOutcome::Applied,
            favorite: false,
        });
        assert_eq!(removed.message, "Removed from favorites");

        let anonymous = toggle_toast(Toggled {
            outcome: MutationOutcome::Unauthenticated,
            favorite: false,
        });
        assert_eq!(anonymous.message, "Log in to save favorites");
        assert_eq!(anonymous.kind, "error");
    }
}
