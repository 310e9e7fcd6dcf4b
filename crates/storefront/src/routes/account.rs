//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::{CurrentUser, RequireUser};
use crate::routes::PageContext;

/// User display data for templates.
#[derive(Clone)]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub role: String,
    pub member_since: Option<String>,
    pub active: bool,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub user: UserView,
}

/// Display the private area.
pub async fn index(RequireUser(visitor): RequireUser) -> impl IntoResponse {
    let user = &visitor.user;
    let view = UserView {
        name: user.display_name(),
        email: user.email.clone(),
        role: match &user.rol {
            atelier_core::Role::Admin => "Administrator".to_string(),
            atelier_core::Role::Customer => "Customer".to_string(),
            atelier_core::Role::Artist => "Artist".to_string(),
            atelier_core::Role::Other(other) => other.clone(),
        },
        member_since: user
            .registered_on()
            .map(|date| date.format("%B %-d, %Y").to_string()),
        active: user.is_active,
    };

    AccountIndexTemplate {
        page: PageContext::new(&CurrentUser(Some(visitor))),
        user: view,
    }
}
