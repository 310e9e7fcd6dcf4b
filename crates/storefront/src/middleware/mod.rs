//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, new hub per request)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, signed cookie)
//! 5. Visitor restore (token expiry, `/protected`, favorites reconcile)
//! 6. Rate limiting on `/auth/*` (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;
pub mod visitor;

pub use auth::{AuthRejection, CurrentUser, RequireUser, SignedIn};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
pub use visitor::restore_visitor;
