//! Session store migration.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)

use secrecy::SecretString;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use atelier_storefront::db;

/// Create the `tower_sessions` schema and table if missing.
///
/// # Errors
///
/// Returns an error if no database URL is set or the migration fails.
pub async fn session_store() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL not set")?;

    info!("Connecting to session database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running session store migration...");
    PostgresStore::new(pool).migrate().await?;

    info!("Session store ready");
    Ok(())
}
