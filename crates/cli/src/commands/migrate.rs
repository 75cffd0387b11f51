//! Database migration commands.
//!
//! The storefront keeps only browser sessions in `PostgreSQL`; products,
//! carts and accounts live in the hosted backend. The session table is
//! created by the session store itself.
//!
//! # Usage
//!
//! ```bash
//! shophub-cli migrate sessions
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the
//!   session store (falls back to `DATABASE_URL`)

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use shophub_storefront::config::get_database_url;
use shophub_storefront::middleware::postgres_store;

/// Create the `tower_sessions` schema and session table if missing.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or the migration fails.
pub async fn sessions() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;

    info!("Connecting to session database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    info!("Running session store migration...");
    postgres_store(&pool).migrate().await?;

    info!("Session store migration complete!");
    Ok(())
}
