use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;

/// Connects the shared PostgreSQL pool. Schema changes are applied out of band
/// from `migrations/` with `sqlx migrate run`.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!(max_connections = MAX_CONNECTIONS, "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
