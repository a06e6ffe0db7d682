//! Connection pool set-up and pre-flight check

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::error::ConfigError;

/// Create the pool and open its first connection
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, ConfigError> {
    let options = config.connect_options()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout())
        .connect_with(options)
        .await
        .map_err(ConfigError::Database)?;

    tracing::info!(
        target_db = %config.display_target(),
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// `SELECT 1` round trip
pub async fn health_check(pool: &PgPool) -> Result<(), ConfigError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(ConfigError::Database)
}
