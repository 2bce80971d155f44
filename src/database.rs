use sqlx::{PgPool, postgres::PgPoolOptions};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to Postgres: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to apply migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// connect
///
/// Opens the process-wide pool and brings the schema up to date. Called once
/// from `main`; the returned pool is owned by the caller, which closes it
/// after the server stops.
pub async fn connect(config: &AppConfig) -> Result<PgPool, StartupError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .map_err(StartupError::Connect)?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database schema is up to date");

    Ok(pool)
}
