use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

/// Opens a pool of connections to the PostgreSQL database at the given URL
pub async fn connect_sqlx(db_url: &str, max_connections: u32) -> Result<PgPool, anyhow::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(2))
        .connect(db_url)
        .await
        .context("connecting to the database")
}

/// Brings the database schema up to date with the migrations shipped in the binary
pub async fn migrate(db: &PgPool) -> Result<(), anyhow::Error> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("running database migrations")
}
