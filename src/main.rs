use anyhow::Context;
use chrono::Utc;
use dotenv::dotenv;
use project_tracker::app_env::Settings;
use project_tracker::{SharedData, build_router, db, domain, logging, persistence};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let dotenv_result = dotenv();

    let settings = Settings::from_env()?;
    let otel_exporters = match &settings.otel_endpoints {
        Some((span_url, metric_url)) => Some(logging::init_exporters(span_url, metric_url)?),
        None => None,
    };
    logging::setup_logging_and_tracing(logging::init_env_filter()?, otel_exporters);
    if dotenv_result.is_err() {
        info!("No .env file found, using process environment only");
    }

    let sqlx_db_connection = db::connect_sqlx(&settings.database_url, settings.db_max_connections).await?;
    db::migrate(&sqlx_db_connection).await?;

    let mut ext_cxn = persistence::ExternalConnectivity::new(sqlx_db_connection);
    if settings.seed_sample_projects {
        let seeded = domain::project::ProjectService {}
            .seed_sample_projects(
                Utc::now(),
                &mut ext_cxn,
                &persistence::db_project_driven_ports::DbReadProjects {},
                &persistence::db_project_driven_ports::DbWriteProjects {},
            )
            .await?;
        info!(seeded, "Seeded sample projects");
    }

    let router = build_router(Arc::new(SharedData {
        ext_cxn,
        require_bearer_token: settings.require_bearer_token,
    }));

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("binding to {}", settings.bind_address))?;
    info!(address = %settings.bind_address, "Starting server");
    axum::serve(listener, router)
        .await
        .context("serving HTTP requests")
}
