//! LocalLibrary Server
//!
//! REST API server for the local library catalog and loans.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use locallibrary_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::{redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting LocalLibrary Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let redis_service = RedisService::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    tracing::info!("Connected to Redis");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        config.users.clone(),
        config.loans.clone(),
        &config.redis,
        Arc::new(redis_service),
    );

    services
        .users
        .ensure_bootstrap_admin()
        .await
        .context("Failed to create bootstrap admin")?;

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global subscriber: stdout in the configured format, plus an
/// optional daily-rolling file
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("locallibrary_server={},tower_http=debug", config.level).into()
    });

    let stdout = match config.format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().boxed(),
    };

    let (file, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "locallibrary.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .with(filter)
        .init();

    guard
}
