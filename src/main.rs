use axum::{ServiceExt, extract::Request};
use listings_marketplace::{
    AppState,
    config::{AppConfig, Env},
    create_app,
    repository::{MemoryRepository, PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, persistence, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "listings_marketplace=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Persistence
    let repo = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: Failed to run database migrations.");

            tracing::info!("Using Postgres repository.");
            Arc::new(PostgresRepository::new(pool)) as RepositoryState
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory repository. Data is lost on restart.");
            Arc::new(MemoryRepository::new()) as RepositoryState
        }
    };

    // 5. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app = create_app(AppState { repo, config });

    // 6. Server Startup
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .await
        .expect("FATAL: HTTP server error.");
}
