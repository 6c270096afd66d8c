use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod metrics;
mod repository;
mod seed;

use api::AppState;
use config::Config;
use metrics::Metrics;
use repository::{MemoryOrderStore, MeteredStore, OrderStore, PgOrderStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, overridable with RUST_LOG
    // Example: RUST_LOG=order_query=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_query=debug")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Starting order query service");

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);

    // === 2. Store ===
    let backend: Arc<dyn OrderStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let store = PgOrderStore::connect(url, config.db_max_connections).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryOrderStore::new())
        }
    };
    let store: Arc<dyn OrderStore> = Arc::new(MeteredStore::new(backend, metrics.clone()));

    // === 3. Demo data ===
    if config.seed_demo_data {
        seed::load_demo_data(store.as_ref()).await?;
    }

    // === 4. HTTP ===
    let state = web::Data::new(AppState {
        store,
        metrics: metrics.clone(),
    });
    let metrics_data = web::Data::new(metrics);

    tracing::info!("Listening on http://{}", config.socket_addr());

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(metrics_data.clone())
            .configure(api::configure)
    })
    .bind(config.socket_addr())?
    .run()
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}
