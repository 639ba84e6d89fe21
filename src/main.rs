use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod clock;
mod config;
mod db;
mod error;
mod handlers;
mod metrics;
mod models;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::dynamo::{self, DynamoProductStore};
use crate::db::ProductStore;
use crate::metrics::{MetricsStore, SharedMetrics};

/// Shared application state, cheap to clone (everything sits behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProductStore>,
    pub clock: Arc<dyn Clock>,
    pub metrics: SharedMetrics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,product_service=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!(
        region = %config.region,
        table = %config.table_name,
        endpoint = config.dynamodb_endpoint.as_deref().unwrap_or("default"),
        "Connecting to DynamoDB"
    );
    let client = dynamo::create_client(&config).await;
    let store = DynamoProductStore::new(client, config.table_name.clone());
    if config.ensure_table {
        store.ensure_table().await?;
    }

    let state = AppState {
        store: Arc::new(store),
        clock: Arc::new(SystemClock),
        metrics: MetricsStore::shared(),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Product service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Probes ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))

        // ── Products CRUD ───────────────────────────────────────────────────
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics::track_requests,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
