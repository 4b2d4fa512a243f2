mod error;
mod pages;
mod routes;

use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use teashelf_db::InventoryDb;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<InventoryDb>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teashelf_server=info,tower_http=info".into()),
        )
        .init();

    // Data directory
    let data_dir = std::env::var("TEASHELF_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    tracing::info!("data directory: {}", data_dir.display());

    let db = InventoryDb::open_path(&data_dir.join("tea.db"))?;
    tracing::info!("database initialized");

    let state = AppState { db: Arc::new(db) };

    let app = Router::new()
        .route("/", get(routes::admin::index).post(routes::admin::submit))
        .route(
            "/brew",
            get(routes::brew::landing).post(routes::brew::landing_post),
        )
        .route(
            "/select_location",
            get(routes::brew::select_location).post(routes::brew::select_location_post),
        )
        .route(
            "/brew_result/{location_id}",
            get(routes::brew::brew_result).post(routes::brew::confirm),
        )
        .route("/health", get(routes::health::health))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("listening on 0.0.0.0:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
