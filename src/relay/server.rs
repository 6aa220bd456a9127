//! Relay server wiring

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handler::RelayHandler;
use super::upstream::build_http_client;
use crate::config::AppConfig;

/// Shared state for the relay
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<AppConfig>,
    pub http_client: reqwest::Client,
}

impl RelayState {
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http_client = build_http_client(&config.upstream)?;
        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }
}

/// Build the relay router from its state
pub fn build_router(state: RelayState) -> Router {
    let config = state.config.clone();

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::max(config.uploads.max_body_bytes));

    if config.static_files.enabled {
        app = app.fallback_service(ServeDir::new(&config.static_files.dir));
    }

    if config.cors.enabled {
        app = app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Run the relay server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    tokio::fs::create_dir_all(&config.uploads.dir).await.map_err(|e| {
        format!(
            "Failed to create upload directory {}: {}",
            config.uploads.dir.display(),
            e
        )
    })?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let upstream_url = config.upstream.url.clone();
    let state = RelayState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server is running on http://{}", addr);
    tracing::info!("Relaying uploads to {}", upstream_url);

    Ok(axum::serve(listener, app).await?)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Upload endpoint
async fn upload_handler(
    State(state): State<RelayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> axum::response::Response {
    let handler = RelayHandler::new(state);
    handler.handle(multipart).await
}
