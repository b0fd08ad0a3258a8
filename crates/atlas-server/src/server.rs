//! HTTP server implementation using Axum.

use crate::error::{ServerError, ServerResult};
use crate::routes;
use atlas_config::{expand_path, Config};
use atlas_rag::QueryEngine;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the API server.
pub struct AppState {
    /// Query engine limited to the API's query length range.
    pub engine: QueryEngine,
    pub config: Config,
}

impl AppState {
    pub fn new(engine: QueryEngine, config: Config) -> Self {
        let engine = engine.with_query_limits(config.server.min_query_chars, config.server.max_query_chars);
        Self { engine, config }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> ServerResult<Router> {
    let static_dir = state.config.server.static_dir.clone();
    let shared = Arc::new(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(routes::health))
        .route("/api/rag-query/", post(routes::rag_query))
        .route("/api/clear-history/", post(routes::clear_history))
        .route("/api/history/", get(routes::history))
        .with_state(shared);

    if let Some(dir) = static_dir {
        let path = expand_path(&dir);
        if !path.is_dir() {
            return Err(ServerError::StaticDirNotFound(path.display().to_string()));
        }
        info!("Serving frontend from {}", path.display());
        router = router.fallback_service(ServeDir::new(path));
    }

    Ok(router.layer(cors).layer(TraceLayer::new_for_http()))
}

/// Bind `server.host:server.port` and serve until the process stops.
pub async fn serve(state: AppState) -> ServerResult<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = build_router(state)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("Atlas API listening on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
