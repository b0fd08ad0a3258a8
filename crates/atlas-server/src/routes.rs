//! API route handlers.

use crate::server::AppState;
use atlas_core::DEFAULT_SESSION;
use atlas_rag::RagError;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Handler failure, rendered in the shapes the frontend expects.
pub enum ApiError {
    /// Field-level validation failure, keyed by field name.
    Validation { field: &'static str, message: String },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation { field, message } => {
                (StatusCode::BAD_REQUEST, Json(json!({ field: [message] }))).into_response()
            }
            ApiError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "details": details,
                })),
            )
                .into_response(),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        match e {
            RagError::InvalidQuery(message) => ApiError::Validation {
                field: "query",
                message,
            },
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

fn session_or_default(session: Option<String>) -> String {
    session
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}

/// Run synchronous database work off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}

#[derive(Debug, Deserialize)]
pub struct RagQueryRequest {
    #[serde(default)]
    pub query: String,
    pub session: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionParams {
    pub session: Option<String>,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let documents = run_blocking(move || {
        state
            .engine
            .db()
            .count_documents()
            .map_err(|e| ApiError::Internal(e.to_string()))
    })
    .await?;

    Ok(Json(json!({
        "status": "ok",
        "documents": documents,
    })))
}

/// Answer a question against the indexed documents.
pub async fn rag_query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RagQueryRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = session_or_default(body.session);
    info!("Query in session {}", session);

    let response = state.engine.query(&session, &body.query).await?;
    let structured_locations = response.structured_data.legacy_locations();

    let mut payload = serde_json::to_value(&response).map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Some(map) = payload.as_object_mut() {
        map.insert(
            "structured_locations".to_string(),
            Value::Array(structured_locations),
        );
    }

    Ok(Json(payload))
}

/// Delete the chat history of a session.
pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // The body is optional; anything unparsable means the default session.
    let params: SessionParams = serde_json::from_slice(&body).unwrap_or_default();
    let session = session_or_default(params.session);
    let deleted = run_blocking(move || Ok(state.engine.clear_history(&session)?)).await?;

    Ok(Json(json!({
        "ok": true,
        "deleted": deleted,
    })))
}

/// List the chat history of a session, oldest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Result<Json<Value>, ApiError> {
    let session = session_or_default(params.session);
    let messages = {
        let session = session.clone();
        run_blocking(move || Ok(state.engine.history(&session)?)).await?
    };

    Ok(Json(json!({
        "session": session,
        "messages": messages,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking_returns_result() {
        let value = run_blocking(|| Ok(21 * 2)).await.ok();
        assert_eq!(value, Some(42));

        let err = run_blocking(|| -> Result<(), ApiError> {
            Err(RagError::InvalidQuery("too short".to_string()).into())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "query", .. }));
    }

    #[tokio::test]
    async fn test_run_blocking_panic_is_internal_error() {
        let err = run_blocking(|| -> Result<(), ApiError> { panic!("worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
