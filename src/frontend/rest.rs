//! REST frontend
//!
//! ```text
//! PUT    /v1/{key}   {"data": "<value>"}  -> 201
//! GET    /v1/{key}                        -> 200 {"value": "<value>"} | 404
//! DELETE /v1/{key}                        -> 204
//! GET    /healthz                         -> 200 | 503 once the log writer died
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ErrorKind, KvError, Result};
use crate::service::KvService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<KvService>,
}

#[derive(Debug, Deserialize)]
struct PutRequest {
    #[serde(default, alias = "Data")]
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub value: String,
}

/// Error returned from a handler
pub struct ApiError(KvError);

impl From<KvError> for ApiError {
    fn from(e: KvError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput | ErrorKind::Protocol => StatusCode::BAD_REQUEST,
            ErrorKind::CapacityExceeded => StatusCode::INSUFFICIENT_STORAGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string()
        }));

        (status, body).into_response()
    }
}

/// Build the router over a service
pub fn router(service: Arc<KvService>) -> Router {
    Router::new()
        .route(
            "/v1/{key}",
            get(handle_get).put(handle_put).delete(handle_delete),
        )
        .route("/healthz", get(handle_health))
        .with_state(AppState { service })
}

/// Handle PUT /v1/{key}
async fn handle_put(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> std::result::Result<StatusCode, ApiError> {
    let request: PutRequest = serde_json::from_slice(&body)
        .map_err(|e| KvError::InvalidInput(format!("invalid request body: {}", e)))?;

    // Enqueueing may block on a full log queue.
    let service = state.service;
    blocking(move || service.put(&key, &request.data)).await?;

    Ok(StatusCode::CREATED)
}

/// Handle GET /v1/{key}
async fn handle_get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> std::result::Result<Json<GetResponse>, ApiError> {
    let value = state.service.get(&key)?;
    Ok(Json(GetResponse { value }))
}

/// Handle DELETE /v1/{key}
async fn handle_delete(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> std::result::Result<StatusCode, ApiError> {
    let service = state.service;
    blocking(move || service.delete(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle GET /healthz
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.writer_error() {
        None => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Some(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "failed", "error": e.to_string() })),
        ),
    }
}

async fn blocking<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KvError::Io(std::io::Error::other(e)))?
}

/// HTTP frontend bound to `listen_addr`
pub struct RestFrontend {
    listen_addr: String,
}

impl RestFrontend {
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
        }
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests
    pub async fn serve<S>(self, service: Arc<KvService>, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("REST server listening on {}", listener.local_addr()?);

        axum::serve(listener, router(service))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("REST server shut down gracefully");
        Ok(())
    }
}
