//! HTTP search API.
//!
//! Exposes semantic search over indexed meetings for the notes UI and other
//! internal callers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search` | Semantic search over indexed meetings |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Blank queries return `bad_request` (400). Every other search failure,
//! whether from the embedder, the vector index, or the record store, is
//! logged server-side and returned as `search_unavailable` (503) with a
//! generic message. Callers get nothing actionable from upstream detail and
//! the index endpoint's error text should not leak to browsers.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::Error;
use crate::models::SearchHit;
use crate::records::RecordStore;
use crate::retriever::{merge_with_records, Retriever};

/// Shared application state passed to route handlers via Axum's `State`.
#[derive(Clone)]
struct AppState {
    retriever: Arc<Retriever>,
    records: Arc<dyn RecordStore>,
}

/// Starts the search server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated. The retriever and record store are built by the
/// caller so the serve command and tests can wire in their own backends.
pub async fn run_server(
    config: &Config,
    retriever: Arc<Retriever>,
    records: Arc<dyn RecordStore>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState { retriever, records };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("Search server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs the generic 503 returned for any backend search failure.
fn search_unavailable() -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "search_unavailable".to_string(),
        message: "search temporarily unavailable".to_string(),
    }
}

/// Maps retrieval errors to HTTP responses. Query validation surfaces as a
/// 400; everything else is logged here and collapsed into the generic 503.
fn classify_search_error(err: Error) -> AppError {
    match err {
        Error::InvalidQuery => bad_request(err.to_string()),
        other => {
            tracing::error!("search failed: {}", other);
            search_unavailable()
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /search ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// Handler for `POST /search`.
///
/// Rejects blank queries before touching the retriever, then merges index
/// hits with the current record store rows so edits made since indexing are
/// reflected in the response.
async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let hits = state
        .retriever
        .search(&req.query, req.top_k)
        .await
        .map_err(classify_search_error)?;

    let results = merge_with_records(hits, state.records.as_ref())
        .await
        .map_err(classify_search_error)?;

    Ok(Json(SearchResponse { results }))
}
