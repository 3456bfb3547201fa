//! HTTP adapter.
//!
//! Exposes ingestion, search and token accounting as a small JSON API for
//! the storefront chat backend.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `PUT`  | `/tenants/{tenant_id}` | Register a tenant, `{"display_name": "..."}` |
//! | `POST` | `/tenants/{tenant_id}/catalog` | Ingest a CSV export (raw request body) |
//! | `POST` | `/tenants/{tenant_id}/search` | `{"query": "...", "limit": 3}` |
//! | `POST` | `/tenants/{tenant_id}/usage` | `{"tokens": 120}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "validation", "message": "invalid catalog file: ..." } }
//! ```
//!
//! Error codes: `validation` (400), `bad_request` (400),
//! `payload_too_large` (413), `persistence` (500), `embedding` (502),
//! `vector_index` (503), `internal` (500).
//!
//! Catalog uploads are capped by `[server].max_upload_bytes`; the other
//! routes keep axum's default body limit.
//!
//! A search with no hits is not an error: it returns 200 with an empty
//! `results` array and a `message`.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        DefaultBodyLimit, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use storefront_catalog_core::error::{IngestError, RetrievalError};
use storefront_catalog_core::ingest::IngestReport;

use crate::catalog::Catalog;
use crate::search::SearchResponse;

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

/// Build the router with open CORS. Exposed for in-process testing.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let upload_limit = state.catalog.config().server.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/tenants/{tenant_id}", put(handle_register))
        .route(
            "/tenants/{tenant_id}/catalog",
            post(handle_ingest).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/tenants/{tenant_id}/search", post(handle_search))
        .route("/tenants/{tenant_id}/usage", post(handle_usage))
        .layer(cors)
        .with_state(state)
}

/// Serve on `[server].bind` until the process is terminated.
pub async fn run_server(catalog: Catalog) -> anyhow::Result<()> {
    let bind_addr = catalog.config().server.bind.clone();
    let app = router(AppState::new(Arc::new(catalog)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "catalog server listening");
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
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn status_for_code(code: &str) -> StatusCode {
    match code {
        "validation" => StatusCode::BAD_REQUEST,
        "embedding" => StatusCode::BAD_GATEWAY,
        "vector_index" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let code = err.code();
        AppError::new(status_for_code(code), code, err.to_string())
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        let code = err.code();
        AppError::new(status_for_code(code), code, err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", format!("{:#}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        let status = rejection.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "bad_request"
        };
        AppError::new(status, code, rejection.body_text())
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

// ============ PUT /tenants/{tenant_id} ============

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    tenant_id: String,
    created: bool,
}

async fn handle_register(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AppError> {
    let Json(request) = request?;
    let display_name = request
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let created = state
        .catalog
        .register_tenant(&tenant_id, display_name)
        .await?;
    Ok(Json(RegisterResponse { tenant_id, created }))
}

// ============ POST /tenants/{tenant_id}/catalog ============

async fn handle_ingest(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<IngestReport>, AppError> {
    let body = body?;
    if body.is_empty() {
        return Err(bad_request("request body must contain a CSV file"));
    }
    let report = state.catalog.ingest_csv(&tenant_id, &body).await?;
    Ok(Json(report))
}

// ============ POST /tenants/{tenant_id}/search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    request: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(request) = request?;
    if request.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let outcome = state
        .catalog
        .search(&tenant_id, &request.query, request.limit)
        .await?;
    Ok(Json(SearchResponse::from(outcome)))
}

// ============ POST /tenants/{tenant_id}/usage ============

#[derive(Deserialize)]
struct UsageRequest {
    tokens: i64,
}

#[derive(Serialize)]
struct UsageResponse {
    tenant_id: String,
    tokens_used: i64,
}

async fn handle_usage(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    request: Result<Json<UsageRequest>, JsonRejection>,
) -> Result<Json<UsageResponse>, AppError> {
    let Json(request) = request?;
    if request.tokens < 0 {
        return Err(bad_request("tokens must not be negative"));
    }
    let tokens_used = state
        .catalog
        .record_usage(&tenant_id, request.tokens)
        .await?;
    Ok(Json(UsageResponse {
        tenant_id,
        tokens_used,
    }))
}
