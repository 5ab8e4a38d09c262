//! HTTP control surface for logs and the scheduler.
//!
//! ## Endpoints
//!
//! - `GET /api/logs/recent`: buffered records (`level`, `logger`, `limit`, `offset`)
//! - `GET /api/logs/loggers`: distinct logger names
//! - `POST /api/logs/clear`: drop buffered records
//! - `GET /api/logs/file`: tail of the persistent log (`lines`)
//! - `GET /api/scheduler/status`: scheduler snapshot
//! - `POST /api/scheduler/start` / `POST /api/scheduler/stop`
//!
//! Every response is a JSON object with a `success` flag; failures carry a
//! `message`.

use crate::config::ServerConfig;
use crate::error::{Result, WatchError};
use crate::logging::{LogQuery, LogService};
use crate::scheduler::{Scheduler, SchedulerStatus};
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query string of `GET /api/logs/recent`.
#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub level: Option<String>,
    pub logger: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Query string of `GET /api/logs/file`.
#[derive(Debug, Default, Deserialize)]
pub struct FileParams {
    pub lines: Option<String>,
}

/// Parse an optional non-negative count from the query string. Empty means
/// absent.
fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse::<usize>().map(Some).map_err(|_| {
            WatchError::InvalidQuery(format!("{name} must be a non-negative integer, got '{value}'"))
        }),
    }
}

/// Scheduler status wrapped in the success envelope.
#[derive(Debug, Serialize)]
struct StatusEnvelope {
    success: bool,
    #[serde(flatten)]
    status: SchedulerStatus,
}

/// [`WatchError`] rendered as a `{ success: false, message }` response.
#[derive(Debug)]
pub struct ApiError(pub WatchError);

impl From<WatchError> for ApiError {
    fn from(err: WatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            WatchError::LogBufferNotInitialized => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Log handler not initialized".to_owned(),
            ),
            WatchError::LogFileNotFound => (StatusCode::NOT_FOUND, "Log file not found".to_owned()),
            WatchError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => {
                error!("request failed: {other}");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Handles the routes operate on. Built by the composition root.
#[derive(Clone)]
pub struct AppState {
    pub logs: LogService,
    pub scheduler: Scheduler,
}

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs/recent", get(handle_recent))
        .route("/api/logs/loggers", get(handle_loggers))
        .route("/api/logs/clear", post(handle_clear))
        .route("/api/logs/file", get(handle_file))
        .route("/api/scheduler/status", get(handle_status))
        .route("/api/scheduler/start", post(handle_start))
        .route("/api/scheduler/stop", post(handle_stop))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// ApiServer
// ---------------------------------------------------------------------------

/// Background HTTP server serving [`router`].
pub struct ApiServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ApiServer {
    /// Bind `{config.host}:{config.port}` (port `0` auto-assigns) and serve
    /// in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(state: AppState, config: &ServerConfig) -> Result<Self> {
        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| WatchError::Server(format!("bind {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| WatchError::Server(format!("failed to get local addr: {e}")))?;

        info!("control API listening on http://{addr}/api");

        let app = router(state);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("control API server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn handle_recent(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let query = LogQuery::from_params(
        params.level.as_deref(),
        params.logger.as_deref(),
        parse_count("limit", params.limit.as_deref())?,
        parse_count("offset", params.offset.as_deref())?,
    )?;
    let page = state.logs.recent(&query)?;
    Ok(Json(json!({
        "success": true,
        "logs": page.logs,
        "total": page.total,
        "offset": page.offset,
        "limit": page.limit,
    })))
}

async fn handle_loggers(
    State(state): State<AppState>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let loggers = state.logs.logger_names()?;
    Ok(Json(json!({ "success": true, "loggers": loggers })))
}

async fn handle_clear(
    State(state): State<AppState>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    state.logs.clear()?;
    info!("in-memory logs cleared");
    Ok(Json(json!({ "success": true, "message": "Logs cleared successfully" })))
}

async fn handle_file(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let requested = parse_count("lines", params.lines.as_deref())?;
    let logs = state.logs.clone();
    let lines = tokio::task::spawn_blocking(move || logs.tail_file(requested))
        .await
        .map_err(|e| WatchError::Server(format!("log file reader failed: {e}")))??;
    Ok(Json(json!({
        "success": true,
        "total_lines": lines.len(),
        "logs": lines,
    })))
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusEnvelope> {
    Json(StatusEnvelope {
        success: true,
        status: state.scheduler.status(),
    })
}

async fn handle_start(
    State(state): State<AppState>,
) -> std::result::Result<Json<serde_json::Value>, ApiError> {
    let started = state.scheduler.start()?;
    Ok(Json(json!({
        "success": true,
        "started": started,
        "status": state.scheduler.status(),
    })))
}

async fn handle_stop(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stopped = state.scheduler.stop();
    Json(json!({
        "success": true,
        "stopped": stopped,
        "status": state.scheduler.status(),
    }))
}
