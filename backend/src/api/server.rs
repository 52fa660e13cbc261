//! HTTP server for the clickcheck API.
//!
//! # API Endpoints
//!
//! | Method | Path          | Description                          |
//! |--------|---------------|--------------------------------------|
//! | GET    | `/health`     | Health check                         |
//! | POST   | `/api/check`  | Upload a sheet and check every row   |
//! | GET    | `/api/logs`   | SSE stream for real-time logs        |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, CheckResponse};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::parser::IngestOptions;
use crate::pipeline::check_bytes;
use crate::rules::RuleConfig;

type ApiError = (StatusCode, Json<Value>);

/// Shared, read-only server state.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<RuleConfig>,
}

impl AppState {
    pub fn new(config: RuleConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/check", post(check_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Bind to `port` on all interfaces and serve until the process stops.
pub async fn start_server(port: u16, config: RuleConfig) -> ServerResult<()> {
    let app = router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 clickcheck server running on http://localhost:{}", port);
    println!("   POST /api/check - Upload a sheet for checking");
    println!("   GET  /api/logs  - SSE log stream");
    println!("   GET  /health    - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "clickcheck",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "check": "POST /api/check",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // lagged receivers just drop the missed entries
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn reject(err: &ServerError) -> ApiError {
    let status = match err {
        ServerError::BadRequest(_) | ServerError::Pipeline(PipelineError::Ingest(_)) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log_error(err.to_string());
    (status, Json(error_response(&err.to_string())))
}

/// Parse the optional `skipRows` form field.
fn parse_skip_rows(raw: &str) -> ServerResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ServerError::BadRequest(format!("Invalid skipRows: '{}'", raw.trim())))
}

async fn check_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CheckResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = IngestOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(&ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    reject(&ServerError::BadRequest(format!("Read error: {}", e)))
                })?;
                file_data = Some(bytes.to_vec());
            }
            "skipRows" => {
                let text = field.text().await.map_err(|e| {
                    reject(&ServerError::BadRequest(format!("Read error: {}", e)))
                })?;
                options.skip_rows = parse_skip_rows(&text).map_err(|e| reject(&e))?;
            }
            _ => {}
        }
    }

    let bytes = file_data
        .ok_or_else(|| reject(&ServerError::BadRequest("No file provided".to_string())))?;

    let config = Arc::clone(&state.config);
    let name = file_name.clone();
    let result = tokio::task::spawn_blocking(move || {
        check_bytes(&bytes, name.as_deref(), options, &config)
    })
    .await
    .map_err(|e| {
        log_error(format!("Check task failed: {}", e));
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response("Check task failed")),
        )
    })?
    .map_err(|e| reject(&ServerError::Pipeline(e)))?;

    Ok(Json(CheckResponse::new(result, file_name)))
}
