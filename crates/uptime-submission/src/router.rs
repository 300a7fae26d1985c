//! HTTP surface: routes, the Content-Length gate and the bounded body read.

use crate::domain::config::LimitsConfig;
use crate::domain::SubmitError;
use crate::service::SubmissionPipeline;
use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Body of `GET /`.
pub const IDENTIFICATION: &str = "uptime submission backend";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SubmissionPipeline>,
    pub limits: LimitsConfig,
    /// Flipped by the runtime once startup has completed
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(pipeline: Arc<SubmissionPipeline>, ready: Arc<AtomicBool>) -> Self {
        let limits = pipeline.config().limits.clone();
        Self {
            pipeline,
            limits,
            ready,
        }
    }
}

/// Build the backend router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(identify))
        .route("/health", get(health_check))
        .route("/v1/submit", post(submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn identify() -> &'static str {
    IDENTIFICATION
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.ready.load(Ordering::Acquire) {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "starting" })),
        )
    }
}

async fn submit(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<impl IntoResponse, SubmitError> {
    let declared = declared_length(req.headers(), state.limits.max_payload_size)?;
    let remote_addr = remote_addr(&req);

    let body = read_body(req.into_body(), declared, &state.limits).await?;
    state.pipeline.process(&body, &remote_addr).await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))))
}

/// Validate the Content-Length header against the payload limit.
fn declared_length(headers: &HeaderMap, max: u64) -> Result<u64, SubmitError> {
    let value = headers
        .get(header::CONTENT_LENGTH)
        .ok_or(SubmitError::LengthRequired)?;
    let size = value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or(SubmitError::InvalidContentLength)?;

    if size > max {
        debug!(size, max, "Payload too large");
        return Err(SubmitError::PayloadTooLarge { size, max });
    }
    Ok(size)
}

/// Read exactly `declared` bytes within the configured timeout.
async fn read_body(body: Body, declared: u64, limits: &LimitsConfig) -> Result<Bytes, SubmitError> {
    let limit = usize::try_from(declared).map_err(|_| SubmitError::BodyRead)?;

    let bytes = tokio::time::timeout(limits.body_read_timeout(), to_bytes(body, limit))
        .await
        .map_err(|_| {
            debug!("Body read timed out");
            SubmitError::BodyRead
        })?
        .map_err(|e| {
            debug!(error = %e, "Body read failed");
            SubmitError::BodyRead
        })?;

    if bytes.len() != limit {
        debug!(declared, actual = bytes.len(), "Body length mismatch");
        return Err(SubmitError::BodyRead);
    }
    Ok(bytes)
}

/// First `X-Forwarded-For` hop, else the TCP peer address.
fn remote_addr<B>(req: &Request<B>) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(first) = forwarded {
        return first.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
