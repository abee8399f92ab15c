//! Route handlers.
//!
//! The intake handler acknowledges a webhook as soon as its event has been
//! handed to the dispatcher. Delivery failures never reach the webhook
//! sender; they show up only in the counters and the logs.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use bridge::metrics::{ALL_PROJECTS, OP_RECEIVED, RESULT_TOTAL};
use bridge::{MetricsSnapshot, ParseError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dump::dump_request;
use crate::AppState;

/// Result recorded for webhook bodies the parser rejected.
pub const RESULT_REJECTED: &str = "rejected";

/// Errors that stop a webhook from being dispatched.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The body is not a usable Jira issue webhook.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = match &self {
            IntakeError::Parse(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// `GET /`
pub async fn home_handler() -> Html<&'static str> {
    Html("<h1>MatterBridge Handler</h1><div>Jira to Mattermost bridge</div>")
}

/// `POST /hooks/` — accepts a Jira issue webhook.
///
/// # Response
///
/// - 200 OK: event parsed and handed to the dispatcher
/// - 400 Bad Request: body is not a usable Jira issue webhook
///
/// A debug dump that cannot be written is logged and does not stop dispatch.
pub async fn intake_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), IntakeError> {
    let counters = state.dispatcher().counters();
    counters.increment(OP_RECEIVED, ALL_PROJECTS, RESULT_TOTAL);
    debug!(content_length = body.len(), "Received webhook");

    if let Some(dir) = state.dump_dir() {
        match dump_request(dir, &method, &uri, &headers, &body).await {
            Ok(path) => debug!(path = %path.display(), "Request dumped"),
            Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to dump request"),
        }
    }

    let event = match jira::parse_issue_event(&body) {
        Ok(event) => event,
        Err(e) => {
            counters.increment(OP_RECEIVED, ALL_PROJECTS, RESULT_REJECTED);
            warn!(error = %e, "Rejected webhook payload");
            return Err(e.into());
        }
    };

    info!(
        event_type = %event.event_type,
        project = %event.project,
        issue_id = %event.issue_id,
        "Webhook accepted"
    );
    let handle = state.dispatcher().submit(event);
    state.collector().spawn(handle);

    Ok((StatusCode::OK, "OK"))
}

/// Counter snapshot served by the metrics endpoints.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub in_flight: usize,
}

/// `GET /metrics` and `GET /hooks/` — counter snapshot, 404 when disabled.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled() {
        return StatusCode::NOT_FOUND.into_response();
    }
    let dispatcher = state.dispatcher();
    Json(MetricsResponse {
        snapshot: dispatcher.counters().snapshot(),
        in_flight: dispatcher.in_flight(),
    })
    .into_response()
}

/// Liveness report served by `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub routes: usize,
    pub in_flight: usize,
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let dispatcher = state.dispatcher();
    Json(HealthResponse {
        status: "ok",
        routes: dispatcher.routes().len(),
        in_flight: dispatcher.in_flight(),
    })
}
