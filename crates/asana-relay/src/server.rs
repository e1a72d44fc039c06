//! HTTP server for Asana webhooks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::events::{WebhookPayload, HOOK_SECRET_HEADER};
use crate::rules::RuleSet;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Rules applied to every delivered event.
    pub rules: Arc<RuleSet>,
}

/// Build the HTTP router for the relay.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Handle incoming Asana webhooks.
///
/// This handler:
/// 1. Answers the handshake by echoing `X-Hook-Secret`, before looking at the body
/// 2. Acknowledges event batches immediately
/// 3. Runs the rules over the batch in a background task
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = headers.get(HOOK_SECRET_HEADER) {
        info!("Answering webhook handshake");
        return (
            StatusCode::OK,
            [(HeaderName::from_static(HOOK_SECRET_HEADER), secret.clone())],
        )
            .into_response();
    }

    if body.is_empty() {
        return StatusCode::OK.into_response();
    }

    let payload = match WebhookPayload::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to parse webhook payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if !payload.has_events() {
        debug!("Webhook body has no events, ignoring");
        return StatusCode::OK.into_response();
    }

    let events = payload.into_events();
    if events.is_empty() {
        return StatusCode::OK.into_response();
    }

    info!(count = events.len(), "Received Asana events");

    // Asana expects a fast acknowledgement, so the rules run after the response.
    let rules = Arc::clone(&state.rules);
    tokio::spawn(async move {
        let report = rules.process_batch(&events).await;
        info!(
            events = report.events,
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            "Event batch processed"
        );
    });

    StatusCode::OK.into_response()
}
