//! HTTP server for Cal.com webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::models::WebhookEnvelope;
use crate::webhooks::verify_webhook_signature;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Arc<Config>,
    /// Event dispatcher.
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the HTTP router for the webhook sink.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/cal/webhook", post(cal_webhook_handler))
        .route("/health", get(health_check))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "cal-sink",
    }))
}

/// Fallback for unmatched routes.
async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Handle incoming Cal.com webhooks.
///
/// This handler:
/// 1. Verifies the webhook signature (if a secret is configured)
/// 2. Parses the envelope
/// 3. Dispatches to the reconciliation rules
async fn cal_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let signature = headers
        .get("x-cal-signature-256")
        .and_then(|v| v.to_str().ok());

    if !verify_webhook_signature(&body, signature, state.config.webhook_secret.as_deref()) {
        warn!("Rejected webhook with invalid signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid signature" })),
        );
    }

    // Envelopes that fail to parse are dropped as no-ops rather than
    // surfaced as failures, so unrecognized payloads never trigger
    // sender-side retries.
    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Failed to parse webhook envelope - ignoring");
            return (
                StatusCode::OK,
                Json(json!({ "success": true, "event": "UNKNOWN" })),
            );
        }
    };

    let trigger = envelope.trigger_event;
    info!(event = %trigger, "Received webhook");

    match state.dispatcher.handle(envelope).await {
        Ok(event) => (
            StatusCode::OK,
            Json(json!({ "success": true, "event": event })),
        ),
        Err(e) => {
            error!(event = %trigger, error = %e, "Failed to reconcile webhook event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error", "event": trigger })),
            )
        }
    }
}
