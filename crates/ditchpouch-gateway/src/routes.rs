//! API route handlers for the gateway.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use ditchpouch_channels::whatsapp::{parse_webhook, verify_signature, verify_subscription};
use ditchpouch_core::error::DitchPouchError;
use ditchpouch_core::types::{Event, Outbound};
use serde::Deserialize;
use std::sync::Arc;

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ditchpouch",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

fn error_response(status: StatusCode, e: impl std::fmt::Display) -> Response {
    (status, Json(serde_json::json!({"ok": false, "error": e.to_string()}))).into_response()
}

/// Current persisted progress.
pub async fn get_progress(State(state): State<Arc<AppState>>) -> Response {
    match state.tracker.snapshot().await {
        Ok(progress) => Json(serde_json::json!({"ok": true, "progress": progress})).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Run the daily boundary now.
pub async fn daily_tick(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("🌙 Manual daily tick requested");
    run_event(&state, Event::DailyTick).await
}

/// Submit any event directly, bypassing text decoding.
pub async fn submit_event(State(state): State<Arc<AppState>>, Json(event): Json<Event>) -> Response {
    run_event(&state, event).await
}

async fn run_event(state: &AppState, event: Event) -> Response {
    let result: Result<(Vec<Outbound>, _), DitchPouchError> = async {
        let outbound = state.tracker.handle(event).await?;
        let progress = state.tracker.snapshot().await?;
        Ok((outbound, progress))
    }
    .await;

    match result {
        Ok((outbound, progress)) => Json(serde_json::json!({
            "ok": true,
            "outbound": outbound,
            "progress": progress,
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    mode: String,
    #[serde(rename = "hub.verify_token", default)]
    verify_token: String,
    #[serde(rename = "hub.challenge", default)]
    challenge: String,
}

/// WhatsApp webhook verification (GET), sent by Meta when subscribing.
pub async fn whatsapp_webhook_verify(
    Query(params): Query<VerifyParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match verify_subscription(
        &params.mode,
        &params.verify_token,
        &params.challenge,
        &state.whatsapp.webhook_verify_token,
    ) {
        Some(challenge) => {
            tracing::info!("WhatsApp webhook verified");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            tracing::warn!("⚠️ WhatsApp webhook verification rejected (mode={})", params.mode);
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}

/// Compare phone numbers ignoring `+`, spaces and dashes.
fn same_number(a: &str, b: &str) -> bool {
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    let a = digits(a);
    !a.is_empty() && a == digits(b)
}

/// WhatsApp webhook handler (POST), receives incoming messages from Meta.
pub async fn whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.whatsapp.app_secret.is_empty() {
        let signature = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if let Err(e) = verify_signature(&state.whatsapp.app_secret, &body, signature) {
            tracing::warn!("⚠️ [whatsapp] Rejected webhook: {e}");
            return error_response(StatusCode::UNAUTHORIZED, e);
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}")),
    };

    // Meta expects a quick 200; the inbox worker applies messages in order
    let mut accepted = 0;
    for msg in parse_webhook(&payload) {
        if !same_number(&msg.from, &state.whatsapp.recipient) {
            tracing::warn!("[whatsapp] Ignoring message from unknown sender {}", msg.from);
            continue;
        }
        tracing::info!("[whatsapp] Message {} from {}: {:?}", msg.message_id, msg.from, msg.content);
        let event = ditchpouch_channels::decode(&msg.content);
        if state.inbox.push(&msg.message_id, event) {
            accepted += 1;
        }
    }

    Json(serde_json::json!({"status": "ok", "accepted": accepted})).into_response()
}
