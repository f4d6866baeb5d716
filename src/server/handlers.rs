//! Request handlers.

// Rust guideline compliant 2026-02

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::notifications::{NotificationPayload, PushSubscription};

const INDEX_HTML: &str = include_str!("index.html");

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// `GET /`: the demo page.
pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /vapidPublicKey`: the key browsers pass as `applicationServerKey`.
pub(crate) async fn vapid_public_key(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        state.keys.public_key_base64url().to_string(),
    )
}

/// `POST /register`: remember the posted subscription, replacing any other.
///
/// The body only has to be JSON; its shape is checked when a push is sent.
pub(crate) async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let value: Value = serde_json::from_slice(&body).map_err(ApiError::InvalidBody)?;
    let subscription = PushSubscription::new(value);

    log::info!(
        "Registered push subscription for {}",
        subscription.endpoint().unwrap_or("<no endpoint>")
    );
    state.subscription.set(subscription);

    Ok(success())
}

/// `POST /notification`: push the demo notification to the registered browser.
pub(crate) async fn notification(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let subscription = state
        .subscription
        .get()
        .filter(PushSubscription::is_present)
        .ok_or(ApiError::NoSubscription)?;

    state
        .dispatcher
        .deliver(&subscription, &state.keys, &NotificationPayload::server_demo())
        .await
        .map_err(ApiError::DeliveryFailed)?;

    log::info!(
        "Sent server notification to {}",
        subscription.endpoint().unwrap_or("<no endpoint>")
    );
    Ok(success())
}
