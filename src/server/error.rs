//! Handler errors and their JSON representation.

// Rust guideline compliant 2026-02

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::notifications::DeliveryError;

/// Everything a handler can fail with.
///
/// Rendered as `{"error": "..."}`. The underlying cause of a delivery failure
/// is logged and never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `/notification` was called before any `/register`.
    #[error("No subscription found")]
    NoSubscription,
    /// `/register` body was not JSON.
    #[error("Invalid subscription")]
    InvalidBody(#[source] serde_json::Error),
    /// The push dispatcher failed.
    #[error("Failed to send notification")]
    DeliveryFailed(#[source] DeliveryError),
}

impl ApiError {
    /// Status code sent to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoSubscription | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::DeliveryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::DeliveryFailed(cause) => {
                log::error!("Error sending notification: {cause}");
            }
            Self::InvalidBody(cause) => {
                log::warn!("Rejected registration body: {cause}");
            }
            Self::NoSubscription => {
                log::info!("Notification requested with no registered subscription");
            }
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
