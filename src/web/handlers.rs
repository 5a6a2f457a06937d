//! HTTP API handlers

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ControlError;
use crate::protocol::{Ack, Request};
use crate::web::server::AppState;

/// Decode a director request and run it through the control loop
pub async fn control(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Ack>) {
    let request = match Request::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected control request: {}", e);
            return (StatusCode::BAD_REQUEST, Json(Ack::error(e.to_string())));
        }
    };

    match state.control.submit(request).await {
        Ok(ack) => (StatusCode::OK, Json(ack)),
        Err(e @ ControlError::LoopClosed) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(Ack::error(e.to_string())))
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(Ack::error(e.to_string()))),
    }
}
