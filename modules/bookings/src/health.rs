use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::routes::AppState;

/// Health check endpoint handler
///
/// Reports the calendar day the step derivation is running against, so a
/// misconfigured server clock shows up next to the service status.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "bookings-rs",
        "version": env!("CARGO_PKG_VERSION"),
        "today": state.service.clock().today(),
    }))
}
