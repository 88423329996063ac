//! HTTP surface of the bookings module

pub mod bookings;
pub mod metrics;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::health::health;
use crate::repos::RepoError;
use crate::services::{TransitionError, TransitionService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: TransitionService,
}

/// Error response wrapper
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Bookings error HTTP response
#[derive(Debug)]
pub struct BookingsHttpError {
    pub status: StatusCode,
    pub message: String,
}

impl BookingsHttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for BookingsHttpError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<RepoError> for BookingsHttpError {
    fn from(error: RepoError) -> Self {
        TransitionError::from(error).into()
    }
}

/// Map service errors to HTTP status codes
impl From<TransitionError> for BookingsHttpError {
    fn from(error: TransitionError) -> Self {
        let status = match &error {
            TransitionError::NotFound(_) => StatusCode::NOT_FOUND,
            TransitionError::AlreadyInState { .. } => StatusCode::CONFLICT,
            TransitionError::PreconditionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TransitionError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            TransitionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match error {
            TransitionError::Repository(RepoError::Database(_)) => {
                "Database error".to_string() // Don't leak internal details
            }
            other => other.to_string(),
        };

        Self { status, message }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics::metrics))
        .route("/api/bookings", get(bookings::list_bookings))
        .route("/api/bookings/steps/summary", get(bookings::step_summary))
        .route("/api/bookings/{id}", get(bookings::get_booking))
        .route("/api/bookings/{id}/refund-quote", get(bookings::get_refund_quote))
        .route("/api/bookings/{id}/confirm-deposit", post(bookings::confirm_deposit))
        .route("/api/bookings/{id}/confirm-payment", post(bookings::confirm_payment))
        .route("/api/bookings/{id}/payout", post(bookings::set_payout_status))
        .route("/api/bookings/{id}/refund", post(bookings::set_refund_status))
        .with_state(Arc::new(state))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
