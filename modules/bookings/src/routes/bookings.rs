//! Booking lifecycle API routes
//!
//! Read endpoints label every booking with its derived step. Write
//! endpoints run one transition command each and answer with the
//! updated booking and its re-derived step.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{AppState, BookingsHttpError};
use crate::domain::{derive_step, refund_quote, AdminAction, RefundQuote, Step};
use crate::models::{BookingRecord, PayoutStatus, RefundStatus};
use crate::services::{TransitionError, TransitionOutcome};

/// Booking with its derived step and the actions offered at that step
#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: BookingRecord,
    pub step: Option<Step>,
    pub step_label: Option<&'static str>,
    pub actions: &'static [AdminAction],
}

impl BookingView {
    fn new(booking: BookingRecord, step: Option<Step>) -> Self {
        Self {
            booking,
            step,
            step_label: step.map(Step::label),
            actions: step.map(Step::admin_actions).unwrap_or(&[]),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    /// `1`..`7`, or `none` for bookings that need no action
    pub step: Option<String>,
}

/// Parse the `step` filter: outer `None` means no filter
fn parse_step_filter(raw: Option<&str>) -> Result<Option<Option<Step>>, BookingsHttpError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("none") => Ok(Some(None)),
        Some(s) => s
            .parse::<u8>()
            .ok()
            .and_then(|n| Step::try_from(n).ok())
            .map(|step| Some(Some(step)))
            .ok_or_else(|| {
                BookingsHttpError::bad_request(format!(
                    "step must be 1-7 or 'none', got '{}'",
                    s
                ))
            }),
    }
}

/// Handler for GET /api/bookings?step={step}
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<BookingView>>, BookingsHttpError> {
    let filter = parse_step_filter(query.step.as_deref())?;
    let today = state.service.clock().today();

    let views = state
        .service
        .repo()
        .list()
        .await?
        .into_iter()
        .map(|booking| {
            let step = derive_step(booking.snapshot(), today);
            (booking, step)
        })
        .filter(|(_, step)| filter.map_or(true, |wanted| wanted == *step))
        .map(|(booking, step)| BookingView::new(booking, step))
        .collect();

    Ok(Json(views))
}

#[derive(Debug, Serialize)]
pub struct StepCount {
    pub step: Option<Step>,
    pub label: &'static str,
    pub count: usize,
}

/// Handler for GET /api/bookings/steps/summary
///
/// One entry per step (1-7, then "no action needed"), zero counts included.
pub async fn step_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StepCount>>, BookingsHttpError> {
    let today = state.service.clock().today();
    let bookings = state.service.repo().list().await?;

    let mut counts = [0usize; 8];
    for booking in &bookings {
        let slot = derive_step(booking.snapshot(), today).map_or(0, |s| s.number() as usize);
        counts[slot] += 1;
    }

    let mut summary: Vec<StepCount> = Step::ALL
        .into_iter()
        .map(|step| StepCount {
            step: Some(step),
            label: step.label(),
            count: counts[step.number() as usize],
        })
        .collect();
    summary.push(StepCount {
        step: None,
        label: "No action needed",
        count: counts[0],
    });

    Ok(Json(summary))
}

/// Handler for GET /api/bookings/{id}
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, BookingsHttpError> {
    let booking = state
        .service
        .repo()
        .fetch(id)
        .await?
        .ok_or(TransitionError::NotFound(id))?;

    let step = derive_step(booking.snapshot(), state.service.clock().today());
    Ok(Json(BookingView::new(booking, step)))
}

/// Handler for GET /api/bookings/{id}/refund-quote
///
/// Amount the console prefills for the refund form.
pub async fn get_refund_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundQuote>, BookingsHttpError> {
    let booking = state
        .service
        .repo()
        .fetch(id)
        .await?
        .ok_or(TransitionError::NotFound(id))?;

    Ok(Json(refund_quote(booking.snapshot())))
}

/// Handler for POST /api/bookings/{id}/confirm-deposit
pub async fn confirm_deposit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransitionOutcome>, BookingsHttpError> {
    Ok(Json(state.service.confirm_deposit(id).await?))
}

/// Handler for POST /api/bookings/{id}/confirm-payment
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransitionOutcome>, BookingsHttpError> {
    Ok(Json(state.service.confirm_payment(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SetPayoutStatusRequest {
    pub status: PayoutStatus,
    pub proof_url: Option<String>,
}

/// Handler for POST /api/bookings/{id}/payout
pub async fn set_payout_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetPayoutStatusRequest>,
) -> Result<Json<TransitionOutcome>, BookingsHttpError> {
    let outcome = state
        .service
        .set_payout_status(id, request.status, request.proof_url)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct SetRefundStatusRequest {
    pub status: RefundStatus,
    pub refund_amount: f64,
    pub proof_url: Option<String>,
    pub note: Option<String>,
}

/// Handler for POST /api/bookings/{id}/refund
pub async fn set_refund_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetRefundStatusRequest>,
) -> Result<Json<TransitionOutcome>, BookingsHttpError> {
    let outcome = state
        .service
        .set_refund_status(
            id,
            request.status,
            request.refund_amount,
            request.proof_url,
            request.note.as_deref(),
        )
        .await?;
    Ok(Json(outcome))
}
