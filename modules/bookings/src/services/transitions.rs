//! Transition commands for the booking payment lifecycle
//!
//! Each command:
//! 1. Loads the current booking from the repository
//! 2. Checks its precondition against the loaded snapshot
//! 3. Computes a field delta
//! 4. Persists the delta and re-derives the step from the stored result
//!
//! Commands re-check their own preconditions rather than trusting the
//! caller to have looked at the step first. Payment confirmations also
//! make the store re-check them as part of the write, so of two concurrent
//! confirmations only one succeeds. Other commands interleave per field
//! (see `repos`).

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::predicates::is_ready_for_partner_payout;
use crate::domain::{derive_step, Step};
use crate::metrics::Metrics;
use crate::models::{
    BookingDelta, BookingRecord, BookingStatus, PaymentField, PaymentStatus, PayoutStatus,
    RefundStatus,
};
use crate::repos::{BookingRepository, RepoError};

/// Errors that can occur while running a transition command
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Booking {id} already has {field} = {value}")]
    AlreadyInState {
        id: Uuid,
        field: &'static str,
        value: String,
    },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Repository(RepoError),
}

impl From<RepoError> for TransitionError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => TransitionError::NotFound(id),
            other => TransitionError::Repository(other),
        }
    }
}

impl TransitionError {
    /// Rejected by a guard, as opposed to failing in the store
    pub fn is_rejection(&self) -> bool {
        !matches!(self, TransitionError::Repository(_))
    }
}

/// Result type for transition commands
pub type TransitionResult<T> = Result<T, TransitionError>;

/// Updated booking as persisted, with its freshly derived step
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub booking: BookingRecord,
    pub step: Option<Step>,
    /// Set when the command went through although the lifecycle did not call for it
    pub override_applied: bool,
}

#[derive(Clone)]
pub struct TransitionService {
    repo: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl TransitionService {
    pub fn new(repo: Arc<dyn BookingRepository>, clock: Arc<dyn Clock>, metrics: Metrics) -> Self {
        Self {
            repo,
            clock,
            metrics,
        }
    }

    pub fn repo(&self) -> &Arc<dyn BookingRepository> {
        &self.repo
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn load(&self, id: Uuid) -> TransitionResult<BookingRecord> {
        self.repo
            .fetch(id)
            .await?
            .ok_or(TransitionError::NotFound(id))
    }

    fn outcome(&self, booking: BookingRecord, override_applied: bool) -> TransitionOutcome {
        let step = derive_step(booking.snapshot(), self.clock.today());
        TransitionOutcome {
            booking,
            step,
            override_applied,
        }
    }

    fn observe<T>(&self, command: &str, id: Uuid, result: &TransitionResult<T>) {
        match result {
            Ok(_) => self.metrics.record(command, "success"),
            Err(e) if e.is_rejection() => {
                tracing::warn!(booking_id = %id, command, error = %e, "Transition rejected");
                self.metrics.record(command, "rejected");
            }
            Err(e) => {
                tracing::error!(booking_id = %id, command, error = %e, "Transition failed");
                self.metrics.record(command, "error");
            }
        }
    }

    /// Mark the deposit as received and stamp `deposit_paid_at`.
    ///
    /// Only an `unpaid` deposit can be confirmed. Confirming twice is
    /// rejected with `AlreadyInState` instead of re-stamping the time.
    pub async fn confirm_deposit(&self, id: Uuid) -> TransitionResult<TransitionOutcome> {
        let result = self.confirm_deposit_inner(id).await;
        self.observe("confirm_deposit", id, &result);
        result
    }

    async fn confirm_deposit_inner(&self, id: Uuid) -> TransitionResult<TransitionOutcome> {
        let delta = BookingDelta {
            deposit_status: Some(PaymentStatus::Paid),
            deposit_paid_at: Some(self.clock.now()),
            ..Default::default()
        };
        let (booking, updated) = self.confirm_unpaid(id, PaymentField::Deposit, &delta).await?;

        tracing::info!(
            booking_id = %id,
            had_proof = booking.snapshot.deposit_proof_url.is_some(),
            "Deposit confirmed"
        );

        Ok(self.outcome(updated, false))
    }

    /// Mark the final payment as received
    pub async fn confirm_payment(&self, id: Uuid) -> TransitionResult<TransitionOutcome> {
        let result = self.confirm_payment_inner(id).await;
        self.observe("confirm_payment", id, &result);
        result
    }

    async fn confirm_payment_inner(&self, id: Uuid) -> TransitionResult<TransitionOutcome> {
        let delta = BookingDelta {
            payment_status: Some(PaymentStatus::Paid),
            ..Default::default()
        };
        let (booking, updated) = self.confirm_unpaid(id, PaymentField::Final, &delta).await?;

        tracing::info!(
            booking_id = %id,
            had_proof = booking.snapshot.payment_proof_url.is_some(),
            "Final payment confirmed"
        );

        Ok(self.outcome(updated, false))
    }

    /// Check `field` is unpaid, then write `delta` conditionally on it.
    ///
    /// The early check gives the precise error for the common case. The
    /// conditional write catches a confirmation that landed in between.
    /// Returns the booking as loaded and as updated.
    async fn confirm_unpaid(
        &self,
        id: Uuid,
        field: PaymentField,
        delta: &BookingDelta,
    ) -> TransitionResult<(BookingRecord, BookingRecord)> {
        let booking = self.load(id).await?;
        require_unpaid(id, field.column(), field.status_of(booking.snapshot()))?;

        match self.repo.apply_delta_if_unpaid(id, field, delta).await? {
            Some(updated) => Ok((booking, updated)),
            None => {
                let current = self.load(id).await?;
                let status = field.status_of(current.snapshot());
                tracing::info!(
                    booking_id = %id,
                    field = field.column(),
                    status = %status,
                    "Concurrent confirmation won"
                );
                require_unpaid(id, field.column(), status)?;
                // Read lags the write that beat us; the guard only fails once paid
                Err(TransitionError::AlreadyInState {
                    id,
                    field: field.column(),
                    value: PaymentStatus::Paid.to_string(),
                })
            }
        }
    }

    /// Record the partner settlement state, optionally with a transfer receipt.
    ///
    /// Marking a payout `paid` before the booking is ready for payout is
    /// allowed as an admin override; it is logged and counted.
    pub async fn set_payout_status(
        &self,
        id: Uuid,
        status: PayoutStatus,
        proof_url: Option<String>,
    ) -> TransitionResult<TransitionOutcome> {
        let result = self.set_payout_status_inner(id, status, proof_url).await;
        self.observe("set_payout_status", id, &result);
        result
    }

    async fn set_payout_status_inner(
        &self,
        id: Uuid,
        status: PayoutStatus,
        proof_url: Option<String>,
    ) -> TransitionResult<TransitionOutcome> {
        let booking = self.load(id).await?;

        let is_override = status == PayoutStatus::Paid
            && !is_ready_for_partner_payout(booking.snapshot(), self.clock.today());

        let delta = BookingDelta {
            payout_status: Some(status),
            payout_proof_url: non_blank(proof_url),
            ..Default::default()
        };
        let updated = self.repo.apply_delta(id, &delta).await?;

        if is_override {
            self.metrics.payout_overrides_total.inc();
            tracing::warn!(
                booking_id = %id,
                payout_override = true,
                booking_status = %booking.snapshot.status,
                payment_status = %booking.snapshot.payment_status,
                date_to = ?booking.snapshot.date_to,
                "Payout marked paid before booking was ready for payout"
            );
        }

        tracing::info!(
            booking_id = %id,
            payout_status = %status,
            "Payout status updated"
        );

        Ok(self.outcome(updated, is_override))
    }

    /// Move a cancelled booking through the refund pipeline.
    ///
    /// `refund_amount` is taken as given. The console computes it as the
    /// confirmed deposit plus the confirmed remaining balance (see
    /// `domain::refund_quote`); it is not re-derived here.
    ///
    /// A non-blank `note` is appended to the booking's notes with a UTC
    /// timestamp, in the same unit of work as the field update.
    pub async fn set_refund_status(
        &self,
        id: Uuid,
        status: RefundStatus,
        refund_amount: f64,
        proof_url: Option<String>,
        note: Option<&str>,
    ) -> TransitionResult<TransitionOutcome> {
        let result = self
            .set_refund_status_inner(id, status, refund_amount, proof_url, note)
            .await;
        self.observe("set_refund_status", id, &result);
        result
    }

    async fn set_refund_status_inner(
        &self,
        id: Uuid,
        status: RefundStatus,
        refund_amount: f64,
        proof_url: Option<String>,
        note: Option<&str>,
    ) -> TransitionResult<TransitionOutcome> {
        if !refund_amount.is_finite() || refund_amount < 0.0 {
            return Err(TransitionError::InvalidArgument(format!(
                "refund_amount must be a non-negative number, got {}",
                refund_amount
            )));
        }

        let booking = self.load(id).await?;
        if booking.snapshot.status != BookingStatus::Cancelled {
            return Err(TransitionError::PreconditionFailed(format!(
                "refunds apply to cancelled bookings only, booking {} is {}",
                id, booking.snapshot.status
            )));
        }

        let now = self.clock.now();
        let delta = BookingDelta {
            refund_status: Some(status),
            refund_amount: Some(refund_amount),
            refund_proof_url: non_blank(proof_url),
            refund_processed_at: Some(now),
            ..Default::default()
        };

        let updated = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(note) => {
                let line = format!("[{}] {}", now.format("%Y-%m-%d %H:%M UTC"), note);
                self.repo.apply_delta_with_note(id, &delta, &line).await?
            }
            None => self.repo.apply_delta(id, &delta).await?,
        };

        tracing::info!(
            booking_id = %id,
            from = %booking.snapshot.refund_status,
            to = %status,
            refund_amount,
            "Refund status updated"
        );

        Ok(self.outcome(updated, false))
    }
}

fn require_unpaid(id: Uuid, field: &'static str, current: PaymentStatus) -> TransitionResult<()> {
    match current {
        PaymentStatus::Unpaid => Ok(()),
        PaymentStatus::Paid => Err(TransitionError::AlreadyInState {
            id,
            field,
            value: current.to_string(),
        }),
        PaymentStatus::Refunded => Err(TransitionError::PreconditionFailed(format!(
            "{} of booking {} was refunded and cannot be confirmed",
            field, id
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
