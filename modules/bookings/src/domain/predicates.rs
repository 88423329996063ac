//! Eligibility predicates over a booking snapshot
//!
//! Every predicate is total and side-effect free. The current date is an
//! explicit argument so callers (and tests) control the clock.

use chrono::NaiveDate;

use crate::models::{BookingSnapshot, BookingStatus, PaymentStatus, RefundStatus};

/// True once the last day of service has passed.
///
/// Date-only comparison: on the `date_to` day itself the service is still
/// in progress. A booking without `date_to` has never been used.
pub fn has_used_service(b: &BookingSnapshot, today: NaiveDate) -> bool {
    match b.date_to {
        Some(date_to) => today > date_to,
        None => false,
    }
}

/// Any sign that money has moved: a submitted proof or a confirmed status
pub fn has_payment_evidence(b: &BookingSnapshot) -> bool {
    b.deposit_proof_url.is_some()
        || b.payment_proof_url.is_some()
        || b.deposit_status == PaymentStatus::Paid
        || b.payment_status == PaymentStatus::Paid
}

/// Fully paid, service consumed, and not cancelled
pub fn is_ready_for_partner_payout(b: &BookingSnapshot, today: NaiveDate) -> bool {
    b.payment_status == PaymentStatus::Paid
        && has_used_service(b, today)
        && b.status != BookingStatus::Cancelled
}

/// Cancelled booking with an open refund request and money at stake
pub fn is_refund_eligible(b: &BookingSnapshot) -> bool {
    refund_requested_with_evidence(b)
}

/// Whether a cancelled booking still has a refund to act on.
///
/// NOTE: intentionally the same condition as [`is_refund_eligible`],
/// including `refund_status == requested`. A refund that has not been
/// requested yet therefore does not count here. Changing this needs
/// product sign-off; adjust [`refund_requested_with_evidence`] only.
pub fn can_request_refund(b: &BookingSnapshot) -> bool {
    refund_requested_with_evidence(b)
}

/// Shared condition behind both refund predicates
fn refund_requested_with_evidence(b: &BookingSnapshot) -> bool {
    b.status == BookingStatus::Cancelled
        && b.refund_status == RefundStatus::Requested
        && has_payment_evidence(b)
}
