use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// FIELD ENUMS
// ============================================================================

/// Errors raised while reading persisted booking fields
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Unknown {field} value: '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

/// Declares a persisted status enum with its snake_case wire strings.
/// The first variant is the column default.
///
/// The strings are the exact values stored in the bookings table, so
/// `as_str` and `FromStr` must stay symmetric.
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $default:ident => $default_str:literal,
            $($variant:ident => $s:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            #[default]
            $default,
            $($variant),*
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::$default => $default_str,
                    $($name::$variant => $s),*
                }
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $default_str => Ok($name::$default),
                    $($s => Ok($name::$variant),)*
                    other => Err(ModelError::UnknownValue {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum! {
    /// Overall booking state, orthogonal to the payment lifecycle
    BookingStatus, "status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
}

status_enum! {
    /// Shared by `deposit_status` and `payment_status`
    PaymentStatus, "payment_status" {
        Unpaid => "unpaid",
        Paid => "paid",
        Refunded => "refunded",
    }
}

status_enum! {
    /// Partner settlement state
    PayoutStatus, "payout_status" {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
    }
}

status_enum! {
    RefundStatus, "refund_status" {
        NotRequested => "not_requested",
        Requested => "requested",
        Approved => "approved",
        Processing => "processing",
        Completed => "completed",
        Rejected => "rejected",
    }
}

/// Which of the two customer payments a confirmation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentField {
    Deposit,
    Final,
}

impl PaymentField {
    /// Column holding this payment's status
    pub fn column(self) -> &'static str {
        match self {
            PaymentField::Deposit => "deposit_status",
            PaymentField::Final => "payment_status",
        }
    }

    pub fn status_of(self, snapshot: &BookingSnapshot) -> PaymentStatus {
        match self {
            PaymentField::Deposit => snapshot.deposit_status,
            PaymentField::Final => snapshot.payment_status,
        }
    }
}

// ============================================================================
// BOOKING VIEWS
// ============================================================================

/// Read-only view of a booking used for step derivation.
///
/// Amounts are nullable in storage; a missing amount reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingSnapshot {
    pub status: BookingStatus,
    pub date_to: Option<NaiveDate>,
    pub total_price: Option<f64>,
    pub deposit_amount: Option<f64>,
    pub deposit_status: PaymentStatus,
    pub deposit_proof_url: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_proof_url: Option<String>,
    pub payout_status: PayoutStatus,
    pub refund_status: RefundStatus,
    pub refund_amount: Option<f64>,
    pub refund_proof_url: Option<String>,
}

impl BookingSnapshot {
    /// Balance due after the deposit.
    ///
    /// Not clamped: a negative value means the stored amounts are
    /// inconsistent and is left for the caller to report.
    pub fn remaining(&self) -> f64 {
        self.total_price.unwrap_or(0.0) - self.deposit_amount.unwrap_or(0.0)
    }
}

/// Full persisted booking row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: BookingSnapshot,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub payout_proof_url: Option<String>,
    pub refund_processed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Fresh booking as placed by a customer: nothing paid, nothing requested
    pub fn new(id: Uuid, snapshot: BookingSnapshot, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            snapshot,
            deposit_paid_at: None,
            payout_proof_url: None,
            refund_processed_at: None,
            notes: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn snapshot(&self) -> &BookingSnapshot {
        &self.snapshot
    }
}

/// Field changes proposed by a transition command.
///
/// Only `Some` fields are written; everything else is left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDelta {
    pub deposit_status: Option<PaymentStatus>,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub payment_status: Option<PaymentStatus>,
    pub payout_status: Option<PayoutStatus>,
    pub payout_proof_url: Option<String>,
    pub refund_status: Option<RefundStatus>,
    pub refund_amount: Option<f64>,
    pub refund_proof_url: Option<String>,
    pub refund_processed_at: Option<DateTime<Utc>>,
}

impl BookingDelta {
    pub fn is_empty(&self) -> bool {
        *self == BookingDelta::default()
    }

    /// Apply the delta to an in-memory record
    pub fn apply_to(&self, record: &mut BookingRecord, updated_at: DateTime<Utc>) {
        let snap = &mut record.snapshot;
        if let Some(s) = self.deposit_status {
            snap.deposit_status = s;
        }
        if let Some(s) = self.payment_status {
            snap.payment_status = s;
        }
        if let Some(s) = self.payout_status {
            snap.payout_status = s;
        }
        if let Some(s) = self.refund_status {
            snap.refund_status = s;
        }
        if let Some(amount) = self.refund_amount {
            snap.refund_amount = Some(amount);
        }
        if let Some(ref url) = self.refund_proof_url {
            snap.refund_proof_url = Some(url.clone());
        }
        if let Some(at) = self.deposit_paid_at {
            record.deposit_paid_at = Some(at);
        }
        if let Some(ref url) = self.payout_proof_url {
            record.payout_proof_url = Some(url.clone());
        }
        if let Some(at) = self.refund_processed_at {
            record.refund_processed_at = Some(at);
        }
        record.updated_at = updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_parse() {
        assert_eq!("cancelled".parse::<BookingStatus>(), Ok(BookingStatus::Cancelled));
        assert_eq!("not_requested".parse::<RefundStatus>(), Ok(RefundStatus::NotRequested));
        assert_eq!(PayoutStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_unknown_value_is_integrity_error() {
        let err = "settled".parse::<PaymentStatus>().unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownValue {
                field: "payment_status",
                value: "settled".to_string()
            }
        );
        assert!(err.to_string().contains("settled"));
    }

    #[test]
    fn test_remaining_allows_negative() {
        let snap = BookingSnapshot {
            total_price: Some(100.0),
            deposit_amount: Some(150.0),
            ..Default::default()
        };
        assert_eq!(snap.remaining(), -50.0);
    }

    #[test]
    fn test_payment_field_reads_its_column() {
        let snap = BookingSnapshot {
            deposit_status: PaymentStatus::Paid,
            ..Default::default()
        };
        assert_eq!(PaymentField::Deposit.status_of(&snap), PaymentStatus::Paid);
        assert_eq!(PaymentField::Final.status_of(&snap), PaymentStatus::Unpaid);
        assert_eq!(PaymentField::Final.column(), "payment_status");
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&RefundStatus::NotRequested).unwrap();
        assert_eq!(json, "\"not_requested\"");
    }
}
