//! Refund amount computed on the caller side
//!
//! The amount passed to `set_refund_status` is whatever the admin console
//! submits. This quote is what the console prefills: the deposit if its
//! receipt was confirmed, plus the remaining balance if the final payment
//! was confirmed. The transition command never recomputes it.

use serde::{Deserialize, Serialize};

use crate::models::{BookingSnapshot, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefundQuote {
    pub deposit_paid_amount: f64,
    pub remaining_paid_amount: f64,
    pub total: f64,
}

pub fn refund_quote(b: &BookingSnapshot) -> RefundQuote {
    let deposit_paid_amount = if b.deposit_status == PaymentStatus::Paid {
        b.deposit_amount.unwrap_or(0.0)
    } else {
        0.0
    };

    let remaining_paid_amount = if b.payment_status == PaymentStatus::Paid {
        let remaining = b.remaining();
        if remaining < 0.0 {
            tracing::warn!(
                total_price = ?b.total_price,
                deposit_amount = ?b.deposit_amount,
                "Deposit exceeds total price, treating remaining balance as zero"
            );
            0.0
        } else {
            remaining
        }
    } else {
        0.0
    };

    RefundQuote {
        deposit_paid_amount,
        remaining_paid_amount,
        total: deposit_paid_amount + remaining_paid_amount,
    }
}
