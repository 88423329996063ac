//! Step derivation for the booking payment lifecycle
//!
//! Collapses the scattered status fields of a booking into the single
//! step the admin console acts on. The result is a projection: it is
//! recomputed from the snapshot on every read and never stored.
//!
//! Rules are evaluated top-down and the first match wins:
//!
//! | # | Condition                                              | Result |
//! |---|--------------------------------------------------------|--------|
//! | 1 | cancelled and no refund to act on                      | none   |
//! | 2 | refund eligible                                        | 7      |
//! | 3 | ready for partner payout                               | 6      |
//! | 4 | payment paid                                           | 5      |
//! | 5 | deposit paid, payment unpaid, payment proof submitted  | 4      |
//! | 6 | deposit paid, payment unpaid, no payment proof         | 3      |
//! | 7 | deposit unpaid, deposit proof submitted                | 2      |
//! | 8 | anything else                                          | 1      |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::predicates::{can_request_refund, is_ready_for_partner_payout, is_refund_eligible};
use crate::models::{BookingSnapshot, BookingStatus, PaymentStatus};

/// Where a booking sits in the deposit → payment → service → payout/refund pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    AwaitingDeposit = 1,
    ConfirmDeposit = 2,
    AwaitingFinalPayment = 3,
    ConfirmFinalPayment = 4,
    AwaitingService = 5,
    ReadyForPayout = 6,
    Refund = 7,
}

/// Transition commands the console can offer for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    ConfirmDeposit,
    ConfirmPayment,
    SetPayoutStatus,
    SetRefundStatus,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::AwaitingDeposit,
        Step::ConfirmDeposit,
        Step::AwaitingFinalPayment,
        Step::ConfirmFinalPayment,
        Step::AwaitingService,
        Step::ReadyForPayout,
        Step::Refund,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::AwaitingDeposit => "Awaiting customer deposit",
            Step::ConfirmDeposit => "Deposit proof submitted, awaiting confirmation",
            Step::AwaitingFinalPayment => "Awaiting customer final payment",
            Step::ConfirmFinalPayment => "Payment proof submitted, awaiting confirmation",
            Step::AwaitingService => "Fully paid, awaiting service date",
            Step::ReadyForPayout => "Service used, ready for partner payout",
            Step::Refund => "Refund requested",
        }
    }

    /// Steps 1 and 3 wait on the customer and offer nothing.
    ///
    /// Payout is offered from step 5 as well: paying out before the
    /// service date is an allowed (logged) override.
    pub fn admin_actions(self) -> &'static [AdminAction] {
        match self {
            Step::AwaitingDeposit | Step::AwaitingFinalPayment => &[],
            Step::ConfirmDeposit => &[AdminAction::ConfirmDeposit],
            Step::ConfirmFinalPayment => &[AdminAction::ConfirmPayment],
            Step::AwaitingService | Step::ReadyForPayout => &[AdminAction::SetPayoutStatus],
            Step::Refund => &[AdminAction::SetRefundStatus],
        }
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.number()
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Step::ALL
            .into_iter()
            .find(|s| s.number() == value)
            .ok_or_else(|| format!("step must be between 1 and 7, got {}", value))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One rung of the priority ladder
pub struct StepRule {
    pub name: &'static str,
    pub applies: fn(&BookingSnapshot, NaiveDate) -> bool,
    /// `None` means no admin action is needed
    pub outcome: Option<Step>,
}

impl fmt::Debug for StepRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRule")
            .field("name", &self.name)
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// Priority-ordered ladder. Order matters; the last rule always applies.
pub static STEP_RULES: [StepRule; 8] = [
    StepRule {
        name: "cancelled_without_refund",
        applies: |b, _| b.status == BookingStatus::Cancelled && !can_request_refund(b),
        outcome: None,
    },
    StepRule {
        name: "refund_eligible",
        applies: |b, _| is_refund_eligible(b),
        outcome: Some(Step::Refund),
    },
    StepRule {
        name: "ready_for_payout",
        applies: is_ready_for_partner_payout,
        outcome: Some(Step::ReadyForPayout),
    },
    StepRule {
        name: "payment_paid",
        applies: |b, _| b.payment_status == PaymentStatus::Paid,
        outcome: Some(Step::AwaitingService),
    },
    StepRule {
        name: "payment_proof_submitted",
        applies: |b, _| {
            b.deposit_status == PaymentStatus::Paid
                && b.payment_status == PaymentStatus::Unpaid
                && b.payment_proof_url.is_some()
        },
        outcome: Some(Step::ConfirmFinalPayment),
    },
    StepRule {
        name: "awaiting_final_payment",
        applies: |b, _| {
            b.deposit_status == PaymentStatus::Paid
                && b.payment_status == PaymentStatus::Unpaid
                && b.payment_proof_url.is_none()
        },
        outcome: Some(Step::AwaitingFinalPayment),
    },
    StepRule {
        name: "deposit_proof_submitted",
        applies: |b, _| b.deposit_status == PaymentStatus::Unpaid && b.deposit_proof_url.is_some(),
        outcome: Some(Step::ConfirmDeposit),
    },
    StepRule {
        name: "awaiting_deposit",
        applies: |_, _| true,
        outcome: Some(Step::AwaitingDeposit),
    },
];

/// First rule in [`STEP_RULES`] that applies to the booking
pub fn matching_rule(b: &BookingSnapshot, today: NaiveDate) -> &'static StepRule {
    let last = &STEP_RULES[STEP_RULES.len() - 1];
    STEP_RULES
        .iter()
        .find(|rule| (rule.applies)(b, today))
        .unwrap_or(last)
}

/// Derive the current step of a booking. Total over all field combinations.
pub fn derive_step(b: &BookingSnapshot, today: NaiveDate) -> Option<Step> {
    matching_rule(b, today).outcome
}
