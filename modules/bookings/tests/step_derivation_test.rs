mod common;

use bookings_rs::domain::predicates::{
    can_request_refund, has_used_service, is_ready_for_partner_payout, is_refund_eligible,
};
use bookings_rs::domain::step::{matching_rule, STEP_RULES};
use bookings_rs::domain::{derive_step, Step};
use bookings_rs::models::{
    BookingSnapshot, BookingStatus, PaymentStatus, PayoutStatus, RefundStatus,
};
use common::{snapshot, today, tomorrow, yesterday};

const PROOF: &str = "https://storage.example/receipts/7f3a.jpg";

fn proof() -> Option<String> {
    Some(PROOF.to_string())
}

#[test]
fn test_fresh_booking_awaits_deposit() {
    let b = snapshot();
    assert_eq!(derive_step(&b, today()), Some(Step::AwaitingDeposit));
}

#[test]
fn test_deposit_proof_awaits_confirmation() {
    let b = BookingSnapshot {
        deposit_proof_url: proof(),
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::ConfirmDeposit));
}

#[test]
fn test_deposit_paid_awaits_final_payment() {
    let b = BookingSnapshot {
        deposit_status: PaymentStatus::Paid,
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::AwaitingFinalPayment));
}

#[test]
fn test_payment_proof_awaits_confirmation() {
    let b = BookingSnapshot {
        deposit_status: PaymentStatus::Paid,
        payment_proof_url: proof(),
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::ConfirmFinalPayment));
}

#[test]
fn test_paid_before_service_date() {
    let b = BookingSnapshot {
        status: BookingStatus::Confirmed,
        deposit_status: PaymentStatus::Paid,
        payment_status: PaymentStatus::Paid,
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::AwaitingService));
}

#[test]
fn test_paid_and_service_used_ready_for_payout() {
    let b = BookingSnapshot {
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Paid,
        date_to: Some(yesterday()),
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::ReadyForPayout));
}

#[test]
fn test_cancelled_with_refund_request() {
    let b = BookingSnapshot {
        status: BookingStatus::Cancelled,
        refund_status: RefundStatus::Requested,
        deposit_status: PaymentStatus::Paid,
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::Refund));
}

#[test]
fn test_cancelled_without_money_needs_no_action() {
    let b = BookingSnapshot {
        status: BookingStatus::Cancelled,
        refund_status: RefundStatus::NotRequested,
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), None);
}

#[test]
fn test_cancelled_refund_request_without_evidence_needs_no_action() {
    let b = BookingSnapshot {
        status: BookingStatus::Cancelled,
        refund_status: RefundStatus::Requested,
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), None);
}

#[test]
fn test_refund_beats_payout() {
    // Contrived: fully paid, service used, cancelled with a refund request.
    // Cancellation already blocks payout, so also check the rule order itself.
    let b = BookingSnapshot {
        status: BookingStatus::Cancelled,
        refund_status: RefundStatus::Requested,
        payment_status: PaymentStatus::Paid,
        date_to: Some(yesterday()),
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::Refund));

    let refund_idx = STEP_RULES
        .iter()
        .position(|r| r.outcome == Some(Step::Refund))
        .unwrap();
    let payout_idx = STEP_RULES
        .iter()
        .position(|r| r.outcome == Some(Step::ReadyForPayout))
        .unwrap();
    assert!(refund_idx < payout_idx);
}

#[test]
fn test_refund_resolution_falls_back_to_no_action() {
    for refund_status in [
        RefundStatus::Approved,
        RefundStatus::Processing,
        RefundStatus::Completed,
        RefundStatus::Rejected,
    ] {
        let b = BookingSnapshot {
            status: BookingStatus::Cancelled,
            refund_status,
            deposit_status: PaymentStatus::Paid,
            payment_status: PaymentStatus::Paid,
            ..snapshot()
        };
        assert_eq!(derive_step(&b, today()), None, "refund_status={}", refund_status);
        assert_eq!(matching_rule(&b, today()).name, "cancelled_without_refund");
    }
}

#[test]
fn test_paid_without_proof_is_tolerated() {
    // Admin override: statuses set with no receipts uploaded
    let b = BookingSnapshot {
        deposit_status: PaymentStatus::Paid,
        payment_status: PaymentStatus::Paid,
        deposit_proof_url: None,
        payment_proof_url: None,
        date_to: Some(yesterday()),
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::ReadyForPayout));
}

#[test]
fn test_payment_paid_without_deposit_still_paid() {
    let b = BookingSnapshot {
        deposit_status: PaymentStatus::Unpaid,
        payment_status: PaymentStatus::Paid,
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::AwaitingService));
}

#[test]
fn test_refunded_deposit_falls_to_default() {
    let b = BookingSnapshot {
        deposit_status: PaymentStatus::Refunded,
        deposit_proof_url: proof(),
        ..snapshot()
    };
    assert_eq!(derive_step(&b, today()), Some(Step::AwaitingDeposit));
    assert_eq!(matching_rule(&b, today()).name, "awaiting_deposit");
}

#[test]
fn test_service_date_boundary() {
    let b = BookingSnapshot {
        payment_status: PaymentStatus::Paid,
        date_to: Some(today()),
        ..snapshot()
    };
    assert!(!has_used_service(&b, today()));
    assert_eq!(derive_step(&b, today()), Some(Step::AwaitingService));

    assert!(has_used_service(&b, tomorrow()));
    assert_eq!(derive_step(&b, tomorrow()), Some(Step::ReadyForPayout));
}

#[test]
fn test_missing_date_never_ready_for_payout() {
    let b = BookingSnapshot {
        payment_status: PaymentStatus::Paid,
        date_to: None,
        ..snapshot()
    };
    assert!(!is_ready_for_partner_payout(&b, today()));
    assert_eq!(derive_step(&b, today()), Some(Step::AwaitingService));
}

#[test]
fn test_step_advances_as_customer_pays() {
    let mut b = snapshot();
    let mut seen = vec![derive_step(&b, today())];

    b.deposit_proof_url = proof();
    seen.push(derive_step(&b, today()));
    b.deposit_status = PaymentStatus::Paid;
    seen.push(derive_step(&b, today()));
    b.payment_proof_url = proof();
    seen.push(derive_step(&b, today()));
    b.payment_status = PaymentStatus::Paid;
    seen.push(derive_step(&b, today()));
    b.date_to = Some(yesterday());
    seen.push(derive_step(&b, today()));

    let numbers: Vec<u8> = seen.into_iter().map(|s| s.unwrap().number()).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_derivation_is_total_over_field_domain() {
    let statuses = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    ];
    let payments = [
        PaymentStatus::Unpaid,
        PaymentStatus::Paid,
        PaymentStatus::Refunded,
    ];
    let payouts = [PayoutStatus::Pending, PayoutStatus::Paid, PayoutStatus::Failed];
    let refunds = [
        RefundStatus::NotRequested,
        RefundStatus::Requested,
        RefundStatus::Approved,
        RefundStatus::Processing,
        RefundStatus::Completed,
        RefundStatus::Rejected,
    ];
    let dates = [None, Some(yesterday()), Some(today()), Some(tomorrow())];

    let mut evaluated = 0;
    for status in statuses {
        for deposit_status in payments {
            for payment_status in payments {
                for payout_status in payouts {
                    for refund_status in refunds {
                        for date_to in dates {
                            for (deposit_proof, payment_proof) in
                                [(false, false), (true, false), (false, true), (true, true)]
                            {
                                let b = BookingSnapshot {
                                    status,
                                    date_to,
                                    deposit_status,
                                    payment_status,
                                    payout_status,
                                    refund_status,
                                    deposit_proof_url: deposit_proof.then(|| PROOF.to_string()),
                                    payment_proof_url: payment_proof.then(|| PROOF.to_string()),
                                    ..snapshot()
                                };

                                let step = derive_step(&b, today());
                                let rule = matching_rule(&b, today());
                                assert_eq!(step, rule.outcome);
                                assert!(
                                    (rule.applies)(&b, today()),
                                    "matched rule {} does not apply",
                                    rule.name
                                );

                                // Only cancelled bookings can drop out of the pipeline
                                if step.is_none() {
                                    assert_eq!(status, BookingStatus::Cancelled);
                                }
                                // Step 7 only for cancelled bookings with an open request
                                if step == Some(Step::Refund) {
                                    assert!(is_refund_eligible(&b));
                                }
                                assert_eq!(is_refund_eligible(&b), can_request_refund(&b));
                                evaluated += 1;
                            }
                        }
                    }
                }
            }
        }
    }
    assert_eq!(evaluated, 3 * 3 * 3 * 3 * 6 * 4 * 4);
}

#[test]
fn test_each_rule_reachable() {
    let cases = [
        (
            BookingSnapshot {
                status: BookingStatus::Cancelled,
                ..snapshot()
            },
            "cancelled_without_refund",
        ),
        (
            BookingSnapshot {
                status: BookingStatus::Cancelled,
                refund_status: RefundStatus::Requested,
                payment_proof_url: proof(),
                ..snapshot()
            },
            "refund_eligible",
        ),
        (
            BookingSnapshot {
                payment_status: PaymentStatus::Paid,
                date_to: Some(yesterday()),
                ..snapshot()
            },
            "ready_for_payout",
        ),
        (
            BookingSnapshot {
                payment_status: PaymentStatus::Paid,
                ..snapshot()
            },
            "payment_paid",
        ),
        (
            BookingSnapshot {
                deposit_status: PaymentStatus::Paid,
                payment_proof_url: proof(),
                ..snapshot()
            },
            "payment_proof_submitted",
        ),
        (
            BookingSnapshot {
                deposit_status: PaymentStatus::Paid,
                ..snapshot()
            },
            "awaiting_final_payment",
        ),
        (
            BookingSnapshot {
                deposit_proof_url: proof(),
                ..snapshot()
            },
            "deposit_proof_submitted",
        ),
        (snapshot(), "awaiting_deposit"),
    ];

    assert_eq!(cases.len(), STEP_RULES.len());
    for ((b, expected), rule) in cases.iter().zip(STEP_RULES.iter()) {
        assert_eq!(rule.name, *expected);
        assert_eq!(matching_rule(b, today()).name, *expected);
    }
}
