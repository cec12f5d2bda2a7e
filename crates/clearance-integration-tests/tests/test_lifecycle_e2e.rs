//! # End-to-End Lifecycle Scenarios
//!
//! Drives the engine through whole shipment journeys with the local
//! ports: booking to delivery under DDP and DAP, the return branch, an
//! export documents hold, and a shipment the payment window runs out on.

mod common;

use clearance_core::{Amount, DocumentName, DocumentParty, DutyMode, Role};
use clearance_fees::{ChargeItem, ChargeLine, DutyAssessment, FeeAssessment};
use clearance_state::{
    ClearanceError, DocumentRequest, PaymentKind, ShipmentStatus, TransitionEvidence,
};
use common::*;

// ---------------------------------------------------------------------------
// Booking to delivery
// ---------------------------------------------------------------------------

#[test]
fn ddp_booking_to_delivery() {
    let h = harness();
    let id = h.book(DutyMode::Ddp);
    let mut expected_events = 1;

    let step = |session, to| {
        let s = h.go(&session, id, to);
        assert_eq!(s.status, to);
        s
    };

    step(agency(), ShipmentStatus::HsApproved);
    expected_events += 1;
    h.upload_initial(id);
    step(sender(), ShipmentStatus::DocumentUploaded);
    step(agency(), ShipmentStatus::DocumentApproved);
    expected_events += 2;

    // Shipping paid on day 3: inside the grace period.
    h.clock.advance_days(3);
    match h.engine.quote_shipping(&sender(), id).unwrap() {
        FeeAssessment::Payable {
            days_elapsed,
            base,
            fine,
            total,
        } => {
            assert_eq!(days_elapsed, 3);
            assert_eq!(base, Amount::from_minor(125_000));
            assert_eq!(fine, Amount::ZERO);
            assert_eq!(total, base);
        }
        other => panic!("expected payable, got {other:?}"),
    }
    let paid = h.pay(&sender(), id, PaymentKind::Shipping);
    assert_eq!(paid.status, ShipmentStatus::PaymentSuccessful);
    expected_events += 1;
    let record = paid.payments.record_for(PaymentKind::Shipping).unwrap();
    assert_eq!(record.total, Amount::from_minor(125_000));

    step(agency(), ShipmentStatus::InTransit);
    step(agency(), ShipmentStatus::ArrivedAtCustoms);
    step(agency(), ShipmentStatus::ImportClearance);
    step(agency(), ShipmentStatus::ImportApproved);
    expected_events += 4;

    // Duty paid on day 7 of its window: two late days at 1%.
    h.clock.advance_days(7);
    let quote = match h.engine.quote_duty(&sender(), id).unwrap() {
        DutyAssessment::Payable(q) => q,
        other => panic!("expected payable duty, got {other:?}"),
    };
    assert_eq!(quote.days_elapsed, 7);
    assert_eq!(quote.duty, Amount::from_minor(100_000));
    assert_eq!(quote.gst, Amount::from_minor(180_000));
    assert_eq!(quote.fine, Amount::from_minor(5_600));
    assert!(quote.fine > Amount::ZERO);

    let checkout = h
        .engine
        .create_payment_order(&sender(), id, PaymentKind::Duty)
        .unwrap();
    assert_eq!(checkout.order.total, quote.total_payable);
    assert_eq!(checkout.gateway_order.amount, quote.total_payable);
    let cb = h.callback(&checkout.order.order_id, "pay_duty");
    let duty_paid = h.engine.confirm_payment(&sender(), id, cb).unwrap();
    assert_eq!(duty_paid.status, ShipmentStatus::DutyPaymentSuccessful);
    expected_events += 1;

    let delivered = step(agency(), ShipmentStatus::Delivered);
    expected_events += 1;

    assert!(delivered.status.is_terminal());
    assert_eq!(delivered.events.len(), expected_events);
    assert_event_log_consistent(&delivered);
    assert_eq!(delivered.payments.records().len(), 2);
    assert!(!h.notifier.sent_to("ops@asha.example").is_empty());
}

#[test]
fn dap_receiver_pays_duty() {
    let h = harness();
    let id = h.to_import_clearance(DutyMode::Dap);
    h.go(&agency(), id, ShipmentStatus::ImportApproved);

    assert!(matches!(
        h.engine.create_payment_order(&sender(), id, PaymentKind::Duty),
        Err(ClearanceError::Unauthorized { .. })
    ));
    let s = h.pay(&receiver(), id, PaymentKind::Duty);
    assert_eq!(s.status, ShipmentStatus::DutyPaymentSuccessful);
    assert_eq!(s.events.last().unwrap().actor, Role::Receiver);

    let delivered = h.go(&agency(), id, ShipmentStatus::Delivered);
    assert_event_log_consistent(&delivered);
}

// ---------------------------------------------------------------------------
// Return branch
// ---------------------------------------------------------------------------

#[test]
fn return_branch_collects_charges() {
    let h = harness();
    let id = h.to_import_clearance(DutyMode::Ddp);
    h.go(&sender(), id, ShipmentStatus::ReturnRequested);

    assert!(matches!(
        h.engine.create_payment_order(&sender(), id, PaymentKind::ReturnCharges),
        Err(ClearanceError::PreconditionNotMet { .. })
    ));

    h.engine
        .assess_charges(
            &agency(),
            id,
            vec![
                ChargeLine {
                    item: ChargeItem::ReturnFreight,
                    amount: Amount::from_minor(90_000),
                },
                ChargeLine {
                    item: ChargeItem::Storage,
                    amount: Amount::from_minor(10_000),
                },
            ],
        )
        .unwrap();
    let sheet = h.engine.quote_charges(&sender(), id).unwrap().unwrap();
    assert_eq!(sheet.total(), Amount::from_minor(100_000));

    let paid = h.pay(&sender(), id, PaymentKind::ReturnCharges);
    assert_eq!(paid.status, ShipmentStatus::ReturnChargesPaid);
    assert_eq!(
        paid.payments
            .record_for(PaymentKind::ReturnCharges)
            .unwrap()
            .total,
        Amount::from_minor(100_000)
    );

    let returned = h.go(&agency(), id, ShipmentStatus::Returned);
    assert!(returned.status.is_terminal());
    assert_event_log_consistent(&returned);
    assert!(matches!(
        h.engine.request_transition(
            &agency(),
            id,
            ShipmentStatus::Delivered,
            TransitionEvidence::default()
        ),
        Err(ClearanceError::Terminal { .. })
    ));
}

// ---------------------------------------------------------------------------
// Documents hold
// ---------------------------------------------------------------------------

#[test]
fn export_hold_with_inline_requests() {
    let h = harness();
    let id = h.to_document_approved(DutyMode::Ddp);
    h.pay(&sender(), id, PaymentKind::Shipping);

    let held = h
        .engine
        .request_transition(
            &agency(),
            id,
            ShipmentStatus::ExportDocumentsRequired,
            TransitionEvidence::reason("shipping bill missing").with_documents(vec![
                DocumentRequest {
                    name: DocumentName::new("Shipping Bill").unwrap(),
                    requested_for: DocumentParty::Sender,
                    notes: None,
                },
            ]),
        )
        .unwrap();
    assert_eq!(held.hold_reason.as_deref(), Some("shipping bill missing"));

    // A second cycle must be complete before release.
    assert!(matches!(
        h.engine.request_transition(
            &agency(),
            id,
            ShipmentStatus::PaymentSuccessful,
            TransitionEvidence::default()
        ),
        Err(ClearanceError::PreconditionNotMet { .. })
    ));
    h.engine
        .submit_document(&sender(), id, "Shipping Bill", b"sb")
        .unwrap();
    let released = h.go(&agency(), id, ShipmentStatus::PaymentSuccessful);
    assert!(released.hold_reason.is_none());
    assert_eq!(released.documents.cycles().len(), 2);

    // The confirmed shipping payment still counts after the round trip.
    let moving = h.go(&agency(), id, ShipmentStatus::InTransit);
    assert_eq!(moving.payments.records().len(), 1);
    assert_event_log_consistent(&moving);
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[test]
fn unpaid_shipping_aborts_after_window() {
    let h = harness();
    let overdue = h.to_document_approved(DutyMode::Ddp);
    let fresh = h.book(DutyMode::Ddp);

    h.clock.advance_days(89);
    assert!(h.engine.enforce_all_timeouts().is_empty());

    h.clock.advance_days(1);
    assert_eq!(h.engine.enforce_all_timeouts(), vec![overdue]);

    let aborted = h.engine.get(&agency(), overdue).unwrap();
    assert_eq!(aborted.status, ShipmentStatus::Aborted);
    assert_eq!(aborted.events.last().unwrap().actor, Role::System);
    assert_event_log_consistent(&aborted);

    // Not yet at the payment step; no window applies.
    assert_eq!(
        h.engine.get(&agency(), fresh).unwrap().status,
        ShipmentStatus::Created
    );

    // Sweeping again changes nothing.
    assert!(h.engine.enforce_all_timeouts().is_empty());
}

#[test]
fn reads_never_abort() {
    let h = harness();
    let id = h.to_document_approved(DutyMode::Ddp);
    h.clock.advance_days(120);

    let view = h.engine.view(&sender(), id).unwrap();
    assert!(view.abort_due);
    assert!(matches!(
        h.engine.quote_shipping(&sender(), id).unwrap(),
        FeeAssessment::Cancelled { .. }
    ));
    let stored = h.engine.get(&agency(), id).unwrap();
    assert_eq!(stored.status, ShipmentStatus::DocumentApproved);
}
