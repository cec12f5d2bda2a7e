//! # Payment Ledger
//!
//! Checkout orders and confirmed payments for one shipment. A shipment
//! holds at most one confirmed record per [`PaymentKind`]; replaying the
//! same gateway callback is a no-op and a second, different payment is
//! rejected.

use std::fmt;

use clearance_core::{Amount, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::ShipmentStatus;

/// What a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Shipping cost, due in `DocumentApproved`.
    Shipping,
    /// Import duty and GST, due in `ImportApproved`.
    Duty,
    /// Return charges, due in `ReturnRequested`.
    ReturnCharges,
    /// Destruction charges, due in `DestructionRequested`.
    DestructionCharges,
}

impl PaymentKind {
    /// Every kind.
    pub const ALL: [PaymentKind; 4] = [
        Self::Shipping,
        Self::Duty,
        Self::ReturnCharges,
        Self::DestructionCharges,
    ];

    /// Wire name, also used as the gateway reference tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Duty => "duty",
            Self::ReturnCharges => "return_charges",
            Self::DestructionCharges => "destruction_charges",
        }
    }

    /// The transition this payment unlocks.
    pub fn settles(&self) -> (ShipmentStatus, ShipmentStatus) {
        match self {
            Self::Shipping => (ShipmentStatus::DocumentApproved, ShipmentStatus::PaymentSuccessful),
            Self::Duty => (ShipmentStatus::ImportApproved, ShipmentStatus::DutyPaymentSuccessful),
            Self::ReturnCharges => (ShipmentStatus::ReturnRequested, ShipmentStatus::ReturnChargesPaid),
            Self::DestructionCharges => (
                ShipmentStatus::DestructionRequested,
                ShipmentStatus::DestructionChargesPaid,
            ),
        }
    }

    /// The kind payable in `status`, if any.
    pub fn due_in(status: ShipmentStatus) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.settles().0 == status)
    }

    /// Whether the amount escalates with time.
    pub fn escalates(&self) -> bool {
        matches!(self, Self::Shipping | Self::Duty)
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkout opened with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Gateway order id.
    pub order_id: String,
    /// What the order pays for.
    pub kind: PaymentKind,
    /// Un-escalated amount.
    pub base: Amount,
    /// Late fine included in the order.
    pub fine: Amount,
    /// `base + fine`; what the gateway collects.
    pub total: Amount,
    /// Days elapsed in the window when the order was created.
    pub days_elapsed: i64,
    /// When the order was created.
    pub created_at: Timestamp,
}

/// Fields the gateway posts back after checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCallback {
    /// Order the payment was made against.
    pub order_id: String,
    /// Gateway payment id.
    pub payment_id: String,
    /// Gateway signature over `order_id|payment_id`.
    pub signature: String,
}

/// A verified, confirmed payment. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// What was paid.
    pub kind: PaymentKind,
    /// Un-escalated amount.
    pub base: Amount,
    /// Late fine paid.
    pub fine: Amount,
    /// Total collected.
    pub total: Amount,
    /// Gateway order id.
    pub order_id: String,
    /// Gateway payment id.
    pub payment_id: String,
    /// Signature that was verified.
    pub signature: String,
    /// When the payment was confirmed.
    pub confirmed_at: Timestamp,
}

/// Result of [`PaymentLedger::confirm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// A new record was written.
    Recorded,
    /// The same payment was already on record.
    AlreadyConfirmed,
}

/// Payment ledger failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// No checkout order with this id exists on the shipment.
    #[error("unknown payment order {order_id}")]
    UnknownOrder {
        /// The unmatched order id.
        order_id: String,
    },

    /// A different payment of this kind is already confirmed.
    #[error("a {kind} payment is already confirmed for this shipment")]
    DuplicatePayment {
        /// The kind already paid.
        kind: PaymentKind,
    },

    /// The order pays for something other than what was requested.
    #[error("order is for a {actual} payment, expected {expected}")]
    KindMismatch {
        /// Kind the transition needs.
        expected: PaymentKind,
        /// Kind of the referenced order.
        actual: PaymentKind,
    },

    /// Nothing of this kind is payable in the current status.
    #[error("no {kind} payment is due in status {status}")]
    NotDue {
        /// Requested kind.
        kind: PaymentKind,
        /// Current status.
        status: ShipmentStatus,
    },
}

/// Orders and confirmed payments of one shipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLedger {
    orders: Vec<PaymentOrder>,
    records: Vec<PaymentRecord>,
}

impl PaymentLedger {
    /// Store a new checkout order.
    pub fn add_order(&mut self, order: PaymentOrder) {
        self.orders.push(order);
    }

    /// Look an order up by gateway id.
    pub fn order(&self, order_id: &str) -> Option<&PaymentOrder> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    /// Every order, oldest first.
    pub fn orders(&self) -> &[PaymentOrder] {
        &self.orders
    }

    /// Every confirmed payment, oldest first.
    pub fn records(&self) -> &[PaymentRecord] {
        &self.records
    }

    /// The confirmed payment of `kind`, if any.
    pub fn record_for(&self, kind: PaymentKind) -> Option<&PaymentRecord> {
        self.records.iter().find(|r| r.kind == kind)
    }

    /// Whether a payment of `kind` is confirmed.
    pub fn is_confirmed(&self, kind: PaymentKind) -> bool {
        self.record_for(kind).is_some()
    }

    /// Record a verified callback. Signature verification is the caller's
    /// job; the record copies amounts from the order.
    pub fn confirm(
        &mut self,
        expected: PaymentKind,
        callback: &GatewayCallback,
        at: Timestamp,
    ) -> Result<ConfirmOutcome, PaymentError> {
        let order = self
            .order(&callback.order_id)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownOrder {
                order_id: callback.order_id.clone(),
            })?;
        if order.kind != expected {
            return Err(PaymentError::KindMismatch {
                expected,
                actual: order.kind,
            });
        }
        if let Some(existing) = self.record_for(order.kind) {
            if existing.order_id == callback.order_id && existing.payment_id == callback.payment_id {
                return Ok(ConfirmOutcome::AlreadyConfirmed);
            }
            return Err(PaymentError::DuplicatePayment { kind: order.kind });
        }
        self.records.push(PaymentRecord {
            kind: order.kind,
            base: order.base,
            fine: order.fine,
            total: order.total,
            order_id: callback.order_id.clone(),
            payment_id: callback.payment_id.clone(),
            signature: callback.signature.clone(),
            confirmed_at: at,
        });
        Ok(ConfirmOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> Timestamp {
        Timestamp::parse("2026-03-01T00:00:00Z").unwrap()
    }

    fn ledger_with_order(kind: PaymentKind) -> PaymentLedger {
        let mut ledger = PaymentLedger::default();
        ledger.add_order(PaymentOrder {
            order_id: "order_a".into(),
            kind,
            base: Amount::from_minor(100_000),
            fine: Amount::from_minor(1_000),
            total: Amount::from_minor(101_000),
            days_elapsed: 6,
            created_at: at(),
        });
        ledger
    }

    fn callback(order: &str, payment: &str) -> GatewayCallback {
        GatewayCallback {
            order_id: order.into(),
            payment_id: payment.into(),
            signature: "sig".into(),
        }
    }

    #[test]
    fn confirm_copies_order_amounts() {
        let mut ledger = ledger_with_order(PaymentKind::Shipping);
        let outcome = ledger
            .confirm(PaymentKind::Shipping, &callback("order_a", "pay_1"), at())
            .unwrap();
        assert_eq!(outcome, ConfirmOutcome::Recorded);
        let record = ledger.record_for(PaymentKind::Shipping).unwrap();
        assert_eq!(record.total, Amount::from_minor(101_000));
        assert_eq!(record.fine, Amount::from_minor(1_000));
    }

    #[test]
    fn replay_is_idempotent() {
        let mut ledger = ledger_with_order(PaymentKind::Duty);
        let cb = callback("order_a", "pay_1");
        ledger.confirm(PaymentKind::Duty, &cb, at()).unwrap();
        let again = ledger.confirm(PaymentKind::Duty, &cb, at()).unwrap();
        assert_eq!(again, ConfirmOutcome::AlreadyConfirmed);
        assert_eq!(ledger.records().len(), 1);
    }

    #[test]
    fn second_payment_rejected() {
        let mut ledger = ledger_with_order(PaymentKind::Duty);
        ledger
            .confirm(PaymentKind::Duty, &callback("order_a", "pay_1"), at())
            .unwrap();
        let err = ledger
            .confirm(PaymentKind::Duty, &callback("order_a", "pay_2"), at())
            .unwrap_err();
        assert_eq!(err, PaymentError::DuplicatePayment { kind: PaymentKind::Duty });
    }

    #[test]
    fn unknown_order_and_kind_mismatch() {
        let mut ledger = ledger_with_order(PaymentKind::Shipping);
        assert!(matches!(
            ledger.confirm(PaymentKind::Shipping, &callback("order_x", "p"), at()),
            Err(PaymentError::UnknownOrder { .. })
        ));
        assert!(matches!(
            ledger.confirm(PaymentKind::Duty, &callback("order_a", "p"), at()),
            Err(PaymentError::KindMismatch { .. })
        ));
        assert!(ledger.records().is_empty());
    }

    #[test]
    fn due_in_maps_status() {
        assert_eq!(
            PaymentKind::due_in(ShipmentStatus::DocumentApproved),
            Some(PaymentKind::Shipping)
        );
        assert_eq!(
            PaymentKind::due_in(ShipmentStatus::DestructionRequested),
            Some(PaymentKind::DestructionCharges)
        );
        assert_eq!(PaymentKind::due_in(ShipmentStatus::InTransit), None);
    }
}
