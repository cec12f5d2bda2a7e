//! # Shipment Status
//!
//! The closed set of lifecycle states.
//!
//! ```text
//! Created ─▶ HsApproved ─▶ DocumentUploaded ─▶ DocumentApproved ─▶ PaymentSuccessful ─▶ InTransit
//!                                                    │                 ▲   │
//!                                                    ▼                 │   ▼
//!                                                 Aborted      ExportDocumentsRequired
//!
//! InTransit ─▶ ArrivedAtCustoms ─▶ ImportClearance ─▶ ImportApproved ─▶ DutyPaymentSuccessful ─▶ Delivered
//!                                   │  ▲    │  │           │
//!                                   ▼  │    │  │           ▼
//!                    ImportDocumentsRequired │  │        Aborted
//!                                            │  └─▶ DestructionRequested ─▶ DestructionChargesPaid ─▶ Destroyed
//!                                            └─▶ ReturnRequested ─▶ ReturnChargesPaid ─▶ Returned
//! ```

use std::fmt;
use std::str::FromStr;

use clearance_core::ValidationError;
use serde::{Deserialize, Serialize};

use crate::transition::{TransitionRule, TRANSITIONS};

/// Lifecycle state of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Booked by the sender.
    Created,
    /// Classification accepted by the agency.
    HsApproved,
    /// Sender has supplied the initial documents.
    DocumentUploaded,
    /// Agency accepted the initial documents; shipping payment is due.
    DocumentApproved,
    /// Shipping cost paid.
    PaymentSuccessful,
    /// Export held for additional documents.
    ExportDocumentsRequired,
    /// Export approved; parcel moving.
    InTransit,
    /// Parcel at destination customs.
    ArrivedAtCustoms,
    /// Under import examination.
    ImportClearance,
    /// Import held for additional documents.
    ImportDocumentsRequired,
    /// Released by customs; duty is due.
    ImportApproved,
    /// Duty paid.
    DutyPaymentSuccessful,
    /// Handed to the receiver.
    Delivered,
    /// Sender asked for the parcel back.
    ReturnRequested,
    /// Return charges paid.
    ReturnChargesPaid,
    /// Parcel returned to the sender.
    Returned,
    /// Sender asked for the parcel to be destroyed.
    DestructionRequested,
    /// Destruction charges paid.
    DestructionChargesPaid,
    /// Parcel destroyed under supervision.
    Destroyed,
    /// A payment window closed unpaid.
    Aborted,
}

impl ShipmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ShipmentStatus; 20] = [
        Self::Created,
        Self::HsApproved,
        Self::DocumentUploaded,
        Self::DocumentApproved,
        Self::PaymentSuccessful,
        Self::ExportDocumentsRequired,
        Self::InTransit,
        Self::ArrivedAtCustoms,
        Self::ImportClearance,
        Self::ImportDocumentsRequired,
        Self::ImportApproved,
        Self::DutyPaymentSuccessful,
        Self::Delivered,
        Self::ReturnRequested,
        Self::ReturnChargesPaid,
        Self::Returned,
        Self::DestructionRequested,
        Self::DestructionChargesPaid,
        Self::Destroyed,
        Self::Aborted,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::HsApproved => "HS_APPROVED",
            Self::DocumentUploaded => "DOCUMENT_UPLOADED",
            Self::DocumentApproved => "DOCUMENT_APPROVED",
            Self::PaymentSuccessful => "PAYMENT_SUCCESSFUL",
            Self::ExportDocumentsRequired => "EXPORT_DOCUMENTS_REQUIRED",
            Self::InTransit => "IN_TRANSIT",
            Self::ArrivedAtCustoms => "ARRIVED_AT_CUSTOMS",
            Self::ImportClearance => "IMPORT_CLEARANCE",
            Self::ImportDocumentsRequired => "IMPORT_DOCUMENTS_REQUIRED",
            Self::ImportApproved => "IMPORT_APPROVED",
            Self::DutyPaymentSuccessful => "DUTY_PAYMENT_SUCCESSFUL",
            Self::Delivered => "DELIVERED",
            Self::ReturnRequested => "RETURN_REQUESTED",
            Self::ReturnChargesPaid => "RETURN_CHARGES_PAID",
            Self::Returned => "RETURNED",
            Self::DestructionRequested => "DESTRUCTION_REQUESTED",
            Self::DestructionChargesPaid => "DESTRUCTION_CHARGES_PAID",
            Self::Destroyed => "DESTROYED",
            Self::Aborted => "ABORTED",
        }
    }

    /// Lower-kebab form used in URL paths (`status-hs-approved`).
    pub fn slug(&self) -> String {
        self.as_str().to_ascii_lowercase().replace('_', "-")
    }

    /// Look a status up by wire name or slug.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL.into_iter().find(|s| s.as_str() == normalized)
    }

    /// Label shown to people. Both document gates read the same.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::HsApproved => "HS Approved",
            Self::DocumentUploaded => "Document Uploaded",
            Self::DocumentApproved => "Document Approved",
            Self::PaymentSuccessful => "Payment Successful",
            Self::ExportDocumentsRequired | Self::ImportDocumentsRequired => {
                "Additional Documents Required"
            }
            Self::InTransit => "In Transit",
            Self::ArrivedAtCustoms => "Arrived at Customs",
            Self::ImportClearance => "Import Clearance",
            Self::ImportApproved => "Import Approved",
            Self::DutyPaymentSuccessful => "Duty Payment Successful",
            Self::Delivered => "Delivered",
            Self::ReturnRequested => "Return Request",
            Self::ReturnChargesPaid => "Return Charges Paid",
            Self::Returned => "Returned",
            Self::DestructionRequested => "Destruction Request",
            Self::DestructionChargesPaid => "Destruction Charges Paid",
            Self::Destroyed => "Destroyed",
            Self::Aborted => "Aborted",
        }
    }

    /// Whether no further transitions are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Returned | Self::Destroyed | Self::Aborted
        )
    }

    /// Whether this is one of the additional-documents holds.
    pub fn is_document_gate(&self) -> bool {
        matches!(
            self,
            Self::ExportDocumentsRequired | Self::ImportDocumentsRequired
        )
    }

    /// Position along the lifecycle. Every legal transition is
    /// non-decreasing in rank except the return from a document gate,
    /// which shares its origin's rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::HsApproved => 1,
            Self::DocumentUploaded => 2,
            Self::DocumentApproved => 3,
            Self::PaymentSuccessful | Self::ExportDocumentsRequired => 4,
            Self::InTransit => 5,
            Self::ArrivedAtCustoms => 6,
            Self::ImportClearance | Self::ImportDocumentsRequired => 7,
            Self::ImportApproved | Self::ReturnRequested | Self::DestructionRequested => 8,
            Self::DutyPaymentSuccessful
            | Self::ReturnChargesPaid
            | Self::DestructionChargesPaid => 9,
            Self::Delivered | Self::Returned | Self::Destroyed => 10,
            Self::Aborted => 11,
        }
    }

    /// Rules leaving this status.
    pub fn outgoing(&self) -> impl Iterator<Item = &'static TransitionRule> + '_ {
        TRANSITIONS.iter().filter(move |r| r.from == *self)
    }

    /// Statuses reachable in one step, in table order, without duplicates.
    pub fn valid_transitions(&self) -> Vec<ShipmentStatus> {
        let mut targets = Vec::new();
        for rule in self.outgoing() {
            if !targets.contains(&rule.to) {
                targets.push(rule.to);
            }
        }
        targets
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ValidationError::Unknown {
            kind: "shipment status",
            value: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for status in ShipmentStatus::ALL {
            assert_eq!(ShipmentStatus::from_name(status.as_str()), Some(status));
            assert_eq!(ShipmentStatus::from_name(&status.slug()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn slug_format() {
        assert_eq!(ShipmentStatus::HsApproved.slug(), "hs-approved");
        assert_eq!(
            ShipmentStatus::DutyPaymentSuccessful.slug(),
            "duty-payment-successful"
        );
    }

    #[test]
    fn unknown_name_rejected() {
        assert!("SHIPPED".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn document_gates_share_label() {
        assert_eq!(
            ShipmentStatus::ExportDocumentsRequired.label(),
            ShipmentStatus::ImportDocumentsRequired.label()
        );
        assert_ne!(
            ShipmentStatus::ExportDocumentsRequired,
            ShipmentStatus::ImportDocumentsRequired
        );
    }

    #[test]
    fn terminal_states_have_no_outgoing_rules() {
        for status in ShipmentStatus::ALL {
            if status.is_terminal() {
                assert!(status.valid_transitions().is_empty(), "{status}");
            } else {
                assert!(!status.valid_transitions().is_empty(), "{status}");
            }
        }
    }

    #[test]
    fn every_rule_is_rank_monotonic() {
        for rule in TRANSITIONS {
            let returns_from_gate = rule.from.is_document_gate();
            if returns_from_gate {
                assert_eq!(rule.from.rank(), rule.to.rank(), "{} -> {}", rule.from, rule.to);
            } else {
                assert!(rule.to.rank() >= rule.from.rank(), "{} -> {}", rule.from, rule.to);
            }
        }
    }

    #[test]
    fn document_gates_only_return_to_origin() {
        assert_eq!(
            ShipmentStatus::ExportDocumentsRequired.valid_transitions(),
            vec![ShipmentStatus::PaymentSuccessful]
        );
        assert_eq!(
            ShipmentStatus::ImportDocumentsRequired.valid_transitions(),
            vec![ShipmentStatus::ImportClearance]
        );
    }

    #[test]
    fn import_clearance_branches() {
        let next = ShipmentStatus::ImportClearance.valid_transitions();
        assert!(next.contains(&ShipmentStatus::ImportApproved));
        assert!(next.contains(&ShipmentStatus::ImportDocumentsRequired));
        assert!(next.contains(&ShipmentStatus::ReturnRequested));
        assert!(next.contains(&ShipmentStatus::DestructionRequested));
    }
}
