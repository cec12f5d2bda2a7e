//! # Shipment Aggregate
//!
//! The unit of consistency. Status, event log, documents, payments and
//! charges live together and are committed together under one version.

use clearance_core::{
    Amount, DutyMode, HsCode, Party, Role, Session, ShipmentId, Timestamp, ValidationError,
};
use clearance_fees::ChargeSheet;
use serde::{Deserialize, Serialize};

use crate::config::PhaseAnchor;
use crate::documents::DocumentLedger;
use crate::payment::PaymentLedger;
use crate::status::ShipmentStatus;

/// Parcel dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Length.
    pub length_mm: u32,
    /// Width.
    pub width_mm: u32,
    /// Height.
    pub height_mm: u32,
}

/// Commercial description of the goods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goods {
    /// Product category.
    pub category: String,
    /// Free-text description.
    pub description: String,
    /// Material composition, where relevant.
    #[serde(default)]
    pub composition: Option<String>,
    /// Declared customs value.
    pub declared_value: Amount,
    /// Gross weight in grams.
    pub weight_grams: u64,
    /// Outer dimensions.
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

impl Goods {
    /// Reject blank text and non-positive value or weight.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::Empty { field: "category" });
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "description",
            });
        }
        if self.description.chars().count() > 2_000 {
            return Err(ValidationError::TooLong {
                field: "description",
                max: 2_000,
            });
        }
        if self.declared_value <= Amount::ZERO {
            return Err(ValidationError::OutOfRange {
                field: "declared_value",
                reason: "must be positive".to_string(),
            });
        }
        if self.weight_grams == 0 {
            return Err(ValidationError::OutOfRange {
                field: "weight_grams",
                reason: "must be positive".to_string(),
            });
        }
        if let Some(d) = self.dimensions {
            if d.length_mm == 0 || d.width_mm == 0 || d.height_mm == 0 {
                return Err(ValidationError::OutOfRange {
                    field: "dimensions",
                    reason: "every side must be positive".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Origin and destination tariff classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// HS code in the origin country.
    pub origin_hs_code: HsCode,
    /// HS code in the destination country.
    pub destination_hs_code: HsCode,
}

/// What a sender submits to book a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDraft {
    /// Sender contact.
    pub sender: Party,
    /// Receiver contact.
    pub receiver: Party,
    /// Who pays import duty.
    pub duty_mode: DutyMode,
    /// Goods description and value.
    pub goods: Goods,
    /// Proposed classification.
    pub classification: Classification,
}

impl ShipmentDraft {
    /// Validate every field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.sender.validate()?;
        self.receiver.validate()?;
        self.goods.validate()
    }
}

/// Phase timestamps used as fee-window anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimestamps {
    /// First HS approval.
    pub hs_approved_at: Option<Timestamp>,
    /// Initial documents approved.
    pub documents_approved_at: Option<Timestamp>,
    /// Export approved (entered `InTransit`).
    pub export_approved_at: Option<Timestamp>,
    /// Arrived at destination customs.
    pub arrived_at_customs_at: Option<Timestamp>,
    /// Import approved.
    pub import_approved_at: Option<Timestamp>,
}

impl PhaseTimestamps {
    /// Stamp the phase entered by `status`. Only the first entry counts.
    pub fn stamp(&mut self, status: ShipmentStatus, at: Timestamp) {
        let slot = match status {
            ShipmentStatus::HsApproved => &mut self.hs_approved_at,
            ShipmentStatus::DocumentApproved => &mut self.documents_approved_at,
            ShipmentStatus::InTransit => &mut self.export_approved_at,
            ShipmentStatus::ArrivedAtCustoms => &mut self.arrived_at_customs_at,
            ShipmentStatus::ImportApproved => &mut self.import_approved_at,
            _ => return,
        };
        slot.get_or_insert(at);
    }
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// 1-based position in the log.
    pub sequence: u32,
    /// Human-readable title.
    pub title: String,
    /// Status before; `None` for the creation event.
    pub from: Option<ShipmentStatus>,
    /// Status after.
    pub to: ShipmentStatus,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Role that caused it.
    pub actor: Role,
    /// Free-text reason.
    pub reason: Option<String>,
}

/// Charge sheet entered by the agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeAssessment {
    /// The itemized charges.
    pub sheet: ChargeSheet,
    /// When they were entered.
    pub assessed_at: Timestamp,
    /// Officer who entered them.
    pub assessed_by: String,
}

/// The shipment aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    /// Identifier.
    pub id: ShipmentId,
    /// Incremented on every committed change.
    pub version: u64,
    /// Current status.
    pub status: ShipmentStatus,
    /// Account of the sender who booked the shipment.
    pub owner_account: String,
    /// Sender contact.
    pub sender: Party,
    /// Receiver contact.
    pub receiver: Party,
    /// Who pays import duty.
    pub duty_mode: DutyMode,
    /// Goods.
    pub goods: Goods,
    /// Current classification.
    pub classification: Classification,
    /// Booking time.
    pub created_at: Timestamp,
    /// Last committed change.
    pub updated_at: Timestamp,
    /// Phase anchors.
    pub phases: PhaseTimestamps,
    /// Why the shipment is held for documents, while it is.
    pub hold_reason: Option<String>,
    /// Status history.
    pub events: Vec<StatusEvent>,
    /// Requirements and submissions.
    pub documents: DocumentLedger,
    /// Orders and confirmed payments.
    pub payments: PaymentLedger,
    /// Return or destruction charges, once assessed.
    pub charges: Option<ChargeAssessment>,
}

impl Shipment {
    /// Book a shipment from a validated draft.
    pub fn new(id: ShipmentId, owner_account: &str, draft: ShipmentDraft, at: Timestamp) -> Self {
        Self {
            id,
            version: 1,
            status: ShipmentStatus::Created,
            owner_account: owner_account.to_string(),
            sender: draft.sender,
            receiver: draft.receiver,
            duty_mode: draft.duty_mode,
            goods: draft.goods,
            classification: draft.classification,
            created_at: at,
            updated_at: at,
            phases: PhaseTimestamps::default(),
            hold_reason: None,
            events: vec![StatusEvent {
                sequence: 1,
                title: "Shipment Created".to_string(),
                from: None,
                to: ShipmentStatus::Created,
                timestamp: at,
                actor: Role::Sender,
                reason: None,
            }],
            documents: DocumentLedger::default(),
            payments: PaymentLedger::default(),
            charges: None,
        }
    }

    /// Whether `session` is a party to this shipment (or staff).
    pub fn is_visible_to(&self, session: &Session) -> bool {
        match session.role {
            Role::Agency | Role::System => true,
            Role::Sender => self.owner_account == session.subject,
            Role::Receiver => self.receiver.email.matches(&session.subject),
        }
    }

    /// Move to `to`, append the event and stamp the phase.
    pub fn record_transition(
        &mut self,
        to: ShipmentStatus,
        actor: Role,
        reason: Option<String>,
        at: Timestamp,
    ) {
        let from = self.status;
        let title = if from == to {
            format!("{} (corrected)", to.label())
        } else {
            to.label().to_string()
        };
        self.events.push(StatusEvent {
            sequence: self.next_sequence(),
            title,
            from: Some(from),
            to,
            timestamp: at,
            actor,
            reason,
        });
        self.status = to;
        self.phases.stamp(to, at);
    }

    fn next_sequence(&self) -> u32 {
        self.events.last().map_or(1, |e| e.sequence + 1)
    }

    /// The instant a phase anchor refers to, if the phase has been reached.
    pub fn anchor_time(&self, anchor: PhaseAnchor) -> Option<Timestamp> {
        match anchor {
            PhaseAnchor::Created => Some(self.created_at),
            PhaseAnchor::HsApproved => self.phases.hs_approved_at,
            PhaseAnchor::DocumentApproved => self.phases.documents_approved_at,
            PhaseAnchor::ExportApproved => self.phases.export_approved_at,
            PhaseAnchor::ImportApproved => self.phases.import_approved_at,
        }
    }

    /// Events visible to `role`. Receivers see the shipment from transit on.
    pub fn timeline_for(&self, role: Role) -> Vec<StatusEvent> {
        let threshold = ShipmentStatus::InTransit.rank();
        self.events
            .iter()
            .filter(|e| role != Role::Receiver || e.to.rank() >= threshold)
            .cloned()
            .collect()
    }

    /// Email addresses to notify about a move into `status`.
    pub fn recipients_for(&self, status: ShipmentStatus) -> Vec<&str> {
        let mut to = vec![self.sender.email.as_str()];
        if status.rank() >= ShipmentStatus::InTransit.rank() {
            to.push(self.receiver.email.as_str());
        }
        to
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use clearance_core::{Address, EmailAddress};

    pub fn party(name: &str, email: &str, country: &str) -> Party {
        Party {
            name: name.to_string(),
            email: EmailAddress::new(email).unwrap(),
            phone: "+91 98200 00000".to_string(),
            address: Address {
                line1: "1 Dock Street".to_string(),
                city: "Mumbai".to_string(),
                state: "MH".to_string(),
                postal_code: "400001".to_string(),
                country: country.to_string(),
            },
        }
    }

    pub fn draft(duty_mode: DutyMode) -> ShipmentDraft {
        ShipmentDraft {
            sender: party("Asha Exports", "ops@asha.example", "IN"),
            receiver: party("Kline GmbH", "buyer@kline.example", "DE"),
            duty_mode,
            goods: Goods {
                category: "Apparel".to_string(),
                description: "Cotton t-shirts".to_string(),
                composition: Some("100% cotton".to_string()),
                declared_value: Amount::from_minor(1_000_000),
                weight_grams: 2_400,
                dimensions: Some(Dimensions {
                    length_mm: 400,
                    width_mm: 300,
                    height_mm: 200,
                }),
            },
            classification: Classification {
                origin_hs_code: HsCode::new("610910").unwrap(),
                destination_hs_code: HsCode::new("61091000").unwrap(),
            },
        }
    }
}
