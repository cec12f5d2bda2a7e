//! # Transition Table
//!
//! Every legal edge of the lifecycle graph, the actor allowed to take it,
//! and the gates that must hold. The engine never compares status names;
//! it looks rules up here.

use clearance_core::{DutyMode, Role};
use serde::Serialize;

use crate::payment::PaymentKind;
use crate::status::ShipmentStatus;

/// Who may trigger a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredActor {
    /// Agency officers only.
    Agency,
    /// The owning sender only.
    Sender,
    /// Sender under DDP, receiver under DAP.
    DutyPayer,
    /// An agency officer or the timeout scheduler.
    AgencyOrSystem,
}

impl RequiredActor {
    /// Whether `role` satisfies this requirement for a shipment in `duty_mode`.
    pub fn permits(&self, role: Role, duty_mode: DutyMode) -> bool {
        match self {
            Self::Agency => role == Role::Agency,
            Self::Sender => role == Role::Sender,
            Self::DutyPayer => role == duty_mode.duty_payer(),
            Self::AgencyOrSystem => matches!(role, Role::Agency | Role::System),
        }
    }

    /// Description used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Agency => "agency",
            Self::Sender => "sender",
            Self::DutyPayer => "duty payer",
            Self::AgencyOrSystem => "agency or system",
        }
    }
}

/// A precondition checked (and possibly applied) during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "gate", content = "kind")]
pub enum Gate {
    /// Every sender requirement has a submission.
    SenderDocumentsSatisfied,
    /// Every requirement has a submission.
    DocumentsSatisfied,
    /// The current documents cycle is non-empty and fully submitted.
    CycleSatisfied,
    /// Populates the first documents cycle from the catalog.
    OpensInitialCycle,
    /// Opens a new documents cycle for an additional-documents hold.
    OpensDocumentCycle,
    /// The evidence carries a classification differing from the current one.
    ClassificationChange,
    /// The escalation window for the payment has not closed.
    PaymentWindowOpen(PaymentKind),
    /// A verified payment of this kind is on record or in the evidence.
    PaymentConfirmed(PaymentKind),
    /// The agency has entered the charge sheet.
    ChargesAssessed,
    /// The escalation window for the payment has closed.
    PaymentWindowExpired(PaymentKind),
}

/// One edge of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    /// Source status.
    pub from: ShipmentStatus,
    /// Target status.
    pub to: ShipmentStatus,
    /// Who may take this edge.
    pub actor: RequiredActor,
    /// Checked in order.
    pub gates: &'static [Gate],
}

use Gate::*;
use RequiredActor as A;
use ShipmentStatus as S;

/// The lifecycle graph.
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: S::Created,
        to: S::HsApproved,
        actor: A::Agency,
        gates: &[OpensInitialCycle],
    },
    TransitionRule {
        from: S::HsApproved,
        to: S::HsApproved,
        actor: A::Agency,
        gates: &[ClassificationChange],
    },
    TransitionRule {
        from: S::HsApproved,
        to: S::DocumentUploaded,
        actor: A::Sender,
        gates: &[SenderDocumentsSatisfied, DocumentsSatisfied],
    },
    TransitionRule {
        from: S::DocumentUploaded,
        to: S::DocumentApproved,
        actor: A::Agency,
        gates: &[DocumentsSatisfied],
    },
    TransitionRule {
        from: S::DocumentApproved,
        to: S::PaymentSuccessful,
        actor: A::Sender,
        gates: &[
            DocumentsSatisfied,
            PaymentWindowOpen(PaymentKind::Shipping),
            PaymentConfirmed(PaymentKind::Shipping),
        ],
    },
    TransitionRule {
        from: S::DocumentApproved,
        to: S::Aborted,
        actor: A::AgencyOrSystem,
        gates: &[PaymentWindowExpired(PaymentKind::Shipping)],
    },
    TransitionRule {
        from: S::PaymentSuccessful,
        to: S::ExportDocumentsRequired,
        actor: A::Agency,
        gates: &[OpensDocumentCycle],
    },
    TransitionRule {
        from: S::ExportDocumentsRequired,
        to: S::PaymentSuccessful,
        actor: A::Agency,
        gates: &[CycleSatisfied],
    },
    TransitionRule {
        from: S::PaymentSuccessful,
        to: S::InTransit,
        actor: A::Agency,
        gates: &[DocumentsSatisfied],
    },
    TransitionRule {
        from: S::InTransit,
        to: S::ArrivedAtCustoms,
        actor: A::Agency,
        gates: &[],
    },
    TransitionRule {
        from: S::ArrivedAtCustoms,
        to: S::ImportClearance,
        actor: A::Agency,
        gates: &[],
    },
    TransitionRule {
        from: S::ImportClearance,
        to: S::ImportDocumentsRequired,
        actor: A::Agency,
        gates: &[OpensDocumentCycle],
    },
    TransitionRule {
        from: S::ImportDocumentsRequired,
        to: S::ImportClearance,
        actor: A::Agency,
        gates: &[CycleSatisfied],
    },
    TransitionRule {
        from: S::ImportClearance,
        to: S::ImportApproved,
        actor: A::Agency,
        gates: &[DocumentsSatisfied],
    },
    TransitionRule {
        from: S::ImportApproved,
        to: S::DutyPaymentSuccessful,
        actor: A::DutyPayer,
        gates: &[
            PaymentWindowOpen(PaymentKind::Duty),
            PaymentConfirmed(PaymentKind::Duty),
        ],
    },
    TransitionRule {
        from: S::ImportApproved,
        to: S::Aborted,
        actor: A::AgencyOrSystem,
        gates: &[PaymentWindowExpired(PaymentKind::Duty)],
    },
    TransitionRule {
        from: S::DutyPaymentSuccessful,
        to: S::Delivered,
        actor: A::Agency,
        gates: &[],
    },
    TransitionRule {
        from: S::ImportClearance,
        to: S::ReturnRequested,
        actor: A::Sender,
        gates: &[],
    },
    TransitionRule {
        from: S::ReturnRequested,
        to: S::ReturnChargesPaid,
        actor: A::Sender,
        gates: &[ChargesAssessed, PaymentConfirmed(PaymentKind::ReturnCharges)],
    },
    TransitionRule {
        from: S::ReturnChargesPaid,
        to: S::Returned,
        actor: A::Agency,
        gates: &[],
    },
    TransitionRule {
        from: S::ImportClearance,
        to: S::DestructionRequested,
        actor: A::Sender,
        gates: &[],
    },
    TransitionRule {
        from: S::DestructionRequested,
        to: S::DestructionChargesPaid,
        actor: A::Sender,
        gates: &[
            ChargesAssessed,
            PaymentConfirmed(PaymentKind::DestructionCharges),
        ],
    },
    TransitionRule {
        from: S::DestructionChargesPaid,
        to: S::Destroyed,
        actor: A::Agency,
        gates: &[],
    },
];

/// The rule for `from → to`, if the edge exists.
pub fn rule_for(from: ShipmentStatus, to: ShipmentStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|r| r.from == from && r.to == to)
}
