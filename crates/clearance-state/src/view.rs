//! # Shipment View
//!
//! Read model: the aggregate as the caller may see it, plus facts derived
//! from the clock. Deriving a view never writes, so an overdue window shows
//! `abort_due: true` until something enforces it.

use clearance_core::{Role, Session, Timestamp};
use serde::Serialize;

use crate::documents::DocumentRequirement;
use crate::error::ClearanceError;
use crate::pricing::{PaymentWindow, Pricing};
use crate::shipment::Shipment;
use crate::status::ShipmentStatus;

/// A shipment with its derived facts.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentView {
    /// The aggregate, with the event log filtered for the caller.
    pub shipment: Shipment,
    /// Human-readable status.
    pub status_label: &'static str,
    /// The escalating payment currently due, if any.
    pub payment_window: Option<PaymentWindow>,
    /// The open window has passed its cutoff.
    pub abort_due: bool,
    /// Requirements still lacking a submission.
    pub outstanding_documents: Vec<DocumentRequirement>,
    /// Statuses the caller's role could request next.
    pub next_statuses: Vec<ShipmentStatus>,
    /// Clock reading the facts were derived at.
    pub as_of: Timestamp,
}

/// Derive the view of `shipment` for `session` at `now`.
pub fn derive_view(
    shipment: &Shipment,
    session: &Session,
    pricing: &Pricing<'_>,
    now: Timestamp,
) -> Result<ShipmentView, ClearanceError> {
    let payment_window = pricing.open_window(shipment, now)?;
    let abort_due = payment_window
        .as_ref()
        .is_some_and(|w| w.assessment.is_cancelled());
    let next_statuses = shipment
        .status
        .outgoing()
        .filter(|rule| rule.actor.permits(session.role, shipment.duty_mode))
        .map(|rule| rule.to)
        .collect();

    let mut visible = shipment.clone();
    visible.events = shipment.timeline_for(session.role);
    if session.role == Role::Receiver {
        visible.owner_account = String::new();
    }

    Ok(ShipmentView {
        status_label: shipment.status.label(),
        outstanding_documents: shipment.documents.outstanding().into_iter().cloned().collect(),
        shipment: visible,
        payment_window,
        abort_due,
        next_statuses,
        as_of: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::shipment::fixtures::draft;
    use clearance_core::{DutyMode, ShipmentId};
    use clearance_fees::StaticRateTable;

    fn day(n: i64) -> Timestamp {
        Timestamp::parse("2026-06-01T00:00:00Z").unwrap().plus_days(n)
    }

    #[test]
    fn overdue_window_flags_abort_without_writing() {
        let config = EngineConfig::default();
        let rates = StaticRateTable::default();
        let pricing = Pricing::new(&config, &rates);
        let mut s = Shipment::new(ShipmentId(3), "acct-1", draft(DutyMode::Ddp), day(0));
        s.status = ShipmentStatus::DocumentApproved;

        let view = derive_view(&s, &Session::agency("o-1"), &pricing, day(95)).unwrap();
        assert!(view.abort_due);
        assert_eq!(view.shipment.status, ShipmentStatus::DocumentApproved);
        assert!(view.next_statuses.contains(&ShipmentStatus::Aborted));

        let view = derive_view(&s, &Session::sender("acct-1"), &pricing, day(10)).unwrap();
        assert!(!view.abort_due);
        assert_eq!(view.next_statuses, vec![ShipmentStatus::PaymentSuccessful]);
    }

    #[test]
    fn receiver_view_is_trimmed() {
        let config = EngineConfig::default();
        let rates = StaticRateTable::default();
        let pricing = Pricing::new(&config, &rates);
        let s = Shipment::new(ShipmentId(3), "acct-1", draft(DutyMode::Dap), day(0));
        let view = derive_view(&s, &Session::receiver("buyer@kline.example"), &pricing, day(1))
            .unwrap();
        assert!(view.shipment.events.is_empty());
        assert!(view.shipment.owner_account.is_empty());
        assert!(view.next_statuses.is_empty());
        assert_eq!(view.status_label, "Created");
    }
}
