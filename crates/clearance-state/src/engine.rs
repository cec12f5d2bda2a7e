//! # Clearance Engine
//!
//! The orchestrator. Every mutation follows the same shape:
//!
//! 1. Load the aggregate and remember its version.
//! 2. Check the caller's role and party binding.
//! 3. Check and apply gates on a copy.
//! 4. Commit the copy conditioned on the remembered version.
//! 5. Notify parties and publish a change event.
//!
//! Step 4 fails with `StaleState` when another writer got there first; the
//! engine re-runs steps 1–4 once before surfacing it. Notification and
//! publishing happen after the commit and never fail the operation.
//!
//! Transitions are split into [`ClearanceEngine::prepare_transition`] and
//! [`ClearanceEngine::commit`] so callers can observe the race directly.

use std::sync::Arc;

use clearance_core::{
    Clock, DocumentName, DocumentParty, Party, Role, Session, ShipmentId, Timestamp,
};
use clearance_fees::{ChargeKind, ChargeLine, ChargeSheet, DutyAssessment, FeeAssessment, RateTable};
use clearance_ports::{
    ChangeBus, ChangeEvent, ChangeKind, ChangeTable, DocumentReference, DocumentStore,
    GatewayOrder, Notifier, PaymentGateway, SignedUrl,
};
use serde::{Deserialize, Serialize};

use crate::catalog::DocumentCatalog;
use crate::config::EngineConfig;
use crate::documents::{DocumentError, DocumentRequest, DocumentSubmission};
use crate::error::ClearanceError;
use crate::payment::{ConfirmOutcome, GatewayCallback, PaymentError, PaymentKind, PaymentOrder};
use crate::pricing::Pricing;
use crate::repository::ShipmentRepository;
use crate::shipment::{ChargeAssessment, Classification, Shipment, ShipmentDraft, StatusEvent};
use crate::status::ShipmentStatus;
use crate::transition::{rule_for, Gate, TransitionRule};
use crate::view::{derive_view, ShipmentView};

// ─── Inputs and outputs ──────────────────────────────────────────────

/// Evidence accompanying a transition request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionEvidence {
    /// Free-text reason, recorded on the event.
    pub reason: Option<String>,
    /// New classification for HS approval or correction.
    pub classification: Option<Classification>,
    /// Requirement batch for entering an additional-documents hold.
    pub document_requests: Vec<DocumentRequest>,
    /// Gateway callback for payment-gated transitions.
    pub payment: Option<GatewayCallback>,
}

impl TransitionEvidence {
    /// Evidence carrying only a reason.
    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Attach a gateway callback.
    pub fn with_payment(mut self, callback: GatewayCallback) -> Self {
        self.payment = Some(callback);
        self
    }

    /// Attach a classification.
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Attach a requirement batch.
    pub fn with_documents(mut self, requests: Vec<DocumentRequest>) -> Self {
        self.document_requests = requests;
        self
    }

    fn trimmed_reason(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

/// A validated transition awaiting commit.
#[derive(Debug, Clone)]
pub struct PreparedTransition {
    expected_version: u64,
    shipment: Shipment,
    from: ShipmentStatus,
    to: ShipmentStatus,
    actor: Session,
    payment_recorded: bool,
}

impl PreparedTransition {
    /// Version the commit is conditioned on.
    pub fn expected_version(&self) -> u64 {
        self.expected_version
    }

    /// Source status.
    pub fn from(&self) -> ShipmentStatus {
        self.from
    }

    /// Target status.
    pub fn to(&self) -> ShipmentStatus {
        self.to
    }

    /// The aggregate as it will be committed.
    pub fn shipment(&self) -> &Shipment {
        &self.shipment
    }
}

/// A checkout opened with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkout {
    /// The order as stored on the shipment.
    pub order: PaymentOrder,
    /// What the client needs to start checkout.
    pub gateway_order: GatewayOrder,
}

/// The external collaborators the engine drives.
#[derive(Clone)]
pub struct EnginePorts {
    /// Document object storage.
    pub documents: Arc<dyn DocumentStore>,
    /// Payment gateway.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Party notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Change feed.
    pub changes: Arc<dyn ChangeBus>,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// The shipment lifecycle engine.
pub struct ClearanceEngine {
    config: EngineConfig,
    repo: Arc<dyn ShipmentRepository>,
    ports: EnginePorts,
    clock: Arc<dyn Clock>,
    catalog: Arc<dyn DocumentCatalog>,
    rates: Arc<dyn RateTable>,
}

impl std::fmt::Debug for ClearanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClearanceEngine")
            .field("config", &self.config)
            .field("gateway", &self.ports.gateway.gateway_name())
            .field("documents", &self.ports.documents.store_name())
            .field("notifier", &self.ports.notifier.notifier_name())
            .finish()
    }
}

impl ClearanceEngine {
    /// Build an engine. Catalog and rates come from `config` unless
    /// overridden.
    pub fn new(
        config: EngineConfig,
        repo: Arc<dyn ShipmentRepository>,
        ports: EnginePorts,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = Arc::new(config.catalog.clone());
        let rates = Arc::new(config.rates.clone());
        Self {
            config,
            repo,
            ports,
            clock,
            catalog,
            rates,
        }
    }

    /// Use a different document catalog.
    pub fn with_catalog(mut self, catalog: Arc<dyn DocumentCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Use a different rate table.
    pub fn with_rates(mut self, rates: Arc<dyn RateTable>) -> Self {
        self.rates = rates;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying repository.
    pub fn repository(&self) -> &Arc<dyn ShipmentRepository> {
        &self.repo
    }

    /// Current time as the engine sees it.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn pricing(&self) -> Pricing<'_> {
        Pricing::new(&self.config, self.rates.as_ref())
    }

    fn load(&self, id: ShipmentId) -> Result<Shipment, ClearanceError> {
        self.repo.get(id).ok_or(ClearanceError::NotFound { id })
    }

    fn load_visible(&self, session: &Session, id: ShipmentId) -> Result<Shipment, ClearanceError> {
        let shipment = self.load(id)?;
        if !shipment.is_visible_to(session) {
            return Err(ClearanceError::unauthorized(format!(
                "{session} is not a party to shipment {id}"
            )));
        }
        Ok(shipment)
    }

    fn require_agency(session: &Session, action: &str) -> Result<(), ClearanceError> {
        if session.role != Role::Agency {
            return Err(ClearanceError::unauthorized(format!(
                "only the agency may {action}"
            )));
        }
        Ok(())
    }

    fn authorize(
        session: &Session,
        shipment: &Shipment,
        rule: &TransitionRule,
    ) -> Result<(), ClearanceError> {
        if !shipment.is_visible_to(session) {
            return Err(ClearanceError::unauthorized(format!(
                "{session} is not a party to shipment {}",
                shipment.id
            )));
        }
        if !rule.actor.permits(session.role, shipment.duty_mode) {
            return Err(ClearanceError::unauthorized(format!(
                "{} cannot move {} -> {}; requires {}",
                session.role,
                rule.from,
                rule.to,
                rule.actor.describe()
            )));
        }
        Ok(())
    }

    fn with_retry<T>(
        &self,
        id: ShipmentId,
        mut op: impl FnMut() -> Result<T, ClearanceError>,
    ) -> Result<T, ClearanceError> {
        match op() {
            Err(err) if err.is_retryable() => {
                tracing::debug!(shipment_id = %id, "stale write, retrying once");
                op()
            }
            other => other,
        }
    }

    /// Apply a non-transition change under the version check.
    fn mutate<T>(
        &self,
        session: &Session,
        id: ShipmentId,
        table: ChangeTable,
        event: ChangeKind,
        mut change: impl FnMut(&mut Shipment, Timestamp) -> Result<T, ClearanceError>,
    ) -> Result<(Shipment, T), ClearanceError> {
        self.with_retry(id, || {
            let current = self.load_visible(session, id)?;
            if current.status.is_terminal() {
                return Err(ClearanceError::Terminal {
                    status: current.status,
                });
            }
            let now = self.clock.now();
            let mut next = current.clone();
            let out = change(&mut next, now)?;
            next.version = current.version + 1;
            next.updated_at = now;
            self.repo.compare_and_swap(current.version, next.clone())?;
            self.publish(&next, table, event);
            Ok((next, out))
        })
    }

    // ─── Booking and reads ───────────────────────────────────────────

    /// Book a shipment. Senders only.
    pub fn create_shipment(
        &self,
        session: &Session,
        draft: ShipmentDraft,
    ) -> Result<Shipment, ClearanceError> {
        if session.role != Role::Sender {
            return Err(ClearanceError::unauthorized("only senders may book shipments"));
        }
        draft.validate()?;
        let now = self.clock.now();
        let shipment = Shipment::new(self.repo.next_id(), &session.subject, draft, now);
        self.repo.insert(shipment.clone())?;
        tracing::info!(shipment_id = %shipment.id, owner = %session.subject, "shipment created");
        self.notify(&shipment, ShipmentStatus::Created);
        self.publish(&shipment, ChangeTable::Shipments, ChangeKind::Insert);
        Ok(shipment)
    }

    /// Current snapshot, with the event log filtered for the caller.
    pub fn get(&self, session: &Session, id: ShipmentId) -> Result<Shipment, ClearanceError> {
        let mut shipment = self.load_visible(session, id)?;
        shipment.events = shipment.timeline_for(session.role);
        Ok(shipment)
    }

    /// Every shipment the caller may see.
    pub fn list(&self, session: &Session) -> Vec<Shipment> {
        self.repo
            .list()
            .into_iter()
            .filter(|s| s.is_visible_to(session))
            .map(|mut s| {
                s.events = s.timeline_for(session.role);
                s
            })
            .collect()
    }

    /// Snapshot plus clock-derived facts. Never writes.
    pub fn view(&self, session: &Session, id: ShipmentId) -> Result<ShipmentView, ClearanceError> {
        let shipment = self.load_visible(session, id)?;
        derive_view(&shipment, session, &self.pricing(), self.clock.now())
    }

    /// Status history visible to the caller.
    pub fn timeline(
        &self,
        session: &Session,
        id: ShipmentId,
    ) -> Result<Vec<StatusEvent>, ClearanceError> {
        Ok(self.load_visible(session, id)?.timeline_for(session.role))
    }

    // ─── Transitions ─────────────────────────────────────────────────

    /// Validate a transition and build the aggregate to commit.
    pub fn prepare_transition(
        &self,
        session: &Session,
        id: ShipmentId,
        to: ShipmentStatus,
        evidence: &TransitionEvidence,
    ) -> Result<PreparedTransition, ClearanceError> {
        let current = self.load(id)?;
        let from = current.status;
        if from.is_terminal() {
            return Err(ClearanceError::Terminal { status: from });
        }
        let rule = rule_for(from, to).ok_or(ClearanceError::InvalidTransition { from, to })?;
        Self::authorize(session, &current, rule)?;

        let now = self.clock.now();
        let mut next = current.clone();
        let mut payment_recorded = false;
        for gate in rule.gates {
            payment_recorded |= self.apply_gate(*gate, rule, &mut next, evidence, now)?;
        }
        next.record_transition(to, session.role, evidence.trimmed_reason(), now);
        next.version = current.version + 1;
        next.updated_at = now;

        Ok(PreparedTransition {
            expected_version: current.version,
            shipment: next,
            from,
            to,
            actor: session.clone(),
            payment_recorded,
        })
    }

    /// Check one gate, applying its effect to `next`. Returns whether a
    /// payment record was written.
    fn apply_gate(
        &self,
        gate: Gate,
        rule: &TransitionRule,
        next: &mut Shipment,
        evidence: &TransitionEvidence,
        now: Timestamp,
    ) -> Result<bool, ClearanceError> {
        match gate {
            Gate::SenderDocumentsSatisfied => {
                if !next.documents.is_satisfied(DocumentParty::Sender) {
                    let names: Vec<&str> = next
                        .documents
                        .outstanding()
                        .into_iter()
                        .filter(|r| r.requested_for == DocumentParty::Sender)
                        .map(|r| r.name.as_str())
                        .collect();
                    return Err(ClearanceError::missing(format!(
                        "sender documents: {}",
                        names.join(", ")
                    )));
                }
            }
            Gate::DocumentsSatisfied => {
                if !next.documents.all_satisfied() {
                    return Err(ClearanceError::missing(format!(
                        "documents: {}",
                        next.documents.outstanding_names()
                    )));
                }
            }
            Gate::CycleSatisfied => {
                if !next.documents.cycle_satisfied() {
                    let outstanding = next.documents.outstanding_names();
                    return Err(ClearanceError::missing(if outstanding.is_empty() {
                        "document requirements for the current hold".to_string()
                    } else {
                        format!("documents: {outstanding}")
                    }));
                }
                next.hold_reason = None;
            }
            Gate::OpensInitialCycle => {
                if let Some(classification) = &evidence.classification {
                    next.classification = classification.clone();
                }
                let mut requests = self
                    .catalog
                    .documents_for(&next.classification.destination_hs_code);
                for extra in &evidence.document_requests {
                    requests.retain(|r| r.name != extra.name);
                    requests.push(extra.clone());
                }
                next.documents.open_cycle(rule.to, now);
                if !requests.is_empty() {
                    next.documents.create_requirements(requests, now)?;
                }
            }
            Gate::OpensDocumentCycle => {
                next.documents.open_cycle(rule.to, now);
                next.hold_reason = evidence.trimmed_reason();
                if !evidence.document_requests.is_empty() {
                    next.documents
                        .create_requirements(evidence.document_requests.clone(), now)?;
                }
            }
            Gate::ClassificationChange => match &evidence.classification {
                Some(c) if *c != next.classification => next.classification = c.clone(),
                _ => {
                    return Err(ClearanceError::missing(
                        "a classification differing from the current one",
                    ))
                }
            },
            Gate::PaymentWindowOpen(kind) => {
                if let FeeAssessment::Cancelled { days_elapsed } =
                    self.pricing().assess(next, kind, now)?
                {
                    return Err(ClearanceError::Cancelled { days_elapsed });
                }
            }
            Gate::PaymentConfirmed(kind) => {
                if next.payments.is_confirmed(kind) {
                    return Ok(false);
                }
                let Some(callback) = &evidence.payment else {
                    return Err(ClearanceError::missing(format!("confirmed {kind} payment")));
                };
                if !self.ports.gateway.verify(
                    &callback.order_id,
                    &callback.payment_id,
                    &callback.signature,
                ) {
                    tracing::warn!(
                        shipment_id = %next.id,
                        order_id = %callback.order_id,
                        "gateway signature rejected"
                    );
                    return Err(ClearanceError::GatewayVerificationFailed);
                }
                let outcome = next.payments.confirm(kind, callback, now)?;
                return Ok(outcome == ConfirmOutcome::Recorded);
            }
            Gate::ChargesAssessed => {
                if next.charges.is_none() {
                    return Err(ClearanceError::missing("assessed charges"));
                }
            }
            Gate::PaymentWindowExpired(kind) => {
                if let FeeAssessment::Payable { days_elapsed, .. } =
                    self.pricing().assess(next, kind, now)?
                {
                    return Err(ClearanceError::missing(format!(
                        "expired {kind} payment window ({days_elapsed} days elapsed)"
                    )));
                }
            }
        }
        Ok(false)
    }

    /// Commit a prepared transition if nothing else was committed since.
    pub fn commit(&self, prepared: PreparedTransition) -> Result<Shipment, ClearanceError> {
        let PreparedTransition {
            expected_version,
            shipment,
            from,
            to,
            actor,
            payment_recorded,
        } = prepared;
        self.repo.compare_and_swap(expected_version, shipment.clone())?;
        tracing::info!(
            shipment_id = %shipment.id,
            %from,
            %to,
            actor = %actor,
            version = shipment.version,
            "transition committed"
        );
        if payment_recorded {
            self.publish(&shipment, ChangeTable::Payments, ChangeKind::Insert);
        }
        self.publish(&shipment, ChangeTable::Shipments, ChangeKind::Update);
        self.notify(&shipment, to);
        Ok(shipment)
    }

    /// Move a shipment to `to`. Retries a stale write once. A closed
    /// payment window aborts the shipment and returns `Cancelled`.
    pub fn request_transition(
        &self,
        session: &Session,
        id: ShipmentId,
        to: ShipmentStatus,
        evidence: TransitionEvidence,
    ) -> Result<Shipment, ClearanceError> {
        let result = self.with_retry(id, || {
            let prepared = self.prepare_transition(session, id, to, &evidence)?;
            self.commit(prepared)
        });
        self.settle(session, id, to, result)
    }

    fn settle<T>(
        &self,
        session: &Session,
        id: ShipmentId,
        to: ShipmentStatus,
        result: Result<T, ClearanceError>,
    ) -> Result<T, ClearanceError> {
        match result {
            Err(ClearanceError::Cancelled { days_elapsed }) => {
                self.abort_cancelled(id, days_elapsed);
                Err(ClearanceError::Cancelled { days_elapsed })
            }
            Err(err) => {
                tracing::warn!(shipment_id = %id, target = %to, caller = %session, error = %err, "request rejected");
                Err(err)
            }
            ok => ok,
        }
    }

    fn abort_cancelled(&self, id: ShipmentId, days_elapsed: i64) {
        let evidence =
            TransitionEvidence::reason(format!("payment window closed after {days_elapsed} days"));
        let system = Session::system();
        let result = self.with_retry(id, || {
            let prepared =
                self.prepare_transition(&system, id, ShipmentStatus::Aborted, &evidence)?;
            self.commit(prepared)
        });
        if let Err(err) = result {
            tracing::warn!(shipment_id = %id, error = %err, "could not abort expired shipment");
        }
    }

    // ─── Payments ────────────────────────────────────────────────────

    /// Open a checkout for the payment due in the current status.
    pub fn create_payment_order(
        &self,
        session: &Session,
        id: ShipmentId,
        kind: PaymentKind,
    ) -> Result<Checkout, ClearanceError> {
        let (from, to) = kind.settles();
        let result = self.with_retry(id, || {
            let current = self.load_visible(session, id)?;
            if current.status.is_terminal() {
                return Err(ClearanceError::Terminal {
                    status: current.status,
                });
            }
            if current.status != from {
                return Err(PaymentError::NotDue {
                    kind,
                    status: current.status,
                }
                .into());
            }
            let rule = rule_for(from, to).ok_or(ClearanceError::InvalidTransition { from, to })?;
            Self::authorize(session, &current, rule)?;
            if current.payments.is_confirmed(kind) {
                return Err(PaymentError::DuplicatePayment { kind }.into());
            }

            let now = self.clock.now();
            let (days_elapsed, base, fine, total) = match self.pricing().assess(&current, kind, now)? {
                FeeAssessment::Cancelled { days_elapsed } => {
                    return Err(ClearanceError::Cancelled { days_elapsed })
                }
                FeeAssessment::Payable {
                    days_elapsed,
                    base,
                    fine,
                    total,
                } => (days_elapsed, base, fine, total),
            };
            let gateway_order = self.ports.gateway.create_order(total, id, kind.as_str())?;
            let order = PaymentOrder {
                order_id: gateway_order.order_id.clone(),
                kind,
                base,
                fine,
                total,
                days_elapsed,
                created_at: now,
            };

            let mut next = current.clone();
            next.payments.add_order(order.clone());
            next.version = current.version + 1;
            next.updated_at = now;
            self.repo.compare_and_swap(current.version, next.clone())?;
            tracing::info!(shipment_id = %id, %kind, order_id = %order.order_id, total = %total, "payment order created");
            self.publish(&next, ChangeTable::Payments, ChangeKind::Insert);
            Ok(Checkout {
                order,
                gateway_order,
            })
        });
        self.settle(session, id, to, result)
    }

    /// Verify a gateway callback and take the transition it pays for.
    ///
    /// Replaying an already-confirmed callback returns the current state.
    pub fn confirm_payment(
        &self,
        session: &Session,
        id: ShipmentId,
        callback: GatewayCallback,
    ) -> Result<Shipment, ClearanceError> {
        let current = self.load_visible(session, id)?;
        let order = current
            .payments
            .order(&callback.order_id)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownOrder {
                order_id: callback.order_id.clone(),
            })?;
        if let Some(record) = current.payments.record_for(order.kind) {
            if record.order_id != callback.order_id || record.payment_id != callback.payment_id {
                return Err(PaymentError::DuplicatePayment { kind: order.kind }.into());
            }
            if !self.ports.gateway.verify(
                &callback.order_id,
                &callback.payment_id,
                &callback.signature,
            ) {
                return Err(ClearanceError::GatewayVerificationFailed);
            }
            tracing::debug!(shipment_id = %id, kind = %order.kind, "payment already confirmed");
            return self.get(session, id);
        }
        let (_, to) = order.kind.settles();
        let result = self.request_transition(
            session,
            id,
            to,
            TransitionEvidence::default().with_payment(callback.clone()),
        );
        match result {
            Err(ClearanceError::InvalidTransition { .. } | ClearanceError::StaleState { .. })
                if self.confirmed_by(id, order.kind, &callback) =>
            {
                tracing::debug!(shipment_id = %id, kind = %order.kind, "concurrent replay of a confirmed payment");
                self.get(session, id)
            }
            other => other,
        }
    }

    /// Whether the stored record for `kind` is the payment in `callback`.
    fn confirmed_by(&self, id: ShipmentId, kind: PaymentKind, callback: &GatewayCallback) -> bool {
        self.repo.get(id).is_some_and(|s| {
            s.payments.record_for(kind).is_some_and(|r| {
                r.order_id == callback.order_id && r.payment_id == callback.payment_id
            })
        })
    }

    /// Enter the return or destruction charge sheet. Agency only, once.
    pub fn assess_charges(
        &self,
        session: &Session,
        id: ShipmentId,
        lines: Vec<ChargeLine>,
    ) -> Result<Shipment, ClearanceError> {
        Self::require_agency(session, "assess charges")?;
        let (shipment, _) = self.mutate(
            session,
            id,
            ChangeTable::Payments,
            ChangeKind::Update,
            |next, now| {
                let kind = match next.status {
                    ShipmentStatus::ReturnRequested => ChargeKind::Return,
                    ShipmentStatus::DestructionRequested => ChargeKind::Destruction,
                    other => {
                        return Err(ClearanceError::missing(format!(
                            "a return or destruction request (status is {other})"
                        )))
                    }
                };
                if next.charges.is_some() {
                    return Err(ClearanceError::ChargesAlreadyAssessed { id });
                }
                let sheet = ChargeSheet::new(kind, lines.clone())?;
                tracing::info!(shipment_id = %id, %kind, total = %sheet.total(), "charges assessed");
                next.charges = Some(ChargeAssessment {
                    sheet,
                    assessed_at: now,
                    assessed_by: session.subject.clone(),
                });
                Ok(())
            },
        )?;
        let message = format!(
            "Shipment #{id}: {} charges assessed",
            shipment.status.label()
        );
        self.send(shipment.sender.email.as_str(), id, &message);
        Ok(shipment)
    }

    // ─── Documents ───────────────────────────────────────────────────

    /// Add the requirement batch for the current additional-documents hold.
    pub fn create_requirements(
        &self,
        session: &Session,
        id: ShipmentId,
        requests: Vec<DocumentRequest>,
    ) -> Result<Shipment, ClearanceError> {
        Self::require_agency(session, "request documents")?;
        let (shipment, _) = self.mutate(
            session,
            id,
            ChangeTable::Documents,
            ChangeKind::Insert,
            |next, now| {
                let open = next
                    .documents
                    .current_cycle()
                    .is_some_and(|c| c.opened_in == next.status);
                if !next.status.is_document_gate() || !open {
                    return Err(ClearanceError::missing("an open additional-documents hold"));
                }
                next.documents.create_requirements(requests.clone(), now)?;
                Ok(())
            },
        )?;
        for party in [DocumentParty::Sender, DocumentParty::Receiver] {
            let names: Vec<&str> = requests
                .iter()
                .filter(|r| r.requested_for == party)
                .map(|r| r.name.as_str())
                .collect();
            if names.is_empty() {
                continue;
            }
            let to = match party {
                DocumentParty::Sender => shipment.sender.email.as_str(),
                DocumentParty::Receiver => shipment.receiver.email.as_str(),
            };
            let message = format!("Shipment #{id}: please upload {}", names.join(", "));
            self.send(to, id, &message);
        }
        Ok(shipment)
    }

    /// Upload a document against an open requirement.
    pub fn submit_document(
        &self,
        session: &Session,
        id: ShipmentId,
        name: &str,
        bytes: &[u8],
    ) -> Result<DocumentSubmission, ClearanceError> {
        let name = DocumentName::new(name)?;
        let party = DocumentParty::for_role(session.role).ok_or_else(|| {
            ClearanceError::unauthorized("only senders and receivers upload documents")
        })?;
        let current = self.load_visible(session, id)?;
        current.documents.check_submit(current.status, party, &name)?;
        let reference = self.ports.documents.put_document(id, &name, bytes)?;

        let result = self.mutate(
            session,
            id,
            ChangeTable::Documents,
            ChangeKind::Insert,
            |next, now| {
                let status = next.status;
                let submission = next
                    .documents
                    .submit(status, party, &name, reference.clone(), &session.subject, now)?
                    .clone();
                Ok(submission)
            },
        );
        let submission = match result {
            Ok((_, submission)) => submission,
            Err(err) => {
                self.discard_object(id, &reference);
                return Err(err);
            }
        };
        tracing::info!(shipment_id = %id, document = %name, %party, "document submitted");
        Ok(submission)
    }

    /// Withdraw a submission while its hold is still open.
    pub fn withdraw_document(
        &self,
        session: &Session,
        id: ShipmentId,
        name: &str,
    ) -> Result<Shipment, ClearanceError> {
        let name = DocumentName::new(name)?;
        let party = match session.role {
            Role::Agency => None,
            Role::Sender | Role::Receiver => DocumentParty::for_role(session.role),
            Role::System => {
                return Err(ClearanceError::unauthorized(
                    "the scheduler does not withdraw documents",
                ))
            }
        };
        let (shipment, removed) = self.mutate(
            session,
            id,
            ChangeTable::Documents,
            ChangeKind::Delete,
            |next, _| {
                let status = next.status;
                Ok(next.documents.withdraw(status, party, &name)?)
            },
        )?;
        self.discard_object(id, &removed.reference);
        tracing::info!(shipment_id = %id, document = %name, "document withdrawn");
        Ok(shipment)
    }

    fn discard_object(&self, id: ShipmentId, reference: &DocumentReference) {
        if let Err(err) = self.ports.documents.delete_document(reference) {
            tracing::warn!(shipment_id = %id, %reference, error = %err, "stored object not deleted");
        }
    }

    /// Signed URL for the latest submission named `name`.
    pub fn document_url(
        &self,
        session: &Session,
        id: ShipmentId,
        name: &str,
    ) -> Result<SignedUrl, ClearanceError> {
        let name = DocumentName::new(name)?;
        let shipment = self.load_visible(session, id)?;
        let submission =
            shipment
                .documents
                .latest_submission(&name)
                .ok_or_else(|| DocumentError::NotSubmitted {
                    name: name.as_str().to_string(),
                })?;
        Ok(self.ports.documents.get_document(&submission.reference)?)
    }

    // ─── Corrections ─────────────────────────────────────────────────

    /// Correct sender or receiver details. Agency only, before a terminal
    /// status.
    pub fn correct_parties(
        &self,
        session: &Session,
        id: ShipmentId,
        sender: Option<Party>,
        receiver: Option<Party>,
    ) -> Result<Shipment, ClearanceError> {
        Self::require_agency(session, "correct party details")?;
        if let Some(p) = &sender {
            p.validate()?;
        }
        if let Some(p) = &receiver {
            p.validate()?;
        }
        let (shipment, _) = self.mutate(
            session,
            id,
            ChangeTable::Shipments,
            ChangeKind::Update,
            |next, _| {
                if let Some(p) = &sender {
                    next.sender = p.clone();
                }
                if let Some(p) = &receiver {
                    next.receiver = p.clone();
                }
                Ok(())
            },
        )?;
        tracing::info!(shipment_id = %id, officer = %session.subject, "party details corrected");
        Ok(shipment)
    }

    // ─── Quotes ──────────────────────────────────────────────────────

    /// Shipping cost as of now.
    pub fn quote_shipping(
        &self,
        session: &Session,
        id: ShipmentId,
    ) -> Result<FeeAssessment, ClearanceError> {
        let shipment = self.load_visible(session, id)?;
        self.pricing()
            .assess(&shipment, PaymentKind::Shipping, self.clock.now())
    }

    /// Duty and GST as of now.
    pub fn quote_duty(
        &self,
        session: &Session,
        id: ShipmentId,
    ) -> Result<DutyAssessment, ClearanceError> {
        let shipment = self.load_visible(session, id)?;
        self.pricing().duty_quote(&shipment, self.clock.now())
    }

    /// Assessed return or destruction charges, if any.
    pub fn quote_charges(
        &self,
        session: &Session,
        id: ShipmentId,
    ) -> Result<Option<ChargeSheet>, ClearanceError> {
        let shipment = self.load_visible(session, id)?;
        Ok(shipment.charges.map(|c| c.sheet))
    }

    // ─── Timeouts ────────────────────────────────────────────────────

    /// Abort the shipment if its payment window has closed.
    pub fn enforce_timeouts(&self, id: ShipmentId) -> Result<Option<Shipment>, ClearanceError> {
        let shipment = self.load(id)?;
        let Some(window) = self.pricing().open_window(&shipment, self.clock.now())? else {
            return Ok(None);
        };
        let FeeAssessment::Cancelled { days_elapsed } = window.assessment else {
            return Ok(None);
        };
        let evidence = TransitionEvidence::reason(format!(
            "{} payment window closed after {days_elapsed} days",
            window.kind
        ));
        self.request_transition(&Session::system(), id, ShipmentStatus::Aborted, evidence)
            .map(Some)
    }

    /// Sweep every live shipment. Returns the ids aborted.
    pub fn enforce_all_timeouts(&self) -> Vec<ShipmentId> {
        let mut aborted = Vec::new();
        for shipment in self.repo.list() {
            if shipment.status.is_terminal() {
                continue;
            }
            match self.enforce_timeouts(shipment.id) {
                Ok(Some(s)) => aborted.push(s.id),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(shipment_id = %shipment.id, error = %err, "timeout sweep failed")
                }
            }
        }
        if !aborted.is_empty() {
            tracing::info!(count = aborted.len(), "expired shipments aborted");
        }
        aborted
    }

    // ─── Side effects ────────────────────────────────────────────────

    fn send(&self, to: &str, id: ShipmentId, message: &str) {
        if !self.ports.notifier.notify(to, id, message) {
            tracing::warn!(shipment_id = %id, to, "notification failed");
        }
    }

    fn notify(&self, shipment: &Shipment, status: ShipmentStatus) {
        let mut message = format!("Shipment #{}: {}", shipment.id, status.label());
        if status.is_document_gate() {
            if let Some(reason) = &shipment.hold_reason {
                message.push_str(" - ");
                message.push_str(reason);
            }
        }
        if status == ShipmentStatus::ImportApproved {
            let schedule = &self.config.duty_fees;
            message.push_str(&format!(
                " - import duty is payable by the {} ({}); late fees accrue after {} days and the shipment is aborted after {} days",
                shipment.duty_mode.duty_payer(),
                shipment.duty_mode,
                schedule.grace_days,
                schedule.abort_days,
            ));
        }
        for to in shipment.recipients_for(status) {
            self.send(to, shipment.id, &message);
        }
    }

    fn publish(&self, shipment: &Shipment, table: ChangeTable, event: ChangeKind) {
        let row = match table {
            ChangeTable::Shipments => serde_json::to_value(ShipmentRow::from(shipment)),
            ChangeTable::Documents => serde_json::to_value(&shipment.documents),
            ChangeTable::Payments => serde_json::to_value(&shipment.payments),
        };
        match row {
            Ok(row) => self.ports.changes.publish(ChangeEvent {
                shipment_id: shipment.id,
                table,
                event,
                row,
                version: shipment.version,
            }),
            Err(err) => {
                tracing::error!(shipment_id = %shipment.id, error = %err, "change event not serializable")
            }
        }
    }
}

#[derive(Serialize)]
struct ShipmentRow<'a> {
    id: ShipmentId,
    status: ShipmentStatus,
    status_label: &'static str,
    version: u64,
    hold_reason: Option<&'a str>,
    updated_at: Timestamp,
}

impl<'a> From<&'a Shipment> for ShipmentRow<'a> {
    fn from(s: &'a Shipment) -> Self {
        Self {
            id: s.id,
            status: s.status,
            status_label: s.status.label(),
            version: s.version,
            hold_reason: s.hold_reason.as_deref(),
            updated_at: s.updated_at,
        }
    }
}
