//! # clearance-state — Shipment Lifecycle Engine
//!
//! A shipment moves through a fixed graph of statuses from booking to
//! delivery, return, destruction or abort. This crate owns that graph and
//! everything that gates it:
//!
//! - **Status graph** (`status.rs`, `transition.rs`): the closed status set
//!   and a table of legal edges, each naming the actor allowed to take it
//!   and the gates that must hold.
//!
//! - **Document resolver** (`documents.rs`, `catalog.rs`): requirement
//!   cycles per party, opened at HS approval and at each
//!   additional-documents hold.
//!
//! - **Payment ledger** (`payment.rs`, `pricing.rs`): checkout orders,
//!   verified records, and escalating fees with a cancellation cutoff.
//!
//! - **Aggregate** (`shipment.rs`, `repository.rs`): the shipment with its
//!   event log, committed under an optimistic version check.
//!
//! - **Engine** (`engine.rs`): authorizes, checks gates, commits, then
//!   notifies and publishes.
//!
//! - **Views** (`view.rs`): clock-derived facts such as the open payment
//!   window and whether an abort is due. Reading never writes.
//!
//! ## Concurrency
//!
//! Every mutation is read, validate, conditional write. Two writers racing
//! from the same version get one success and one `StaleState`.

pub mod catalog;
pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod payment;
pub mod pricing;
pub mod repository;
pub mod shipment;
pub mod status;
pub mod transition;
pub mod view;

// ─── Graph ──────────────────────────────────────────────────────────

pub use status::ShipmentStatus;
pub use transition::{rule_for, Gate, RequiredActor, TransitionRule, TRANSITIONS};

// ─── Aggregate ──────────────────────────────────────────────────────

pub use shipment::{
    ChargeAssessment, Classification, Dimensions, Goods, PhaseTimestamps, Shipment,
    ShipmentDraft, StatusEvent,
};
pub use repository::{InMemoryShipmentRepository, ShipmentRepository};

// ─── Documents and payments ─────────────────────────────────────────

pub use catalog::{CatalogEntry, DocumentCatalog, StaticDocumentCatalog};
pub use documents::{
    DocumentCycle, DocumentError, DocumentLedger, DocumentRequest, DocumentRequirement,
    DocumentSubmission,
};
pub use payment::{
    ConfirmOutcome, GatewayCallback, PaymentError, PaymentKind, PaymentLedger, PaymentOrder,
    PaymentRecord,
};
pub use pricing::{PaymentWindow, Pricing};

// ─── Engine ─────────────────────────────────────────────────────────

pub use config::{ConfigError, EngineConfig, PhaseAnchor, CONFIG_ENV};
pub use engine::{Checkout, ClearanceEngine, EnginePorts, PreparedTransition, TransitionEvidence};
pub use error::ClearanceError;
pub use view::{derive_view, ShipmentView};
