//! # clearance-fees — Fee Computation
//!
//! Pure functions over [`Amount`](clearance_core::Amount) and elapsed time.
//! Nothing here reads a clock or touches storage; callers pass timestamps
//! in.
//!
//! - [`escalation`] — the late-payment calculator shared by shipping and
//!   duty payments: a grace period, a linear daily fine, and a hard
//!   cancellation cutoff.
//! - [`duty`] — duty and GST on a declared value, with a rate lookup seam.
//! - [`charges`] — flat itemized charges for return and destruction.
//! - [`shipping`] — base shipping cost from weight.

pub mod charges;
pub mod duty;
pub mod error;
pub mod escalation;
pub mod shipping;

pub use charges::{ChargeItem, ChargeKind, ChargeLine, ChargeSheet};
pub use duty::{compute_duty, DutyAssessment, DutyQuote, DutyRates, RateEntry, RateTable, StaticRateTable};
pub use error::FeeError;
pub use escalation::{
    FeeAssessment, FeeSchedule, DEFAULT_ABORT_DAYS, DEFAULT_FINE_RATE, DEFAULT_GRACE_DAYS,
};
pub use shipping::ShippingTariff;
