//! # API Route Modules
//!
//! - `shipments`: booking, reads, party corrections, and the lifecycle graph.
//! - `transitions`: one `PUT .../status-*` endpoint per target status.
//! - `documents`: requirement batches, uploads, withdrawals, signed URLs.
//! - `payments`: checkout orders and gateway callback confirmation.
//! - `quotes`: shipping and duty quotes, return and destruction charges.
//! - `maintenance`: timeout sweeps and request counters.

pub mod documents;
pub mod maintenance;
pub mod payments;
pub mod quotes;
pub mod shipments;
pub mod transitions;
