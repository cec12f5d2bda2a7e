//! # clearance-core — Foundational Types for the Clearance Stack
//!
//! Every other crate in the workspace depends on `clearance-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `ShipmentId`, `HsCode`,
//!    `DocumentName`, `EmailAddress` are validated at construction. No bare
//!    strings for identifiers.
//!
//! 2. **Integer money.** [`Amount`] carries minor units (paise) and
//!    [`RateBps`] carries basis points. No floating point touches a fee.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision;
//!    elapsed days are always `floor(delta / 86400s)`.
//!
//! 4. **Explicit identity.** Every engine call receives a [`Session`]
//!    naming the caller's [`Role`] and subject.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `clearance-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

#![deny(missing_docs)]

pub mod error;
pub mod identity;
pub mod money;
pub mod party;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{DocumentName, EmailAddress, HsCode, ShipmentId};
pub use money::{format_amount, parse_amount, Amount, RateBps, DEFAULT_CURRENCY};
pub use party::{Address, DocumentParty, DutyMode, Party, Role, Session};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp, SECONDS_PER_DAY};
