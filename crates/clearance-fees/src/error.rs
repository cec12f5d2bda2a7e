//! Errors raised by fee computation.

use clearance_core::Amount;
use thiserror::Error;

/// Fee computation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// A base amount was negative.
    #[error("base amount must not be negative, got {base}")]
    NegativeBase {
        /// The rejected base.
        base: Amount,
    },

    /// Arithmetic exceeded the representable range.
    #[error("fee arithmetic overflow while computing {what}")]
    Overflow {
        /// Which quantity overflowed.
        what: &'static str,
    },

    /// The fee schedule parameters are inconsistent.
    #[error("invalid fee schedule: {reason}")]
    InvalidSchedule {
        /// Why the schedule was rejected.
        reason: String,
    },

    /// An itemized charge sheet was rejected.
    #[error("invalid charge sheet: {reason}")]
    InvalidCharges {
        /// Why the sheet was rejected.
        reason: String,
    },

    /// A tariff parameter was rejected.
    #[error("invalid tariff: {reason}")]
    InvalidTariff {
        /// Why the tariff was rejected.
        reason: String,
    },
}
