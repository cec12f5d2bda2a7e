//! Engine errors.

use clearance_core::{ShipmentId, ValidationError};
use clearance_fees::FeeError;
use clearance_ports::PortError;
use thiserror::Error;

use crate::documents::DocumentError;
use crate::payment::PaymentError;
use crate::status::ShipmentStatus;

/// Everything a clearance operation can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClearanceError {
    /// The caller's role or party binding does not permit the operation.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Why access was refused.
        reason: String,
    },

    /// A gate is not satisfied.
    #[error("precondition not met: {missing}")]
    PreconditionNotMet {
        /// The missing item.
        missing: String,
    },

    /// Another write committed first. Re-read and retry.
    #[error("shipment {id} was modified concurrently (expected version {expected})")]
    StaleState {
        /// Shipment id.
        id: ShipmentId,
        /// Version the caller read.
        expected: u64,
    },

    /// The payment window closed; the shipment has been aborted.
    #[error("payment window closed after {days_elapsed} days; shipment aborted")]
    Cancelled {
        /// Elapsed days when the window was found closed.
        days_elapsed: i64,
    },

    /// The gateway signature did not verify.
    #[error("payment gateway signature verification failed")]
    GatewayVerificationFailed,

    /// The lifecycle graph has no such edge.
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: ShipmentStatus,
        /// Requested status.
        to: ShipmentStatus,
    },

    /// The shipment is in a terminal status.
    #[error("shipment is in terminal status {status}")]
    Terminal {
        /// The terminal status.
        status: ShipmentStatus,
    },

    /// No shipment with this id.
    #[error("shipment {id} not found")]
    NotFound {
        /// Requested id.
        id: ShipmentId,
    },

    /// Charges can be entered once.
    #[error("charges were already assessed for shipment {id}")]
    ChargesAlreadyAssessed {
        /// Shipment id.
        id: ShipmentId,
    },

    /// Document resolver failure.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Payment ledger failure.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Fee arithmetic failure.
    #[error(transparent)]
    Fee(#[from] FeeError),

    /// External collaborator failure.
    #[error(transparent)]
    Port(#[from] PortError),
}

impl ClearanceError {
    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::PreconditionNotMet {
            missing: what.into(),
        }
    }

    /// Whether the caller should re-read and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleState { .. })
    }
}
