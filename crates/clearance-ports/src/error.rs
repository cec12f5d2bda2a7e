//! Errors surfaced by port implementations.

use thiserror::Error;

/// Failure talking to an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The storage backend rejected or failed an operation.
    #[error("document storage failure: {reason}")]
    Storage {
        /// Description of the failure.
        reason: String,
    },

    /// No stored object exists for the reference.
    #[error("document not found: {reference}")]
    NotFound {
        /// The missing reference.
        reference: String,
    },

    /// The payment gateway rejected the request.
    #[error("payment gateway rejected request: {reason}")]
    Gateway {
        /// Description of the rejection.
        reason: String,
    },

    /// The port was constructed with unusable settings.
    #[error("port misconfigured: {reason}")]
    Configuration {
        /// What is wrong.
        reason: String,
    },
}
