//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine errors to HTTP status codes with a JSON body
//! `{error: {code, message, details?}}`. Internal details never reach the
//! client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clearance_ports::PortError;
use clearance_state::{ClearanceError, DocumentError, PaymentError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::PersistenceError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "PRECONDITION_NOT_MET").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// A transition gate is not satisfied (422).
    #[error("precondition not met: {missing}")]
    PreconditionNotMet { missing: String },

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Role or party binding does not permit the operation (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The payment window closed and the shipment was aborted (410).
    #[error("payment window closed after {days_elapsed} days; shipment aborted")]
    Cancelled { days_elapsed: i64 },

    /// The gateway signature did not verify (402).
    #[error("payment verification failed: {0}")]
    PaymentRequired(String),

    /// An external collaborator failed (502).
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// Internal server error (500). Logged, not returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code.
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::PreconditionNotMet { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PRECONDITION_NOT_MET")
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Cancelled { .. } => (StatusCode::GONE, "CANCELLED"),
            Self::PaymentRequired(_) => (StatusCode::PAYMENT_REQUIRED, "GATEWAY_VERIFICATION_FAILED"),
            Self::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::PreconditionNotMet { missing } => Some(serde_json::json!({ "missing": missing })),
            Self::Cancelled { days_elapsed } => {
                Some(serde_json::json!({ "days_elapsed": days_elapsed }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamError(_) => "An upstream service error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::UpstreamError(_) => tracing::error!(error = %self, "upstream error"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<clearance_core::ValidationError> for AppError {
    fn from(err: clearance_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match &err {
            DocumentError::UnknownDocument { .. } | DocumentError::NotSubmitted { .. } => {
                Self::NotFound(err.to_string())
            }
            DocumentError::WrongParty { .. } => Self::Forbidden(err.to_string()),
            DocumentError::AlreadySubmitted { .. }
            | DocumentError::WithdrawalClosed { .. }
            | DocumentError::CycleClosed { .. }
            | DocumentError::RequirementsAlreadyCreated { .. } => Self::Conflict(err.to_string()),
            DocumentError::NoOpenCycle => Self::PreconditionNotMet {
                missing: err.to_string(),
            },
            DocumentError::InvalidBatch { .. } => Self::Validation(err.to_string()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match &err {
            PaymentError::UnknownOrder { .. } => Self::NotFound(err.to_string()),
            PaymentError::DuplicatePayment { .. } | PaymentError::NotDue { .. } => {
                Self::Conflict(err.to_string())
            }
            PaymentError::KindMismatch { .. } => Self::Validation(err.to_string()),
        }
    }
}

impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        match &err {
            PortError::NotFound { .. } => Self::NotFound(err.to_string()),
            PortError::Storage { .. } => Self::Validation(err.to_string()),
            PortError::Gateway { .. } => Self::UpstreamError(err.to_string()),
            PortError::Configuration { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<ClearanceError> for AppError {
    fn from(err: ClearanceError) -> Self {
        match err {
            ClearanceError::Unauthorized { reason } => Self::Forbidden(reason),
            ClearanceError::PreconditionNotMet { missing } => Self::PreconditionNotMet { missing },
            ClearanceError::Cancelled { days_elapsed } => Self::Cancelled { days_elapsed },
            ClearanceError::GatewayVerificationFailed => {
                Self::PaymentRequired("gateway signature did not verify".to_string())
            }
            ClearanceError::NotFound { .. } => Self::NotFound(err.to_string()),
            ClearanceError::StaleState { .. }
            | ClearanceError::InvalidTransition { .. }
            | ClearanceError::Terminal { .. }
            | ClearanceError::ChargesAlreadyAssessed { .. } => Self::Conflict(err.to_string()),
            ClearanceError::Document(e) => e.into(),
            ClearanceError::Payment(e) => e.into(),
            ClearanceError::Port(e) => e.into(),
            ClearanceError::Validation(e) => e.into(),
            ClearanceError::Fee(e) => Self::Validation(e.to_string()),
        }
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearance_core::ShipmentId;
    use clearance_state::{PaymentKind, ShipmentStatus};
    use http_body_util::BodyExt;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().status_and_code().0
    }

    // ── Engine error mapping ─────────────────────────────────────

    #[test]
    fn engine_errors_map_to_documented_statuses() {
        assert_eq!(
            status_of(ClearanceError::Unauthorized {
                reason: "x".into()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ClearanceError::PreconditionNotMet {
                missing: "documents".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ClearanceError::StaleState {
                id: ShipmentId(1),
                expected: 3
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ClearanceError::InvalidTransition {
                from: ShipmentStatus::Created,
                to: ShipmentStatus::Delivered
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ClearanceError::Cancelled { days_elapsed: 91 }),
            StatusCode::GONE
        );
        assert_eq!(
            status_of(ClearanceError::GatewayVerificationFailed),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(ClearanceError::NotFound { id: ShipmentId(9) }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn nested_errors_map_by_kind() {
        assert_eq!(
            status_of(ClearanceError::Document(DocumentError::UnknownDocument {
                name: "Permit".into()
            })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ClearanceError::Payment(PaymentError::DuplicatePayment {
                kind: PaymentKind::Duty
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PortError::Gateway {
                reason: "timeout".into()
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    // ── into_response ────────────────────────────────────────────

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn precondition_carries_missing_item() {
        let (status, body) = response_parts(AppError::PreconditionNotMet {
            missing: "confirmed shipping payment".into(),
        })
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error.code, "PRECONDITION_NOT_MET");
        assert_eq!(
            body.error.details.unwrap()["missing"],
            "confirmed shipping payment"
        );
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) =
            response_parts(AppError::Internal("pool exhausted on db-2".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.message.contains("db-2"));
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn cancelled_reports_days() {
        let (status, body) = response_parts(AppError::Cancelled { days_elapsed: 90 }).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body.error.details.unwrap()["days_elapsed"], 90);
    }
}
