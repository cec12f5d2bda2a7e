//! # Custom Extractors & Validation
//!
//! The [`Validate`] trait for request DTOs and helpers that map body
//! rejections to [`AppError`].

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use clearance_core::ShipmentId;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Business-rule validation beyond what serde checks.
pub trait Validate {
    /// Returns a message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run [`Validate`] on it.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Parse an optional JSON body. An empty body yields `T::default()`.
pub fn json_or_default<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| AppError::BadRequest(err.to_string()))
}

/// Shipment id from a path segment.
pub fn shipment_id(raw: &str) -> Result<ShipmentId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("shipment {raw:?}")))
}
