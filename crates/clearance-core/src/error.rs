//! # Validation Errors
//!
//! Construction-time failures for the validated newtypes in this crate.
//! Higher layers wrap these in their own error enums.

use thiserror::Error;

/// A value failed validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A text field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length.
        max: usize,
    },

    /// Email address is malformed.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    /// HS code is not 6 to 10 digits.
    #[error("invalid HS code {0:?}: expected 6 to 10 digits")]
    InvalidHsCode(String),

    /// Monetary amount could not be parsed or is out of range.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Rate could not be parsed or is out of range.
    #[error("invalid rate: {0}")]
    InvalidRate(String),

    /// Timestamp could not be parsed or is not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A name did not match any known variant.
    #[error("unknown {kind}: {value:?}")]
    Unknown {
        /// What was being parsed (e.g. "role", "duty mode").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A numeric field was outside its permitted range.
    #[error("{field} out of range: {reason}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the permitted range.
        reason: String,
    },
}

/// Trim `value` and check it is non-empty and at most `max` characters.
pub(crate) fn bounded_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_text_trims() {
        assert_eq!(bounded_text("name", "  Asha  ", 10).unwrap(), "Asha");
    }

    #[test]
    fn bounded_text_rejects_blank() {
        assert_eq!(
            bounded_text("name", "   ", 10),
            Err(ValidationError::Empty { field: "name" })
        );
    }

    #[test]
    fn bounded_text_counts_chars_not_bytes() {
        // Four multi-byte characters fit a limit of four.
        assert!(bounded_text("name", "ÄÖÜß", 4).is_ok());
        assert!(bounded_text("name", "ÄÖÜßx", 4).is_err());
    }

    #[test]
    fn display_messages_name_the_field() {
        let err = ValidationError::TooLong {
            field: "notes",
            max: 5,
        };
        assert_eq!(err.to_string(), "notes must not exceed 5 characters");
    }
}
