//! # Error Types
//!
//! Domain-side error types for minicrm-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Kinds                                 │
//! │                                                                     │
//! │  VALIDATION  - caller input malformed; safe to retry after fixing   │
//! │  NOT_FOUND   - referenced entity absent or inactive                 │
//! │  CONFLICT    - business rule violated (stock, duplicate SKU)        │
//! │  INTERNAL    - unexpected storage failure                           │
//! │                                                                     │
//! │  ValidationError (this file) always maps to VALIDATION.             │
//! │  minicrm-db::DbError covers the full taxonomy.                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Errors are enum variants carrying structured context, never String
//! 3. Every error exposes a stable kind and machine-readable details

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Stable error category surfaced to callers.
///
/// Collaborating layers (an HTTP adapter, the import CLI) branch on this
/// instead of matching individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Caller input malformed or missing required fields.
    Validation,
    /// Referenced entity does not exist or is inactive.
    NotFound,
    /// Business rule violation: insufficient stock, duplicate SKU.
    Conflict,
    /// Unexpected failure in the storage layer.
    Internal,
}

impl ErrorKind {
    /// Stable string code, suitable for wire protocols and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur before any transaction is opened; a request failing here has
/// touched no shared resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be a positive integer.
    #[error("{field} must be a positive integer")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., unparseable money amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set (e.g., order status).
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed {
        field: String,
        allowed: Vec<&'static str>,
    },

    /// A non-empty collection is required.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },
}

impl ValidationError {
    /// Shorthand for a missing required field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Structured details naming the offending field, for programmatic use.
    pub fn details(&self) -> Value {
        match self {
            ValidationError::Required { field }
            | ValidationError::MustBePositive { field }
            | ValidationError::Empty { field } => json!({ "field": field }),
            ValidationError::OutOfRange { field, min, max } => {
                json!({ "field": field, "min": min, "max": max })
            }
            ValidationError::InvalidFormat { field, reason } => {
                json!({ "field": field, "reason": reason })
            }
            ValidationError::NotAllowed { field, allowed } => {
                json!({ "field": field, "allowed": allowed })
            }
        }
    }
}

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::required("shippingAddress");
        assert_eq!(err.to_string(), "shippingAddress is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be a positive integer");
    }

    #[test]
    fn test_details_name_the_field() {
        let err = ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["pending", "shipped"],
        };
        let details = err.details();
        assert_eq!(details["field"], "status");
        assert_eq!(details["allowed"][1], "shipped");
    }

    #[test]
    fn test_kind_codes_are_stable() {
        assert_eq!(ErrorKind::Validation.as_str(), "VALIDATION");
        assert_eq!(ErrorKind::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(ErrorKind::Conflict.as_str(), "CONFLICT");
        assert_eq!(ErrorKind::Internal.as_str(), "INTERNAL");
    }
}
