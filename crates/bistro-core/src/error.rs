//! # Error Types
//!
//! Domain-specific error types for bistro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bistro-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bistro-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  back-office errors (HTTP app)                                         │
//! │  └── ApiError         - Status code + JSON body                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Dashboard    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced menu item does not exist for this account.
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(i64),

    /// An order does not exist for this account (or was already paid).
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    /// An order must carry at least one line.
    #[error("Items must be a non-empty list")]
    EmptyOrder,

    /// A monetary computation left the representable range.
    ///
    /// ## When This Occurs
    /// Only with absurd inputs (prices in the quadrillions), but the
    /// arithmetic is checked rather than allowed to wrap.
    #[error("Amount overflow while computing {context}")]
    AmountOverflow { context: String },

    /// The billing snapshot could not be serialized.
    #[error("Billing snapshot error: {0}")]
    Snapshot(String),

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for errors caused by the caller's input rather than by state.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CoreError::EmptyOrder
                | CoreError::AmountOverflow { .. }
                | CoreError::Validation(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so the HTTP layer can build a
/// field-keyed payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed email, too many decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields that must agree do not.
    #[error("{field} fields didn't match")]
    Mismatch { field: String },
}

impl ValidationError {
    /// Returns the name of the field the error is about.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Mismatch { field } => field,
        }
    }

    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::MenuItemNotFound(4).to_string(),
            "Menu item not found: 4"
        );
        assert_eq!(
            CoreError::EmptyOrder.to_string(),
            "Items must be a non-empty list"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("username");
        assert_eq!(err.to_string(), "username is required");
        assert_eq!(err.field(), "username");

        let err = ValidationError::Mismatch {
            field: "password".to_string(),
        };
        assert_eq!(err.to_string(), "password fields didn't match");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("quantity").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(core_err.is_invalid_input());
        assert!(!CoreError::OrderNotFound(1).is_invalid_input());
    }
}
