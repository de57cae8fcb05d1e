//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Back Office                        │
//! │                                                                         │
//! │  Handler: ApiResult<T>                                                  │
//! │         │                                                               │
//! │         ├── ValidationError ──► 400 INVALID_INPUT  + fields             │
//! │         ├── CoreError       ──► 400 / 404                               │
//! │         ├── DbError         ──► 404 / 409 / 400 / 500                   │
//! │         └── Rejection       ──► 400 (bad JSON, path or query)           │
//! │                                                                         │
//! │  Response body:                                                         │
//! │  { "error": "Order not found: 7", "code": "NOT_FOUND" }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their cause and answered with a generic
//! 500 message; the cause never reaches the client.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bistro_core::{CoreError, ValidationError};
use bistro_db::DbError;
use serde::Serialize;
use thiserror::Error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "error": "password fields didn't match",
///   "code": "INVALID_INPUT",
///   "fields": { "password": ["password fields didn't match"] }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable error message for display
    #[serde(rename = "error")]
    pub message: String,

    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Per-field messages for form validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or invalid input (400)
    InvalidInput,

    /// Resource absent or owned by another account (404)
    NotFound,

    /// Missing or invalid credentials (401)
    Unauthorized,

    /// Valid credentials for a disabled account (403)
    Forbidden,

    /// Unique value already taken (409)
    Conflict,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
            code,
            fields: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidInput, message)
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error with a message safe to show the client.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// A 400 keyed by field; the first message becomes the summary.
    pub fn with_fields(code: ErrorCode, fields: BTreeMap<String, Vec<String>>) -> Self {
        let message = fields
            .values()
            .flat_map(|messages| messages.first())
            .next()
            .cloned()
            .unwrap_or_else(|| "Invalid input".to_string());

        ApiError {
            message,
            code,
            fields: Some(fields),
        }
    }

    /// Single-field error.
    pub fn field(code: ErrorCode, field: &str, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), vec![message.into()]);
        ApiError::with_fields(code, fields)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), axum::Json(self)).into_response()
    }
}

// =============================================================================
// Field Error Collector
// =============================================================================

/// Collects validation failures so a form reports every bad field at once.
///
/// ```rust,ignore
/// let mut errors = FieldErrors::default();
/// let username = errors.check(validate_username(&req.username));
/// let email = errors.check(validate_email(&req.email));
/// errors.into_result()?;
/// ```
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Records the error, if any, and passes the value through.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push(err.field(), err.to_string());
                None
            }
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok` when nothing was recorded.
    pub fn into_result(self) -> ApiResult<()> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(ApiError::with_fields(ErrorCode::InvalidInput, self.fields))
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::field(ErrorCode::InvalidInput, err.field(), err.to_string())
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MenuItemNotFound(id) => ApiError::not_found("MenuItem", &id.to_string()),
            CoreError::OrderNotFound(id) => ApiError::not_found("Order", &id.to_string()),
            CoreError::Validation(err) => err.into(),
            CoreError::EmptyOrder | CoreError::AmountOverflow { .. } => {
                ApiError::invalid_input(err.to_string())
            }
            CoreError::Snapshot(e) => {
                tracing::error!("Billing snapshot failed: {}", e);
                ApiError::internal("Internal server error")
            }
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                let message = match field.as_str() {
                    "email" => "A user with this email already exists.".to_string(),
                    "username" => "A user with that username already exists.".to_string(),
                    other => format!("{other} already exists"),
                };
                ApiError::field(ErrorCode::Conflict, &field, message)
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::invalid_input("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::warn!("Check constraint violation: {}", message);
                ApiError::invalid_input("Value out of range")
            }
            DbError::Domain(err) => err.into(),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::internal("Database connection failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::internal("Database busy")
            }
            DbError::MigrationFailed(e) | DbError::QueryFailed(e) | DbError::Internal(e) => {
                tracing::error!("Database operation failed: {}", e);
                ApiError::internal("Database operation failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_status() {
        assert_eq!(ErrorCode::InvalidInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_db_errors() {
        let err: ApiError = DbError::not_found("Order", 7).into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Order not found: 7");

        let err: ApiError = DbError::duplicate("email", "a@b.c").into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(err.fields.unwrap().contains_key("email"));

        let err: ApiError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_core_errors() {
        let err: ApiError = DbError::Domain(CoreError::EmptyOrder).into();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.message, "Items must be a non-empty list");

        let err: ApiError = CoreError::MenuItemNotFound(3).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = CoreError::Validation(ValidationError::required("name")).into();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.fields.unwrap()["name"], vec!["name is required".to_string()]);
    }

    #[test]
    fn test_field_errors_collects_all() {
        let mut errors = FieldErrors::default();
        assert_eq!(errors.check::<i32>(Ok(1)), Some(1));
        assert!(errors.is_empty());

        errors.check::<()>(Err(ValidationError::required("username")));
        errors.check::<()>(Err(ValidationError::required("email")));

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(err.fields.as_ref().map(|f| f.len()), Some(2));
    }

    #[test]
    fn test_body_shape() {
        let err = ApiError::not_found("Order", "1");
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["error"], "Order not found: 1");
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("fields").is_none());
    }
}
