//! Error types for family-cookbook
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Database, Form, Validation, PasswordReset)
//! - HTTP status code mapping for the embedding request layer
//! - Structured error responses with machine-readable error codes
//! - Field-level validation details echoed back to the submitter

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias for family-cookbook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for family-cookbook
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "accounts.reset_token_ttl")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Submitted form does not match the shape the application renders
    #[error("malformed form: {0}")]
    Form(#[from] FormError),

    /// Submitted form failed field validation
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Password reset token flow failed
    #[error("password reset failed: {0}")]
    PasswordReset(#[from] PasswordResetError),

    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Record already exists (duplicate email, category name, ...)
    #[error("conflict: {0}")]
    Conflict(String),

    /// No signed-in user, or credentials rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Signed-in user lacks permission for the operation
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The embedder's password hasher failed
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., duplicate key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Form contract violations
///
/// These only arise when the markup that generated the form is broken, never from
/// what a user typed, so they are not reported as field errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// Key lacks the `ingredient[<group>][<field>]` bracket structure
    #[error("malformed ingredient key `{key}`")]
    MalformedKey {
        /// The offending form key
        key: String,
    },

    /// Key names a field the ingredient record does not have
    #[error("unknown ingredient field `{field}` in key `{key}`")]
    UnknownField {
        /// The offending form key
        key: String,
        /// The field segment that was not recognized
        field: String,
    },

    /// `actionId` names no known recipe action
    #[error("unknown recipe action `{action}`")]
    UnknownAction {
        /// The submitted action id
        action: String,
    },
}

/// Field validation failure for a submitted form
///
/// Carries every failing field at once together with the submitted values, so the
/// caller can re-render the form with the user's input intact.
#[derive(Debug, Clone, Default, PartialEq, Error)]
#[error("validation failed: {}", self.summary())]
pub struct ValidationError {
    /// Error that applies to the whole form rather than one field
    pub form_error: Option<String>,
    /// Field name -> message, for every field that failed
    pub field_errors: BTreeMap<String, String>,
    /// The submitted values, echoed back
    pub fields: serde_json::Value,
}

impl ValidationError {
    /// Create a form-level error ("Form not submitted correctly.")
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create an error for a single field
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(name.into(), message.into());
        Self {
            form_error: None,
            field_errors,
            fields: serde_json::Value::Null,
        }
    }

    /// Attach the submitted values
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        self.fields = fields;
        self
    }

    /// Whether any error was recorded
    pub fn is_empty(&self) -> bool {
        self.form_error.is_none() && self.field_errors.is_empty()
    }

    fn summary(&self) -> String {
        let mut parts: Vec<String> = self.form_error.iter().cloned().collect();
        parts.extend(
            self.field_errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}")),
        );
        parts.join("; ")
    }
}

/// Password reset token errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordResetError {
    /// No account is registered under the email
    #[error("no account found for {email}")]
    UnknownEmail {
        /// The email that was looked up
        email: String,
    },

    /// No token was issued, or the submitted token does not match
    #[error("invalid reset token")]
    InvalidToken,

    /// The token matched but its expiry has passed
    #[error("reset token expired")]
    TokenExpired,
}

/// API error response format
///
/// This structure is what the embedding request layer returns when an operation
/// fails. It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "validation failed: title: Title required",
///     "details": {
///       "fieldErrors": { "title": "Title required" },
///       "fields": { "title": "" }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }
}

/// Convert errors to HTTP status codes for the request layer's error boundary
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - user input the form can report back
            Error::Validation(_) => 400,
            Error::PasswordReset(PasswordResetError::InvalidToken) => 400,
            Error::PasswordReset(PasswordResetError::TokenExpired) => 400,

            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Database(DatabaseError::NotFound(_)) => 404,
            Error::PasswordReset(PasswordResetError::UnknownEmail { .. }) => 404,

            // 409 Conflict
            Error::Conflict(_) => 409,
            Error::Database(DatabaseError::ConstraintViolation(_)) => 409,

            // 500 - broken form markup is a server bug, not a user mistake
            Error::Form(_) => 500,
            Error::Config { .. } => 500,
            Error::Database(_) => 500,
            Error::PasswordHash(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(DatabaseError::NotFound(_)) => "not_found",
            Error::Database(DatabaseError::ConstraintViolation(_)) => "conflict",
            Error::Database(_) => "database_error",
            Error::Form(_) => "malformed_form",
            Error::Validation(_) => "validation_error",
            Error::PasswordReset(e) => match e {
                PasswordResetError::UnknownEmail { .. } => "unknown_email",
                PasswordResetError::InvalidToken => "invalid_token",
                PasswordResetError::TokenExpired => "token_expired",
            },
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::PasswordHash(_) => "password_hash_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        // Storage and markup failures are reported generically; their text is for logs
        let message = match error.status_code() {
            500 => "internal server error".to_string(),
            _ => error.to_string(),
        };

        let details = match &error {
            Error::Validation(validation) => {
                let mut details = serde_json::json!({
                    "fieldErrors": validation.field_errors,
                    "fields": validation.fields,
                });
                if let Some(form_error) = &validation.form_error {
                    details["formError"] = serde_json::Value::String(form_error.clone());
                }
                Some(details)
            }
            Error::PasswordReset(PasswordResetError::UnknownEmail { email }) => {
                Some(serde_json::json!({
                    "email": email,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
