//! Core error types for sqlrepo-rs.
//!
//! [`SqlRepoError`] is the single error type shared by every crate in the
//! workspace. Two of its variants originate in the statement-construction
//! core itself:
//!
//! - [`FilterError`] for filter maps that fail structural or semantic
//!   validation (a client fault).
//! - [`DisableError`] for rejected bulk soft-delete requests.
//!
//! Errors raised by the execution layer travel through
//! [`SqlRepoError::DatabaseError`] untouched.

use std::fmt;

use thiserror::Error;

/// A filter map failed validation before translation.
///
/// Carries the rendered offending data and the reason it was rejected.
///
/// # Examples
///
/// ```
/// use sqlrepo_core::error::FilterError;
///
/// let err = FilterError::new("{\"age__foo\": 1}", "Unexpected lookup \"foo\".");
/// assert!(err.to_string().starts_with("Filter with data"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError {
    /// The offending filter data, rendered for humans.
    pub data: String,
    /// Why the data was rejected.
    pub reason: String,
}

impl FilterError {
    /// Creates a new `FilterError`.
    pub fn new(data: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter with data {} is not valid: {}", self.data, self.reason)
    }
}

impl std::error::Error for FilterError {}

/// Which precondition of a disable request was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableFaultKind {
    /// A bad value was supplied (the id set was empty).
    Value,
    /// The disable field has a type that cannot express "disabled".
    Type,
}

/// A bulk soft-delete request was rejected before any statement was built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisableError {
    /// No ids were given. An unconstrained mass update is never built.
    #[error("ids_to_disable must contain at least one id")]
    EmptyIds,

    /// The disable field is neither boolean nor timestamp typed.
    #[error("disable field \"{field}\" has unsupported type {field_type}; expected boolean or timestamp")]
    UnsupportedFieldType {
        /// The disable field name.
        field: String,
        /// The declared field type, rendered.
        field_type: String,
    },
}

impl DisableError {
    /// Returns whether this is a value fault or a type fault.
    pub const fn kind(&self) -> DisableFaultKind {
        match self {
            Self::EmptyIds => DisableFaultKind::Value,
            Self::UnsupportedFieldType { .. } => DisableFaultKind::Type,
        }
    }
}

/// The primary error type for sqlrepo-rs.
#[derive(Error, Debug)]
pub enum SqlRepoError {
    // ── Statement construction ───────────────────────────────────────

    /// A filter map failed validation.
    #[error("{0}")]
    Filter(FilterError),

    /// A disable request broke one of its preconditions.
    #[error("Disable error: {0}")]
    Disable(#[from] DisableError),

    /// An internal contract was broken, e.g. model metadata advertised a
    /// field it could not resolve.
    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    // ── Repository / model ───────────────────────────────────────────

    /// A repository is missing attributes an operation needs.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// An entity or row could not be read or written.
    #[error("Model error: {0}")]
    ModelError(String),

    /// An error raised below this layer by the execution collaborator.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A settings source was malformed.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<FilterError> for SqlRepoError {
    fn from(err: FilterError) -> Self {
        Self::Filter(err)
    }
}

impl SqlRepoError {
    /// Returns `true` when the caller's request caused the error.
    ///
    /// Filter and disable faults are request-level problems and must not be
    /// reported as system failures.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Filter(_) | Self::Disable(_))
    }

    /// Returns the HTTP status code a web layer should map this error to.
    ///
    /// - `Filter`, `Disable` -> 400
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

/// A convenience type alias for `Result<T, SqlRepoError>`.
pub type SqlRepoResult<T> = Result<T, SqlRepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_display() {
        let err = FilterError::new("{\"x\": 1}", "Model MyModel has no field \"x\".");
        assert_eq!(
            err.to_string(),
            "Filter with data {\"x\": 1} is not valid: Model MyModel has no field \"x\"."
        );
    }

    #[test]
    fn test_filter_error_is_client_fault() {
        let err: SqlRepoError = FilterError::new("{}", "bad").into();
        assert!(err.is_client_error());
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_disable_error_kinds() {
        assert_eq!(DisableError::EmptyIds.kind(), DisableFaultKind::Value);
        let err = DisableError::UnsupportedFieldType {
            field: "name".into(),
            field_type: "CharField".into(),
        };
        assert_eq!(err.kind(), DisableFaultKind::Type);
        assert!(err.to_string().contains("\"name\""));
    }

    #[test]
    fn test_disable_error_conversion() {
        let err: SqlRepoError = DisableError::EmptyIds.into();
        assert!(matches!(err, SqlRepoError::Disable(DisableError::EmptyIds)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_system_errors_are_500() {
        assert_eq!(SqlRepoError::DatabaseError("x".into()).status_code(), 500);
        assert_eq!(SqlRepoError::InvariantViolated("x".into()).status_code(), 500);
        assert_eq!(SqlRepoError::ImproperlyConfigured("x".into()).status_code(), 500);
        assert!(!SqlRepoError::ModelError("x".into()).is_client_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: SqlRepoError = io_err.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("file missing"));
    }
}
