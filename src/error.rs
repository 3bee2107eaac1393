//! Error types for the scenario engine.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. Every error here is recoverable at the API boundary;
//! none of them is fatal to the process.

use thiserror::Error;

use crate::scenario::{ScenarioId, ScenarioStatus};
use crate::storage::StorageError;

/// Field-level validation errors raised while decoding requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' is invalid: {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' is not defined for this simulation type")]
    UnknownField {
        field: String,
    },

    #[error("Scenario name cannot be empty")]
    EmptyName,

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Scenario type '{value}' is not supported (only what_if)")]
    UnsupportedScenarioType {
        value: String,
    },
}

impl ValidationError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for scenario operations.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported simulation type: '{tag}'")]
    UnsupportedSimulationType {
        tag: String,
    },

    #[error("Invalid parameter '{field}' = {value}: {reason}")]
    InvalidParameter {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Scenario not found: {id}")]
    NotFound {
        id: ScenarioId,
    },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ScenarioStatus,
        to: ScenarioStatus,
    },

    #[error("Concurrent modification of scenario {id} (expected version {expected}, found {actual})")]
    Conflict {
        id: ScenarioId,
        expected: u64,
        actual: u64,
    },

    #[error("Scenario storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ScenarioError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the caller sent a malformed or out-of-range request.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnsupportedSimulationType { .. } | Self::InvalidParameter { .. }
        )
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Conflict { .. })
    }

    /// HTTP status code this error maps to at the API boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::UnsupportedSimulationType { .. } | Self::InvalidParameter { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::InvalidTransition { .. } | Self::Conflict { .. } => 409,
            Self::StorageUnavailable { .. } => 503,
            Self::Internal { .. } => 500,
        }
    }

    /// Stable machine-readable kind, used in API error bodies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UnsupportedSimulationType { .. } => "unsupported_simulation_type",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Conflict { .. } => "conflict",
            Self::StorageUnavailable { .. } => "storage_unavailable",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<StorageError> for ScenarioError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => Self::NotFound { id },
            StorageError::VersionConflict {
                id,
                expected,
                actual,
            } => Self::Conflict {
                id,
                expected,
                actual,
            },
            StorageError::DuplicateKey(key) => Self::internal(format!("duplicate scenario id: {key}")),
            StorageError::Unavailable(message) | StorageError::BackendError(message) => {
                Self::StorageUnavailable { message }
            }
        }
    }
}

/// Result type alias for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_missing_field() {
        let err = ValidationError::missing("discount");
        let msg = format!("{err}");
        assert!(msg.contains("discount"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn invalid_parameter_message() {
        let err = ScenarioError::InvalidParameter {
            field: "surface_sqm",
            value: -10.0,
            reason: "must be greater than zero",
        };
        let msg = format!("{err}");
        assert!(msg.contains("surface_sqm"));
        assert!(msg.contains("-10"));
        assert!(err.is_validation());
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ScenarioError::NotFound { id: ScenarioId::new() };
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn storage_errors_convert() {
        let id = ScenarioId::new();
        let err: ScenarioError = StorageError::NotFound(id).into();
        assert!(matches!(err, ScenarioError::NotFound { id: got } if got == id));

        let err: ScenarioError = StorageError::Unavailable("connection refused".to_string()).into();
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection refused"));

        let err: ScenarioError = StorageError::VersionConflict {
            id,
            expected: 2,
            actual: 3,
        }
        .into();
        assert_eq!(err.status_code(), 409);
        assert!(err.is_retryable());
    }

    #[test]
    fn transition_error_display() {
        let err = ScenarioError::InvalidTransition {
            from: ScenarioStatus::Archived,
            to: ScenarioStatus::Active,
        };
        assert_eq!(err.to_string(), "Invalid status transition: archived -> active");
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn validation_error_converts() {
        let err: ScenarioError = ValidationError::EmptyName.into();
        assert!(err.is_validation());
        assert_eq!(err.kind(), "validation_error");
    }
}
