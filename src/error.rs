//! Error types for shiftpoints
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown entity, failed validation)
//! - 3: Blocked (wrong state for the requested transition, missing role)
//! - 4: Operation failed (storage error, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the shiftpoints CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const TRANSITION_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for shiftpoints operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Transition blocks (exit code 3)
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NotFound(_)
            | Error::ValidationFailed(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            // Transition blocks
            Error::PreconditionFailed(_) | Error::Unauthorized(_) => {
                exit_codes::TRANSITION_BLOCKED
            }

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable machine-readable kind for JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::ValidationFailed(_) => "validation_failed",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::InvalidConfig(_) => "invalid_config",
            Error::PreconditionFailed(_) => "precondition_failed",
            Error::Unauthorized(_) => "unauthorized",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::TomlParse(_) | Error::TomlSerialize(_) => "toml",
            Error::LockFailed(_) => "lock_failed",
            Error::OperationFailed(_) => "operation_failed",
        }
    }
}

/// Result type alias for shiftpoints operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub kind: &'static str,
    pub code: i32,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            kind: err.kind(),
            code: err.exit_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(
            Error::NotFound("task x".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::ValidationFailed("incomplete items".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::PreconditionFailed("not pending_review".to_string()).exit_code(),
            exit_codes::TRANSITION_BLOCKED
        );
        assert_eq!(
            Error::Unauthorized("admin only".to_string()).exit_code(),
            exit_codes::TRANSITION_BLOCKED
        );
        assert_eq!(
            Error::LockFailed(PathBuf::from("x.lock")).exit_code(),
            exit_codes::OPERATION_FAILED
        );
    }

    #[test]
    fn json_error_carries_kind() {
        let err = Error::PreconditionFailed("already completed".to_string());
        let json = JsonError::from(&err);
        assert_eq!(json.kind, "precondition_failed");
        assert_eq!(json.code, 3);
        assert!(json.error.contains("already completed"));
    }
}
