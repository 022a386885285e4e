//! Error types for the APSI engine.

use crate::scheme::Role;
use thiserror::Error;

/// Errors that can occur during setup, signing or an interaction run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApsiError {
    /// The requested security level cannot be met by the pairing group.
    #[error("Unsupported group parameters: {0}")]
    UnsupportedParameters(String),

    /// A set and its signature array differ in length.
    #[error("Length mismatch for {role} set: {elements} elements but {signatures} signatures")]
    LengthMismatch {
        role: Role,
        elements: usize,
        signatures: usize,
    },

    /// A bounded strategy was asked to run with no workers.
    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    /// Mapping an element onto the curve failed.
    #[error("Hash-to-group failed: {0}")]
    HashToGroup(String),

    /// A group element could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The work queue of a bounded strategy was closed before it was loaded.
    #[error("Work queue closed: {0}")]
    QueueClosed(String),

    /// A worker thread panicked and the run was aborted.
    #[error("Worker thread panicked")]
    WorkerPanicked,
}

/// Result type for APSI operations.
pub type Result<T> = std::result::Result<T, ApsiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", ApsiError::UnsupportedParameters("test".to_string())),
            "Unsupported group parameters: test"
        );
        assert_eq!(
            format!(
                "{}",
                ApsiError::LengthMismatch {
                    role: Role::Server,
                    elements: 3,
                    signatures: 2,
                }
            ),
            "Length mismatch for server set: 3 elements but 2 signatures"
        );
        assert_eq!(
            format!("{}", ApsiError::InvalidWorkerCount),
            "Worker count must be at least 1"
        );
        assert_eq!(
            format!("{}", ApsiError::WorkerPanicked),
            "Worker thread panicked"
        );
    }

    #[test]
    fn test_result_type() {
        let ok_result: Result<()> = Ok(());
        let err_result: Result<()> = Err(ApsiError::InvalidWorkerCount);
        assert!(ok_result.is_ok());
        assert!(err_result.is_err());
    }
}
