//! Failure taxonomy for the ask pipeline.
//!
//! Every stage fails with exactly one `AskError`; the transport layer only
//! looks at `kind()`.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// The four externally visible failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Generator unreachable, failed, or produced no SELECT
    Generation,
    /// Generation deadline elapsed
    Timeout,
    /// Candidate statement rejected by the SQL policy
    Validation,
    /// Statement could not be run, or anything unexpected
    Execution,
}

/// Pipeline failure
#[derive(Debug, Error)]
pub enum AskError {
    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Text generation timed out after {0:?}")]
    Timeout(Duration),

    /// The failing rule is deliberately not part of the message
    #[error("The generated SQL statement did not pass the security checks")]
    Validation,

    #[error("Query execution failed after {attempts} attempt(s): {source}")]
    Execution {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl AskError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AskError::Generation(_) => ErrorKind::Generation,
            AskError::Timeout(_) => ErrorKind::Timeout,
            AskError::Validation => ErrorKind::Validation,
            AskError::Execution { .. } | AskError::Unexpected(_) => ErrorKind::Execution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(AskError::Generation("x".into()).kind(), ErrorKind::Generation);
        assert_eq!(AskError::Timeout(Duration::from_secs(30)).kind(), ErrorKind::Timeout);
        assert_eq!(AskError::Validation.kind(), ErrorKind::Validation);
        assert_eq!(
            AskError::Execution {
                attempts: 3,
                source: StoreError::NotReadOnly
            }
            .kind(),
            ErrorKind::Execution
        );
        assert_eq!(AskError::Unexpected("boom".into()).kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_validation_message_is_generic() {
        let message = AskError::Validation.to_string();
        assert!(!message.to_lowercase().contains("drop"));
        assert!(!message.to_lowercase().contains("column"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::Validation).unwrap(),
            "\"validation\""
        );
    }
}
