//! Error types for qsurvey-engine
//!
//! Call-level failures only. Problems found while reading an import file are
//! reported as [`crate::models::ImportIssue`] values inside the result.

use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Survey already has responses, definitions are frozen
    #[error("Survey {survey_id} already has responses; definitions can no longer change")]
    EthicsGuard { survey_id: i64 },

    /// Response session does not match the caller's claim
    #[error("Invalid state: {0}")]
    State(String),

    /// Rejected input on a non-import path (submit, authoring, admin)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Survey, question or response not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// qsurvey-common error
    #[error("Common error: {0}")]
    Common(#[from] qsurvey_common::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// True when a database error is a UNIQUE constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            EngineError::Database(e) => e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false),
            _ => false,
        }
    }
}
