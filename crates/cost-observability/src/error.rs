//! Cost observability error types

use thiserror::Error;

/// Cost observability error types
#[derive(Debug, Error)]
pub enum CostObservabilityError {
    /// Caller supplied input the operation cannot work with
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A best-effort external lookup (cloud describe/list call or learning
    /// store query) failed or timed out
    #[error("External lookup failed: {source_name} - {reason}")]
    ExternalLookup { source_name: String, reason: String },

    /// A rule was asked to evaluate against configuration it does not have
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },
}

/// Cost observability result type
pub type CostObservabilityResult<T> = Result<T, CostObservabilityError>;
