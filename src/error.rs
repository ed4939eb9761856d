//! Error types for shardmerge operations
//!
//! This module defines the error type shared by the aggregator, the fan-in coordinator and the
//! scatter-gather dispatcher. Per-node failures are not errors at this level: they are recorded
//! as an [`OperationStatus`] on the aggregator and surface through its terminal status.

use crate::status::OperationStatus;
use thiserror::Error;

/// Main error type for all shardmerge operations
#[derive(Debug, Error)]
pub enum ShardmergeError {
    /// Input validation failed
    #[error("Invalid input: {field} - {reason}. {suggestion}")]
    InvalidInput {
        field: String,
        reason: String,
        suggestion: String,
    },

    /// Configuration validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The aggregator was finalized more than once
    #[error("Smget result already finalized")]
    AlreadyFinalized,

    /// The request deadline passed before every node answered
    ///
    /// The message is the rendered failing-node report.
    #[error("{message}")]
    Timeout { message: String },

    /// A sub-operation reported a failing status
    #[error("Sub-operation failed: {status}")]
    SubOperationFailed { status: OperationStatus },

    /// The dispatcher lost track of its sub-operations
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

impl ShardmergeError {
    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a detailed config error
    pub fn config_error(field: impl Into<String>, reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Config(format!("{} - {}: {}", field.into(), reason.into(), suggestion.into()))
    }

    /// Create a timeout error carrying a rendered diagnostic message
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a dispatch error with context
    pub fn dispatch_failed(operation: &str, reason: impl Into<String>) -> Self {
        Self::Dispatch(format!("{}: {}", operation, reason.into()))
    }

    /// Check if this error represents a transient failure that can be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::SubOperationFailed { .. })
    }

    /// Add operation context to an error, preserving the original error information
    pub fn with_operation_context(self, operation: &str, additional_context: &str) -> Self {
        let context = format!("{}: {}", operation, additional_context);

        match self {
            Self::Config(msg) => Self::Config(format!("{}: {}", context, msg)),
            Self::Dispatch(msg) => Self::Dispatch(format!("{}: {}", context, msg)),
            Self::InvalidInput {
                field,
                reason,
                suggestion,
            } => Self::InvalidInput {
                field,
                reason: format!("{}: {}", context, reason),
                suggestion,
            },
            other => other,
        }
    }
}
