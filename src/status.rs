//! Status values exchanged between sub-operations, the fan-in coordinator and callers

use crate::constants::status_tag;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Outcome reported by one sub-operation or by a whole request
///
/// A success/failure discriminant plus the tag the node (or this crate) attached to it,
/// e.g. `END`, `NOT_FOUND` or `SERVER_ERROR out of memory`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationStatus {
    success: bool,
    message: String,
}

impl OperationStatus {
    pub fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(true, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(false, message)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for OperationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Final classification of an smget request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalStatus {
    /// Every node answered and the merged result is secondary-key unique
    End,
    /// Non-unique request whose merged result repeats a secondary key under several cache keys
    Duplicated,
    /// At least one node failed; the first recorded cause is kept
    Failed(OperationStatus),
}

impl TerminalStatus {
    /// `Duplicated` counts as success: the caller decides how to treat repeated secondary keys
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Render as the status value a collection callback would receive
    pub fn as_operation_status(&self) -> OperationStatus {
        match self {
            Self::End => OperationStatus::success(status_tag::END),
            Self::Duplicated => OperationStatus::success(status_tag::DUPLICATED),
            Self::Failed(cause) => cause.clone(),
        }
    }
}

impl Display for TerminalStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => f.write_str(status_tag::END),
            Self::Duplicated => f.write_str(status_tag::DUPLICATED),
            Self::Failed(cause) => write!(f, "FAILED ({})", cause),
        }
    }
}

/// Lifecycle state of a sub-operation as tracked by its transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationState {
    WriteQueued,
    Writing,
    Reading,
    Complete,
}

impl Display for OperationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::WriteQueued => "WRITE_QUEUED",
            Self::Writing => "WRITING",
            Self::Reading => "READING",
            Self::Complete => "COMPLETE",
        };
        f.write_str(tag)
    }
}
