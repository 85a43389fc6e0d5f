//! Error types for relationship commands

use rapport_domain::{AccountId, RelationshipStatus, Transition};
use std::fmt;
use thiserror::Error;

/// Errors returned by [`CommandProcessor`](crate::CommandProcessor) commands
///
/// The first three are decided locally before the relationship service is
/// contacted. Only `RemoteFailure` means a service call was attempted.
/// In every case the local sets are left exactly as they were.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Actor and subject are the same account
    #[error("Invalid target: account {0} cannot target itself")]
    InvalidTarget(AccountId),

    /// The transition does not apply to the current status
    #[error("Cannot {transition} while status is {status}")]
    InvalidPrecondition {
        /// Requested transition
        transition: Transition,
        /// Status at the time of the request
        status: RelationshipStatus,
    },

    /// A command for the same pair is still waiting on the service
    #[error("An operation from {actor} toward {subject} is already in progress")]
    OperationInProgress {
        /// Acting account
        actor: AccountId,
        /// Target account
        subject: AccountId,
    },

    /// The relationship service call did not succeed
    #[error("Relationship service failed during {operation}: {reason}")]
    RemoteFailure {
        /// Service operation that failed
        operation: &'static str,
        /// Message reported by the service
        reason: String,
    },
}

/// Stable tag for each [`CommandError`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CommandError::InvalidTarget`]
    InvalidTarget,
    /// See [`CommandError::InvalidPrecondition`]
    InvalidPrecondition,
    /// See [`CommandError::OperationInProgress`]
    OperationInProgress,
    /// See [`CommandError::RemoteFailure`]
    RemoteFailure,
}

impl ErrorKind {
    /// Get the tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidTarget => "invalid_target",
            ErrorKind::InvalidPrecondition => "invalid_precondition",
            ErrorKind::OperationInProgress => "operation_in_progress",
            ErrorKind::RemoteFailure => "remote_failure",
        }
    }

    /// Parse a tag produced by [`as_str`](Self::as_str)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invalid_target" => Some(ErrorKind::InvalidTarget),
            "invalid_precondition" => Some(ErrorKind::InvalidPrecondition),
            "operation_in_progress" => Some(ErrorKind::OperationInProgress),
            "remote_failure" => Some(ErrorKind::RemoteFailure),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CommandError {
    /// The error's tag
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::InvalidTarget(_) => ErrorKind::InvalidTarget,
            CommandError::InvalidPrecondition { .. } => ErrorKind::InvalidPrecondition,
            CommandError::OperationInProgress { .. } => ErrorKind::OperationInProgress,
            CommandError::RemoteFailure { .. } => ErrorKind::RemoteFailure,
        }
    }

    /// Whether the error was raised without contacting the service
    pub fn is_local(&self) -> bool {
        self.kind() != ErrorKind::RemoteFailure
    }
}
