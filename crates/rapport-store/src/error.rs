//! Error types for store operations

use rapport_domain::AccountId;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Account does not exist in the directory
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountId),

    /// Actor and subject are the same account
    #[error("An account cannot target itself")]
    SelfTarget,

    /// The accounts are already friends
    #[error("You are already friends with this user")]
    AlreadyFriends,

    /// A pending request from actor to subject already exists
    #[error("Friend request already sent")]
    RequestAlreadyPending,

    /// The subject already has a pending request out to the actor
    #[error("This user has already sent you a friend request")]
    ReverseRequestPending,

    /// No pending request matches the call
    #[error("Friend request not found")]
    RequestNotFound,

    /// The accounts are not friends
    #[error("You are not friends with this user")]
    NotFriends,

    /// Failure armed through `inject_failures`
    #[error("Injected failure")]
    InjectedFailure,

    /// A cross-account invariant does not hold
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
