//! Trait definitions for external interactions
//!
//! The relationship service is the authority over every account's sets.
//! Implementations decide transport and persistence; the domain only fixes
//! the calls and what a successful call confirms.

use crate::{AccountId, Confirmation, FriendRequest, RelationshipSets};
use async_trait::async_trait;

/// Remote service that applies relationship mutations to both accounts
///
/// Every mutating call takes `(actor, subject)` and must apply the mirrored
/// update on the subject's account atomically with the actor's. A call either
/// succeeds with a [`Confirmation`] or fails; failures carry no taxonomy
/// beyond their message.
///
/// Implemented by the infrastructure layer (rapport-store) and by test doubles.
#[async_trait]
pub trait RelationshipService: Send + Sync {
    /// Error type for service calls
    type Error: std::fmt::Display + Send;

    /// Get the authoritative sets of an account
    async fn fetch_relationships(&self, account: AccountId) -> Result<RelationshipSets, Self::Error>;

    /// Record a friend request from `actor` to `subject`
    async fn send_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
        message: Option<String>,
    ) -> Result<Confirmation, Self::Error>;

    /// Withdraw `actor`'s pending request to `subject`
    async fn cancel_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, Self::Error>;

    /// Accept `subject`'s pending request to `actor`, making them friends
    async fn accept_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, Self::Error>;

    /// Decline `subject`'s pending request to `actor`
    async fn decline_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, Self::Error>;

    /// End the friendship between `actor` and `subject`
    async fn remove_friend(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, Self::Error>;

    /// Flip whether `actor` follows `subject`
    ///
    /// Returns whether `actor` follows `subject` afterwards.
    async fn toggle_follow(&self, actor: AccountId, subject: AccountId) -> Result<bool, Self::Error>;

    /// Pending friend requests addressed to `account`
    async fn pending_friend_requests(
        &self,
        account: AccountId,
    ) -> Result<Vec<FriendRequest>, Self::Error>;
}
