//! Friend request ledger records

use crate::AccountId;
use std::fmt;

/// Identifier of a friend request record, backed by a UUIDv7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u128);

impl RequestId {
    /// Generate a new UUIDv7-based RequestId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req_{}", uuid::Uuid::from_u128(self.0).simple())
    }
}

/// Lifecycle of a friend request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FriendRequestStatus {
    /// Waiting for the recipient
    Pending,

    /// Recipient accepted; the accounts are friends
    Accepted,

    /// Recipient declined
    Declined,

    /// Sender withdrew the request
    Cancelled,
}

impl FriendRequestStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "pending",
            FriendRequestStatus::Accepted => "accepted",
            FriendRequestStatus::Declined => "declined",
            FriendRequestStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the request has been resolved one way or another
    pub fn is_closed(&self) -> bool {
        !matches!(self, FriendRequestStatus::Pending)
    }
}

/// A friend request between two accounts
///
/// The membership sets say *that* a request is outstanding; the record keeps
/// the message and how the request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRequest {
    /// Unique identifier
    pub id: RequestId,

    /// Sending account
    pub from: AccountId,

    /// Receiving account
    pub to: AccountId,

    /// Optional note attached by the sender
    pub message: Option<String>,

    /// Current lifecycle state
    pub status: FriendRequestStatus,

    /// When the request was sent (seconds since Unix epoch)
    pub created_at: u64,

    /// When the request left `Pending`
    pub responded_at: Option<u64>,
}

impl FriendRequest {
    /// Create a new pending request
    pub fn new(from: AccountId, to: AccountId, message: Option<String>, created_at: u64) -> Self {
        Self {
            id: RequestId::new(),
            from,
            to,
            message: message.filter(|m| !m.trim().is_empty()),
            status: FriendRequestStatus::Pending,
            created_at,
            responded_at: None,
        }
    }

    /// Whether this is the pending request from `from` to `to`
    pub fn is_pending_between(&self, from: AccountId, to: AccountId) -> bool {
        self.status == FriendRequestStatus::Pending && self.from == from && self.to == to
    }

    /// Move the request out of `Pending`
    pub fn close(&mut self, status: FriendRequestStatus, at: u64) {
        self.status = status;
        self.responded_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let (a, b) = (AccountId::from_value(1), AccountId::from_value(2));
        let request = FriendRequest::new(a, b, Some("hi".to_string()), 1000);

        assert_eq!(request.status, FriendRequestStatus::Pending);
        assert!(request.is_pending_between(a, b));
        assert!(!request.is_pending_between(b, a));
        assert_eq!(request.message.as_deref(), Some("hi"));
    }

    #[test]
    fn test_blank_message_is_dropped() {
        let (a, b) = (AccountId::from_value(1), AccountId::from_value(2));
        let request = FriendRequest::new(a, b, Some("   ".to_string()), 1000);
        assert_eq!(request.message, None);
    }

    #[test]
    fn test_close_records_response() {
        let (a, b) = (AccountId::from_value(1), AccountId::from_value(2));
        let mut request = FriendRequest::new(a, b, None, 1000);
        request.close(FriendRequestStatus::Declined, 1500);

        assert!(request.status.is_closed());
        assert_eq!(request.responded_at, Some(1500));
        assert!(!request.is_pending_between(a, b));
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert!(id.to_string().starts_with("req_"));
    }
}
