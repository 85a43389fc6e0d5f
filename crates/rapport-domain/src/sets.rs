//! Per-account membership sets

use crate::AccountId;
use std::collections::HashSet;
use std::fmt;

/// The relationship-relevant state of one account
///
/// Every set is owned by the account it belongs to. Mirrored entries on the
/// other account (a follower here is a following there) are kept in step by
/// the relationship service, never by writing another account's sets locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipSets {
    /// Accounts that follow this account
    pub followers: HashSet<AccountId>,

    /// Accounts this account follows
    pub following: HashSet<AccountId>,

    /// Accounts in a confirmed mutual friendship with this account
    pub friends: HashSet<AccountId>,

    /// Accounts this account has an outstanding friend request to
    pub friend_requests_sent: HashSet<AccountId>,

    /// Accounts this account has an outstanding friend request from
    pub friend_requests_received: HashSet<AccountId>,
}

/// A broken single-account invariant, reported by [`RelationshipSets::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The owning account appears in one of its own sets
    SelfReference {
        /// Name of the offending set
        set: &'static str,
    },

    /// More than one of friend / request sent / request received holds for a subject
    ConflictingStates {
        /// The subject with conflicting membership
        subject: AccountId,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::SelfReference { set } => {
                write!(f, "account references itself in {}", set)
            }
            InvariantViolation::ConflictingStates { subject } => {
                write!(f, "conflicting friend/request membership for {}", subject)
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}

impl RelationshipSets {
    /// Create empty sets, as for a freshly created account
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `other` is in this account's `following` set
    pub fn is_following(&self, other: AccountId) -> bool {
        self.following.contains(&other)
    }

    /// Whether `other` is in this account's `followers` set
    pub fn is_followed_by(&self, other: AccountId) -> bool {
        self.followers.contains(&other)
    }

    /// Whether `other` is a confirmed friend
    pub fn is_friend(&self, other: AccountId) -> bool {
        self.friends.contains(&other)
    }

    /// Whether this account has a pending request out to `other`
    pub fn has_sent_request(&self, other: AccountId) -> bool {
        self.friend_requests_sent.contains(&other)
    }

    /// Whether this account has a pending request from `other`
    pub fn has_received_request(&self, other: AccountId) -> bool {
        self.friend_requests_received.contains(&other)
    }

    /// Check the invariants that can be judged from one account alone
    ///
    /// Covers the no-self-reference rule and the friend/sent/received mutual
    /// exclusion. Cross-account symmetry needs both accounts and is audited by
    /// whoever holds them.
    pub fn validate(&self, owner: AccountId) -> Result<(), InvariantViolation> {
        let named = [
            ("followers", &self.followers),
            ("following", &self.following),
            ("friends", &self.friends),
            ("friend_requests_sent", &self.friend_requests_sent),
            ("friend_requests_received", &self.friend_requests_received),
        ];
        for (set, members) in named {
            if members.contains(&owner) {
                return Err(InvariantViolation::SelfReference { set });
            }
        }

        let subjects = self
            .friends
            .iter()
            .chain(&self.friend_requests_sent)
            .chain(&self.friend_requests_received);
        for subject in subjects {
            let held = [
                self.is_friend(*subject),
                self.has_sent_request(*subject),
                self.has_received_request(*subject),
            ]
            .into_iter()
            .filter(|held| *held)
            .count();
            if held > 1 {
                return Err(InvariantViolation::ConflictingStates { subject: *subject });
            }
        }

        Ok(())
    }
}
