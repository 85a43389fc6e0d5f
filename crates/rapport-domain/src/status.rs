//! Relationship status resolution

use crate::{AccountId, RelationshipSets};
use std::fmt;

/// How a viewer currently relates to a subject account
///
/// Derived from the viewer's [`RelationshipSets`] on every read and never
/// persisted, so it cannot drift from the sets it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipStatus {
    /// No relationship
    None,

    /// Viewer follows the subject without any friend state
    Following,

    /// Viewer has a pending friend request out to the subject
    RequestSent,

    /// Subject has a pending friend request out to the viewer
    RequestReceived,

    /// Confirmed mutual friendship
    Friends,
}

impl RelationshipStatus {
    /// Get the status tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStatus::None => "none",
            RelationshipStatus::Following => "following",
            RelationshipStatus::RequestSent => "request_sent",
            RelationshipStatus::RequestReceived => "request_received",
            RelationshipStatus::Friends => "friends",
        }
    }

    /// Parse a status from its tag
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(RelationshipStatus::None),
            "following" => Some(RelationshipStatus::Following),
            "request_sent" => Some(RelationshipStatus::RequestSent),
            "request_received" => Some(RelationshipStatus::RequestReceived),
            "friends" => Some(RelationshipStatus::Friends),
            _ => None,
        }
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid relationship status: {}", s))
    }
}

/// Resolve the status `sets`' owner has toward `target`
///
/// Priority order is friends, request sent, request received, following,
/// none. Well-formed sets never hold more than one of the first three for the
/// same target; the order still decides the answer when an upstream write has
/// broken that.
///
/// # Examples
///
/// ```
/// use rapport_domain::{resolve_status, AccountId, RelationshipSets, RelationshipStatus};
///
/// let target = AccountId::new();
/// let mut sets = RelationshipSets::new();
/// assert_eq!(resolve_status(&sets, target), RelationshipStatus::None);
///
/// sets.following.insert(target);
/// assert_eq!(resolve_status(&sets, target), RelationshipStatus::Following);
///
/// sets.friends.insert(target);
/// assert_eq!(resolve_status(&sets, target), RelationshipStatus::Friends);
/// ```
pub fn resolve_status(sets: &RelationshipSets, target: AccountId) -> RelationshipStatus {
    if sets.friends.contains(&target) {
        RelationshipStatus::Friends
    } else if sets.friend_requests_sent.contains(&target) {
        RelationshipStatus::RequestSent
    } else if sets.friend_requests_received.contains(&target) {
        RelationshipStatus::RequestReceived
    } else if sets.following.contains(&target) {
        RelationshipStatus::Following
    } else {
        RelationshipStatus::None
    }
}

/// What a viewer sees when looking at a profile
///
/// Your own profile has no relationship status; it gets its own branch
/// (edit, not connect) instead of a sixth status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileRelation {
    /// The viewer is looking at their own account
    Own,

    /// The viewer is looking at another account
    Other(RelationshipStatus),
}

impl ProfileRelation {
    /// Classify `subject` from `viewer`'s point of view
    pub fn of(viewer: AccountId, sets: &RelationshipSets, subject: AccountId) -> Self {
        if viewer == subject {
            ProfileRelation::Own
        } else {
            ProfileRelation::Other(resolve_status(sets, subject))
        }
    }

    /// The relationship status, if this is not the viewer's own profile
    pub fn status(&self) -> Option<RelationshipStatus> {
        match self {
            ProfileRelation::Own => None,
            ProfileRelation::Other(status) => Some(*status),
        }
    }
}
