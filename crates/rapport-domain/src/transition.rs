//! The six user-initiated relationship transitions

use crate::{AccountId, RelationshipSets, RelationshipStatus};
use std::fmt;

/// A relationship change requested by the acting account toward a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Ask the subject to become a friend
    SendFriendRequest,

    /// Withdraw a pending request to the subject
    CancelFriendRequest,

    /// Accept the subject's pending request
    AcceptFriendRequest,

    /// Decline the subject's pending request
    DeclineFriendRequest,

    /// End a confirmed friendship
    RemoveFriend,

    /// Follow the subject, or unfollow if already following
    ToggleFollow,
}

/// What the relationship service confirmed after applying a transition
///
/// Only follow memberships are reported, and only when the service knows
/// them. The friend and request effects of each transition are fixed, so the
/// caller derives those itself; follow side effects (such as mutual follow on
/// accept) depend on the service and must not be guessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confirmation {
    /// Whether the actor follows the subject after the transition
    pub is_following: Option<bool>,

    /// Whether the subject follows the actor after the transition
    pub is_followed_by: Option<bool>,
}

impl Confirmation {
    /// A confirmation with no follow changes reported
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// A confirmation reporting the actor's resulting follow membership
    pub fn following(is_following: bool) -> Self {
        Self {
            is_following: Some(is_following),
            is_followed_by: None,
        }
    }
}

impl Transition {
    /// All transitions, in declaration order
    pub const ALL: [Transition; 6] = [
        Transition::SendFriendRequest,
        Transition::CancelFriendRequest,
        Transition::AcceptFriendRequest,
        Transition::DeclineFriendRequest,
        Transition::RemoveFriend,
        Transition::ToggleFollow,
    ];

    /// Get the transition name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::SendFriendRequest => "send_friend_request",
            Transition::CancelFriendRequest => "cancel_friend_request",
            Transition::AcceptFriendRequest => "accept_friend_request",
            Transition::DeclineFriendRequest => "decline_friend_request",
            Transition::RemoveFriend => "remove_friend",
            Transition::ToggleFollow => "toggle_follow",
        }
    }

    /// Parse a transition from its name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Whether the transition may start from `status`
    pub fn permits(&self, status: RelationshipStatus) -> bool {
        use crate::RelationshipStatus as S;

        match self {
            Transition::SendFriendRequest => matches!(status, S::None | S::Following),
            Transition::CancelFriendRequest => status == S::RequestSent,
            Transition::AcceptFriendRequest | Transition::DeclineFriendRequest => {
                status == S::RequestReceived
            }
            Transition::RemoveFriend => status == S::Friends,
            Transition::ToggleFollow => true,
        }
    }

    /// Whether the transition's end state already holds, making it a no-op
    ///
    /// Only sending a friend request has a fixed end state that can be
    /// re-requested harmlessly. Follow is a toggle, so it never is.
    pub fn already_satisfied(&self, status: RelationshipStatus) -> bool {
        matches!(
            (self, status),
            (Transition::SendFriendRequest, RelationshipStatus::RequestSent)
        )
    }

    /// Fold a confirmed transition into the actor's own sets
    ///
    /// Returns new sets; the input is left untouched. Only the actor's sets
    /// are produced here. The subject's mirrored sets are the service's
    /// responsibility.
    pub fn apply(
        &self,
        sets: &RelationshipSets,
        subject: AccountId,
        confirmation: &Confirmation,
    ) -> RelationshipSets {
        let mut next = sets.clone();

        match self {
            Transition::SendFriendRequest => {
                next.friend_requests_sent.insert(subject);
            }
            Transition::CancelFriendRequest => {
                next.friend_requests_sent.remove(&subject);
            }
            Transition::AcceptFriendRequest => {
                next.friend_requests_received.remove(&subject);
                next.friends.insert(subject);
            }
            Transition::DeclineFriendRequest => {
                next.friend_requests_received.remove(&subject);
            }
            Transition::RemoveFriend => {
                next.friends.remove(&subject);
            }
            Transition::ToggleFollow => {
                // Without a reported result the toggle still strictly inverts
                let following = confirmation
                    .is_following
                    .unwrap_or(!sets.is_following(subject));
                set_membership(&mut next.following, subject, following);
            }
        }

        if let Some(following) = confirmation.is_following {
            set_membership(&mut next.following, subject, following);
        }
        if let Some(followed_by) = confirmation.is_followed_by {
            set_membership(&mut next.followers, subject, followed_by);
        }

        next
    }
}

fn set_membership(
    set: &mut std::collections::HashSet<AccountId>,
    subject: AccountId,
    member: bool,
) {
    if member {
        set.insert(subject);
    } else {
        set.remove(&subject);
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Transition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid transition: {}", s))
    }
}
