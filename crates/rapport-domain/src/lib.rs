//! Rapport Domain Layer
//!
//! This crate holds the relationship model shared by every other Rapport crate:
//! account identifiers, the per-account membership sets, the derived
//! relationship status, the six transitions that change it, and the trait
//! describing the remote relationship service.
//!
//! ## Key Concepts
//!
//! - **RelationshipSets**: followers, following, friends, sent and received
//!   friend requests, all owned by a single account
//! - **RelationshipStatus**: the one status a viewer has toward a subject,
//!   always derived from the sets and never stored
//! - **Transition**: one of six user-initiated changes (send, cancel, accept,
//!   decline, remove, toggle follow)
//! - **Confirmation**: the delta a relationship service reports back after it
//!   applied a transition to both accounts
//!
//! ## Architecture
//!
//! - No I/O and no locking; everything here is plain data and pure functions
//! - The service seam is a trait; implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod request;
pub mod sets;
pub mod status;
pub mod traits;
pub mod transition;

// Re-exports for convenience
pub use account::AccountId;
pub use request::{FriendRequest, FriendRequestStatus, RequestId};
pub use sets::{InvariantViolation, RelationshipSets};
pub use status::{resolve_status, ProfileRelation, RelationshipStatus};
pub use traits::RelationshipService;
pub use transition::{Confirmation, Transition};
