//! Rapport Store
//!
//! In-memory implementation of the [`RelationshipService`] trait.
//!
//! # Overview
//!
//! The store is the authority over every account's relationship sets. Each
//! mutating call updates the acting account and the mirrored entries on the
//! subject's account under a single lock, so no reader ever sees one side of a
//! friendship without the other.
//!
//! Alongside the sets it keeps a friend request ledger (message, outcome,
//! timestamps) and can:
//! - simulate network latency before each call
//! - inject failures for the next N calls
//! - audit the cross-account invariants
//!
//! # Usage
//!
//! ```
//! use rapport_domain::{resolve_status, RelationshipService, RelationshipStatus};
//! use rapport_store::{MemoryRelationshipService, StoreConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MemoryRelationshipService::new(StoreConfig::default());
//! let alice = service.create_account();
//! let bob = service.create_account();
//!
//! service.send_friend_request(alice, bob, Some("hi".to_string())).await?;
//!
//! let bob_sets = service.fetch_relationships(bob).await?;
//! assert_eq!(resolve_status(&bob_sets, alice), RelationshipStatus::RequestReceived);
//! service.check_invariants()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [store]
//! latency_ms = 500
//! follow_on_accept = true
//! ```
//!
//! [`RelationshipService`]: rapport_domain::RelationshipService

#![warn(missing_docs)]

mod config;
mod error;
mod memory;

pub use config::StoreConfig;
pub use error::StoreError;
pub use memory::MemoryRelationshipService;
