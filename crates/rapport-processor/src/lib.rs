//! Rapport Command Processor
//!
//! Turns one user-initiated relationship intent into exactly one call to the
//! relationship service, then reconciles the acting account's local sets with
//! what the service confirmed.
//!
//! # Overview
//!
//! The processor is responsible for:
//! - **Validation**: self-targets and transitions that do not apply to the
//!   current status are rejected before any service call
//! - **Serialization per pair**: one command per (actor, subject) at a time;
//!   a second one is rejected as `operation_in_progress`
//! - **Idempotency**: re-sending a friend request that is already pending is a
//!   no-op that reports `request_sent`
//! - **Reconciliation**: confirmed changes are folded into the actor's local
//!   sets; failures leave them untouched
//! - **Metrics**: counts of completed, no-op and rejected commands
//!
//! # Transitions
//!
//! | Command | Allowed from | Status after |
//! |---------|--------------|--------------|
//! | `send_friend_request` | none, following | request_sent |
//! | `cancel_friend_request` | request_sent | none / following |
//! | `accept_friend_request` | request_received | friends |
//! | `decline_friend_request` | request_received | none / following |
//! | `remove_friend` | friends | none / following |
//! | `toggle_follow` | any | recomputed |
//!
//! # Usage
//!
//! ```
//! use rapport_processor::{CommandProcessor, ErrorKind};
//! use rapport_store::MemoryRelationshipService;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = MemoryRelationshipService::default_config();
//! let alice = service.create_account();
//! let processor = CommandProcessor::new(service);
//!
//! let err = processor.toggle_follow(alice, alice).await.unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidTarget);
//! assert_eq!(processor.service().call_count(), 0);
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod guard;
mod metrics;
mod processor;

pub use error::{CommandError, ErrorKind};
pub use guard::{InFlightRegistry, PairGuard};
pub use metrics::CommandMetrics;
pub use processor::{CommandOutcome, CommandProcessor};
