//! In-flight tracking per (actor, subject) pair

use rapport_domain::AccountId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Pair = (AccountId, AccountId);

/// Set of (actor, subject) pairs with a command waiting on the service
///
/// Cloning shares the same set.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    pairs: Arc<Mutex<HashSet<Pair>>>,
}

impl InFlightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn pairs(&self) -> MutexGuard<'_, HashSet<Pair>> {
        self.pairs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the pair, or return `None` if a command for it is already in flight
    ///
    /// The claim lasts until the returned guard is dropped.
    pub fn try_claim(&self, actor: AccountId, subject: AccountId) -> Option<PairGuard> {
        if !self.pairs().insert((actor, subject)) {
            return None;
        }
        Some(PairGuard {
            registry: self.clone(),
            pair: (actor, subject),
        })
    }

    /// Whether a command for the pair is in flight
    pub fn is_pending(&self, actor: AccountId, subject: AccountId) -> bool {
        self.pairs().contains(&(actor, subject))
    }

    /// Number of pairs currently in flight
    pub fn len(&self) -> usize {
        self.pairs().len()
    }

    /// Whether no pair is in flight
    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }
}

/// Claim on one pair; releases it on drop
#[derive(Debug)]
pub struct PairGuard {
    registry: InFlightRegistry,
    pair: Pair,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        self.registry.pairs().remove(&self.pair);
    }
}
