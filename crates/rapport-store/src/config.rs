//! Configuration for the in-memory relationship service

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`MemoryRelationshipService`](crate::MemoryRelationshipService)
///
/// # Examples
///
/// ```
/// use rapport_store::StoreConfig;
///
/// let config = StoreConfig::default();
/// assert_eq!(config.latency_ms, 0);
/// assert!(config.follow_on_accept);
///
/// let config = StoreConfig::simulated_network();
/// assert_eq!(config.latency_ms, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Delay applied before every service call (in milliseconds)
    /// Default: 0
    #[serde(default)]
    pub latency_ms: u64,

    /// Make both accounts follow each other when a friend request is accepted
    /// Default: true
    #[serde(default = "default_follow_on_accept")]
    pub follow_on_accept: bool,
}

fn default_follow_on_accept() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            follow_on_accept: true,
        }
    }
}

impl StoreConfig {
    /// Configuration with a half-second delay per call, roughly a slow mobile link
    pub fn simulated_network() -> Self {
        Self {
            latency_ms: 500,
            ..Self::default()
        }
    }

    /// Get the per-call latency, if any
    pub fn latency(&self) -> Option<Duration> {
        (self.latency_ms > 0).then(|| Duration::from_millis(self.latency_ms))
    }
}
