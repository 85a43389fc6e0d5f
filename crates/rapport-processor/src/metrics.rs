//! Metrics collection for relationship commands

use crate::ErrorKind;
use rapport_domain::Transition;
use std::collections::HashMap;

/// Counters for commands handled by a processor
#[derive(Debug, Clone, Default)]
pub struct CommandMetrics {
    /// Transitions confirmed by the service
    pub completed: HashMap<Transition, usize>,

    /// Commands answered without a service call because the end state already held
    pub no_ops: HashMap<Transition, usize>,

    /// Commands that ended in an error, by error kind
    pub rejected: HashMap<ErrorKind, usize>,
}

impl CommandMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed transition
    pub fn record_completion(&mut self, transition: Transition) {
        *self.completed.entry(transition).or_insert(0) += 1;
    }

    /// Record an idempotent no-op
    pub fn record_no_op(&mut self, transition: Transition) {
        *self.no_ops.entry(transition).or_insert(0) += 1;
    }

    /// Record a failed or rejected command
    pub fn record_rejection(&mut self, kind: ErrorKind) {
        *self.rejected.entry(kind).or_insert(0) += 1;
    }

    /// Total confirmed transitions
    pub fn total_completed(&self) -> usize {
        self.completed.values().sum()
    }

    /// Total idempotent no-ops
    pub fn total_no_ops(&self) -> usize {
        self.no_ops.values().sum()
    }

    /// Total rejected or failed commands
    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Count for one error kind
    pub fn rejected_with(&self, kind: ErrorKind) -> usize {
        self.rejected.get(&kind).copied().unwrap_or(0)
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.completed.clear();
        self.no_ops.clear();
        self.rejected.clear();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Command Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Completed: {}", self.total_completed()),
            format!("No-ops: {}", self.total_no_ops()),
            format!("Rejected: {}", self.total_rejected()),
        ];

        if !self.completed.is_empty() {
            lines.push(String::new());
            lines.push("Completed by transition:".to_string());
            for transition in Transition::ALL {
                if let Some(count) = self.completed.get(&transition) {
                    lines.push(format!("  {}: {}", transition, count));
                }
            }
        }

        if !self.rejected.is_empty() {
            lines.push(String::new());
            lines.push("Rejected by kind:".to_string());
            let mut kinds: Vec<_> = self.rejected.iter().collect();
            kinds.sort_by_key(|(kind, _)| kind.as_str());
            for (kind, count) in kinds {
                lines.push(format!("  {}: {}", kind, count));
            }
        }

        lines.join("\n")
    }
}
