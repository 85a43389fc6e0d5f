//! Scenario execution.

use crate::error::{CliError, Result};
use crate::script::{Expectation, PlannedStep, Scenario};
use rapport_domain::{AccountId, ProfileRelation};
use rapport_processor::{CommandError, CommandOutcome, CommandProcessor};
use rapport_store::{MemoryRelationshipService, StoreConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The command succeeded
    Ok {
        /// Actor's status toward the subject afterwards
        status: String,
        /// False for an idempotent no-op
        dispatched: bool,
        /// Whether the actor follows the subject afterwards
        is_following: bool,
    },
    /// The command was rejected or failed
    Error {
        /// Error kind tag
        kind: String,
        /// Error message
        message: String,
    },
}

impl StepOutcome {
    fn from_result(result: &std::result::Result<CommandOutcome, CommandError>) -> Self {
        match result {
            Ok(outcome) => StepOutcome::Ok {
                status: outcome.status.to_string(),
                dispatched: outcome.dispatched,
                is_following: outcome.is_following,
            },
            Err(e) => StepOutcome::Error {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }

    /// Status tag on success, error kind tag on failure
    pub fn tag(&self) -> &str {
        match self {
            StepOutcome::Ok { status, .. } => status,
            StepOutcome::Error { kind, .. } => kind,
        }
    }

    /// Whether the step succeeded
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok { .. })
    }
}

/// Report for one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 1-based position in the script
    pub index: usize,
    /// Acting account name
    pub actor: String,
    /// Transition name
    pub action: String,
    /// Target account name
    pub subject: String,
    /// What happened
    pub outcome: StepOutcome,
    /// Expected status or error kind, if the script gave one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Whether the expectation held
    #[serde(skip_serializing_if = "Option::is_none")]
    pub met: Option<bool>,
}

/// Command counters at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    /// Commands confirmed by the service
    pub completed: usize,
    /// Idempotent no-ops
    pub no_ops: usize,
    /// Rejected or failed commands
    pub rejected: usize,
    /// Printable summary
    #[serde(skip)]
    pub summary: String,
}

/// Outcome of a whole scenario.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scenario title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Account names, in display order
    pub accounts: Vec<String>,
    /// Per-step results
    pub steps: Vec<StepReport>,
    /// Final status of each viewer toward every other account
    pub matrix: BTreeMap<String, BTreeMap<String, String>>,
    /// Cross-account invariant violation found after the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invariant_violation: Option<String>,
    /// Command counters
    pub metrics: MetricsReport,
}

impl RunReport {
    /// Number of steps whose expectation did not hold
    pub fn failed_expectations(&self) -> usize {
        self.steps.iter().filter(|s| s.met == Some(false)).count()
    }
}

/// Runs a scenario against a fresh in-memory service.
pub struct ScenarioRunner {
    scenario: Scenario,
    ids: Vec<AccountId>,
    processor: CommandProcessor<MemoryRelationshipService>,
}

impl ScenarioRunner {
    /// Create the scenario's accounts and apply its seed.
    ///
    /// Fails with [`CliError::Script`] if a seed pair or step names an
    /// account index the scenario does not declare.
    pub fn new(scenario: Scenario, store: StoreConfig) -> Result<Self> {
        check_indexes(&scenario)?;

        let service = MemoryRelationshipService::new(store);
        let ids: Vec<AccountId> = scenario
            .accounts
            .iter()
            .map(|_| service.create_account())
            .collect();

        for &(a, b) in &scenario.friendships {
            service.seed_friendship(ids[a], ids[b])?;
        }
        for &(follower, followee) in &scenario.follows {
            service.seed_follow(ids[follower], ids[followee])?;
        }

        Ok(Self {
            scenario,
            ids,
            processor: CommandProcessor::new(service),
        })
    }

    /// The processor driven by this runner
    pub fn processor(&self) -> &CommandProcessor<MemoryRelationshipService> {
        &self.processor
    }

    /// Run every step in order and build the report.
    ///
    /// Steps that fail do not stop the run; their errors are part of the report.
    pub async fn run(&self) -> Result<RunReport> {
        for &id in &self.ids {
            self.processor.refresh(id).await?;
        }

        let mut steps = Vec::with_capacity(self.scenario.steps.len());
        for (i, step) in self.scenario.steps.iter().enumerate() {
            steps.push(self.run_step(i + 1, step).await?);
        }

        let metrics = self.processor.metrics();
        let invariant_violation = self
            .processor
            .service()
            .check_invariants()
            .err()
            .map(|e| e.to_string());
        if let Some(violation) = &invariant_violation {
            warn!("{}", violation);
        }

        Ok(RunReport {
            name: self.scenario.name.clone(),
            accounts: self.scenario.accounts.clone(),
            steps,
            matrix: self.matrix(),
            invariant_violation,
            metrics: MetricsReport {
                completed: metrics.total_completed(),
                no_ops: metrics.total_no_ops(),
                rejected: metrics.total_rejected(),
                summary: metrics.summary(),
            },
        })
    }

    async fn run_step(&self, index: usize, step: &PlannedStep) -> Result<StepReport> {
        let service = self.processor.service();
        let actor = self.ids[step.actor];
        let subject = self.ids[step.subject];

        if step.fail {
            service.inject_failures(1);
        }

        let result = self
            .processor
            .execute(actor, subject, step.transition, step.message.clone())
            .await;

        // A failure armed for a step that never reached the service must not leak
        service.inject_failures(0);

        // Pick up the service's mirrored changes for the subject
        if matches!(result, Ok(CommandOutcome { dispatched: true, .. })) {
            self.processor.refresh(subject).await?;
        }

        let outcome = StepOutcome::from_result(&result);
        let met = step.expect.map(|expect| match (expect, &result) {
            (Expectation::Status(status), Ok(outcome)) => outcome.status == status,
            (Expectation::Error(kind), Err(e)) => e.kind() == kind,
            _ => false,
        });

        let actor_name = &self.scenario.accounts[step.actor];
        let subject_name = &self.scenario.accounts[step.subject];
        match met {
            Some(false) => warn!(
                "step {}: {} {} {} gave {}, expected {}",
                index,
                actor_name,
                step.transition,
                subject_name,
                outcome.tag(),
                step.expect.map(|e| e.to_string()).unwrap_or_default()
            ),
            _ => info!(
                "step {}: {} {} {} -> {}",
                index,
                actor_name,
                step.transition,
                subject_name,
                outcome.tag()
            ),
        }

        Ok(StepReport {
            index,
            actor: actor_name.clone(),
            action: step.transition.to_string(),
            subject: subject_name.clone(),
            outcome,
            expected: step.expect.map(|e| e.to_string()),
            met,
        })
    }

    /// Status of each viewer toward every other account, from local views
    fn matrix(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut matrix = BTreeMap::new();
        for (vi, viewer) in self.ids.iter().enumerate() {
            let mut row = BTreeMap::new();
            for (si, subject) in self.ids.iter().enumerate() {
                if let ProfileRelation::Other(status) =
                    self.processor.profile_relation(*viewer, *subject)
                {
                    row.insert(self.scenario.accounts[si].clone(), status.to_string());
                }
            }
            debug!(viewer = %self.scenario.accounts[vi], "{} relations", row.len());
            matrix.insert(self.scenario.accounts[vi].clone(), row);
        }
        matrix
    }
}

fn check_indexes(scenario: &Scenario) -> Result<()> {
    let count = scenario.accounts.len();
    let seeds = scenario
        .friendships
        .iter()
        .chain(&scenario.follows)
        .map(|&(a, b)| ("seed", a, b));
    let steps = scenario.steps.iter().map(|s| ("step", s.actor, s.subject));

    for (what, a, b) in seeds.chain(steps) {
        if let Some(index) = [a, b].into_iter().find(|&i| i >= count) {
            return Err(CliError::Script(format!(
                "{} refers to account #{} but only {} declared",
                what, index, count
            )));
        }
    }
    Ok(())
}

/// Run a scenario on a fresh in-memory service.
pub async fn run_scenario(scenario: Scenario, store: StoreConfig) -> Result<RunReport> {
    ScenarioRunner::new(scenario, store)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Script;

    fn scenario(toml: &str) -> Scenario {
        Script::from_toml(toml).unwrap().plan().unwrap()
    }

    #[tokio::test]
    async fn test_send_then_decline() {
        let report = run_scenario(
            scenario(
                r#"
                accounts = ["alice", "bob"]

                [[steps]]
                actor = "alice"
                action = "send_friend_request"
                subject = "bob"
                message = "hi"
                expect = "request_sent"

                [[steps]]
                actor = "bob"
                action = "decline_friend_request"
                subject = "alice"
                expect = "none"
                "#,
            ),
            StoreConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed_expectations(), 0);
        assert_eq!(report.steps[0].outcome.tag(), "request_sent");
        assert_eq!(report.matrix["alice"]["bob"], "none");
        assert_eq!(report.matrix["bob"]["alice"], "none");
        assert!(!report.matrix["alice"].contains_key("alice"));
        assert!(report.invariant_violation.is_none());
        assert_eq!(report.metrics.completed, 2);
    }

    #[tokio::test]
    async fn test_errors_are_reported_not_raised() {
        let report = run_scenario(
            scenario(
                r#"
                accounts = ["alice", "bob"]

                [[steps]]
                actor = "alice"
                action = "toggle_follow"
                subject = "alice"
                expect = "invalid_target"

                [[steps]]
                actor = "alice"
                action = "accept_friend_request"
                subject = "bob"
                expect = "friends"

                [[steps]]
                actor = "alice"
                action = "toggle_follow"
                subject = "bob"
                fail = true
                expect = "remote_failure"
                "#,
            ),
            StoreConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed_expectations(), 1);
        assert_eq!(report.steps[1].met, Some(false));
        assert_eq!(report.steps[1].outcome.tag(), "invalid_precondition");
        assert!(!report.steps[2].outcome.is_ok());
        assert_eq!(report.matrix["alice"]["bob"], "none");
        assert_eq!(report.metrics.rejected, 3);
    }

    #[tokio::test]
    async fn test_unconsumed_failure_is_disarmed() {
        let runner = ScenarioRunner::new(
            scenario(
                r#"
                accounts = ["alice", "bob"]

                [[steps]]
                actor = "alice"
                action = "remove_friend"
                subject = "bob"
                fail = true

                [[steps]]
                actor = "alice"
                action = "toggle_follow"
                subject = "bob"
                expect = "following"
                "#,
            ),
            StoreConfig::default(),
        )
        .unwrap();

        let report = runner.run().await.unwrap();
        assert_eq!(report.steps[0].outcome.tag(), "invalid_precondition");
        assert_eq!(report.steps[1].met, Some(true));
        assert_eq!(report.matrix["bob"]["alice"], "none");
        assert_eq!(runner.processor().metrics().total_completed(), 1);
    }

    #[test]
    fn test_out_of_range_index_is_a_script_error() {
        let mut planned = scenario(
            r#"
            accounts = ["alice", "bob"]

            [[steps]]
            actor = "alice"
            action = "toggle_follow"
            subject = "bob"
            "#,
        );

        let mut bad_seed = planned.clone();
        bad_seed.friendships.push((0, 5));
        assert!(matches!(
            ScenarioRunner::new(bad_seed, StoreConfig::default()),
            Err(CliError::Script(_))
        ));

        planned.steps[0].actor = 7;
        assert!(matches!(
            ScenarioRunner::new(planned, StoreConfig::default()),
            Err(CliError::Script(msg)) if msg.contains("#7")
        ));
    }

    #[tokio::test]
    async fn test_seed_is_visible_before_first_step() {
        let report = run_scenario(
            scenario(
                r#"
                accounts = ["alice", "bob", "carol"]

                [seed]
                friendships = [["alice", "bob"]]
                follows = [["carol", "alice"]]
                "#,
            ),
            StoreConfig::default(),
        )
        .await
        .unwrap();

        assert!(report.steps.is_empty());
        assert_eq!(report.matrix["alice"]["bob"], "friends");
        assert_eq!(report.matrix["bob"]["alice"], "friends");
        assert_eq!(report.matrix["carol"]["alice"], "following");
        assert_eq!(report.matrix["alice"]["carol"], "none");
    }
}
