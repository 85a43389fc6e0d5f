//! Command processor for relationship transitions

use crate::{CommandError, CommandMetrics, InFlightRegistry};
use rapport_domain::{
    resolve_status, AccountId, Confirmation, FriendRequest, ProfileRelation, RelationshipService,
    RelationshipSets, RelationshipStatus, Transition,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Result of a successful command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// The transition that was requested
    pub transition: Transition,

    /// Status of the actor toward the subject after the command
    pub status: RelationshipStatus,

    /// False when the command was an idempotent no-op and never reached the service
    pub dispatched: bool,

    /// Whether the actor follows the subject after the command
    pub is_following: bool,
}

/// State shared between a processor and its in-flight dispatch tasks
struct Inner<S> {
    service: S,
    accounts: Mutex<HashMap<AccountId, RelationshipSets>>,
    in_flight: InFlightRegistry,
    metrics: Mutex<CommandMetrics>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Validates and executes relationship commands against a relationship service
///
/// The processor keeps a local copy of each acting account's sets. A command
/// is checked against that copy, sent to the service, and on success the
/// confirmed change is folded back into the actor's copy. Nothing is applied
/// before the service confirms, and the processor never edits the subject's
/// sets; the service mirrors those.
///
/// At most one command per (actor, subject) pair is in flight. The service
/// call runs in its own task that holds the pair's slot, so a caller that
/// stops waiting does not leave the pair blocked: the call still settles,
/// reconciles, and frees the slot.
///
/// Commands must be issued from within a tokio runtime.
///
/// # Examples
///
/// ```
/// use rapport_domain::RelationshipStatus;
/// use rapport_processor::CommandProcessor;
/// use rapport_store::MemoryRelationshipService;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = MemoryRelationshipService::default_config();
/// let alice = service.create_account();
/// let bob = service.create_account();
///
/// let processor = CommandProcessor::new(service);
/// let outcome = processor.send_friend_request(alice, bob, Some("hi".into())).await?;
/// assert_eq!(outcome.status, RelationshipStatus::RequestSent);
/// assert_eq!(processor.status(alice, bob), RelationshipStatus::RequestSent);
/// # Ok(())
/// # }
/// ```
pub struct CommandProcessor<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for CommandProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> CommandProcessor<S>
where
    S: RelationshipService + 'static,
{
    /// Create a processor with no local account state
    pub fn new(service: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                accounts: Mutex::new(HashMap::new()),
                in_flight: InFlightRegistry::new(),
                metrics: Mutex::new(CommandMetrics::new()),
            }),
        }
    }

    /// Get the underlying relationship service
    pub fn service(&self) -> &S {
        &self.inner.service
    }

    /// Replace the local sets of an account
    pub fn load_account(&self, account: AccountId, sets: RelationshipSets) {
        lock(&self.inner.accounts).insert(account, sets);
    }

    /// Reload an account's local sets from the service
    pub async fn refresh(&self, account: AccountId) -> Result<RelationshipSets, CommandError> {
        match self.inner.service.fetch_relationships(account).await {
            Ok(sets) => {
                self.load_account(account, sets.clone());
                debug!(%account, "local relationships refreshed");
                Ok(sets)
            }
            Err(e) => {
                warn!(%account, "refresh failed: {}", e);
                Err(CommandError::RemoteFailure {
                    operation: "fetch_relationships",
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Copy of an account's local sets (empty if never loaded)
    pub fn relationships(&self, account: AccountId) -> RelationshipSets {
        lock(&self.inner.accounts)
            .get(&account)
            .cloned()
            .unwrap_or_default()
    }

    /// Current status of `viewer` toward `subject`, from the viewer's local sets
    ///
    /// Callers showing a profile should branch on own-account first; see
    /// [`profile_relation`](Self::profile_relation).
    pub fn status(&self, viewer: AccountId, subject: AccountId) -> RelationshipStatus {
        let accounts = lock(&self.inner.accounts);
        match accounts.get(&viewer) {
            Some(sets) => resolve_status(sets, subject),
            None => RelationshipStatus::None,
        }
    }

    /// How `viewer` sees `subject`'s profile
    pub fn profile_relation(&self, viewer: AccountId, subject: AccountId) -> ProfileRelation {
        if viewer == subject {
            return ProfileRelation::Own;
        }
        ProfileRelation::Other(self.status(viewer, subject))
    }

    /// Whether a command from `actor` toward `subject` is waiting on the service
    pub fn is_pending(&self, actor: AccountId, subject: AccountId) -> bool {
        self.inner.in_flight.is_pending(actor, subject)
    }

    /// Snapshot of the command counters
    pub fn metrics(&self) -> CommandMetrics {
        lock(&self.inner.metrics).clone()
    }

    /// Reset the command counters
    pub fn reset_metrics(&self) {
        lock(&self.inner.metrics).reset();
    }

    /// Pending friend requests addressed to `account`, as held by the service
    pub async fn pending_requests(
        &self,
        account: AccountId,
    ) -> Result<Vec<FriendRequest>, CommandError> {
        self.inner
            .service
            .pending_friend_requests(account)
            .await
            .map_err(|e| CommandError::RemoteFailure {
                operation: "pending_friend_requests",
                reason: e.to_string(),
            })
    }

    /// Send a friend request, optionally with a message
    ///
    /// A no-op returning `request_sent` if the request is already pending.
    pub async fn send_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
        message: Option<String>,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(actor, subject, Transition::SendFriendRequest, message)
            .await
    }

    /// Withdraw a pending friend request
    pub async fn cancel_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(actor, subject, Transition::CancelFriendRequest, None)
            .await
    }

    /// Accept the subject's friend request
    pub async fn accept_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(actor, subject, Transition::AcceptFriendRequest, None)
            .await
    }

    /// Decline the subject's friend request
    pub async fn decline_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(actor, subject, Transition::DeclineFriendRequest, None)
            .await
    }

    /// End a friendship; follow state is not touched
    pub async fn remove_friend(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(actor, subject, Transition::RemoveFriend, None)
            .await
    }

    /// Follow or unfollow; `is_following` in the outcome is the confirmed result
    pub async fn toggle_follow(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<CommandOutcome, CommandError> {
        self.execute(actor, subject, Transition::ToggleFollow, None)
            .await
    }

    /// Run any transition; `message` is only used by friend requests
    pub async fn execute(
        &self,
        actor: AccountId,
        subject: AccountId,
        transition: Transition,
        message: Option<String>,
    ) -> Result<CommandOutcome, CommandError> {
        if actor == subject {
            return Err(self.inner.reject(CommandError::InvalidTarget(actor)));
        }

        let Some(slot) = self.inner.in_flight.try_claim(actor, subject) else {
            return Err(self
                .inner
                .reject(CommandError::OperationInProgress { actor, subject }));
        };

        // Read while holding the slot so nothing for this pair can land in between
        let status = self.status(actor, subject);

        if transition.already_satisfied(status) {
            lock(&self.inner.metrics).record_no_op(transition);
            debug!(%actor, %subject, "{} already satisfied ({})", transition, status);
            return Ok(CommandOutcome {
                transition,
                status,
                dispatched: false,
                is_following: self.relationships(actor).is_following(subject),
            });
        }

        if !transition.permits(status) {
            return Err(self
                .inner
                .reject(CommandError::InvalidPrecondition { transition, status }));
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _slot = slot;
            inner.dispatch(actor, subject, transition, message).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(self.inner.reject(CommandError::RemoteFailure {
                operation: transition.as_str(),
                reason: e.to_string(),
            })),
        }
    }
}

impl<S> Inner<S>
where
    S: RelationshipService,
{
    /// Count a rejection and hand the error back
    fn reject(&self, error: CommandError) -> CommandError {
        lock(&self.metrics).record_rejection(error.kind());
        if error.is_local() {
            debug!("command rejected: {}", error);
        } else {
            warn!("command failed: {}", error);
        }
        error
    }

    /// Call the service and reconcile the actor's sets with its confirmation
    async fn dispatch(
        &self,
        actor: AccountId,
        subject: AccountId,
        transition: Transition,
        message: Option<String>,
    ) -> Result<CommandOutcome, CommandError> {
        debug!(%actor, %subject, "dispatching {}", transition);

        let service = &self.service;
        let confirmed = match transition {
            Transition::SendFriendRequest => {
                service.send_friend_request(actor, subject, message).await
            }
            Transition::CancelFriendRequest => service.cancel_friend_request(actor, subject).await,
            Transition::AcceptFriendRequest => service.accept_friend_request(actor, subject).await,
            Transition::DeclineFriendRequest => {
                service.decline_friend_request(actor, subject).await
            }
            Transition::RemoveFriend => service.remove_friend(actor, subject).await,
            Transition::ToggleFollow => service
                .toggle_follow(actor, subject)
                .await
                .map(Confirmation::following),
        };

        match confirmed {
            Ok(confirmation) => {
                let outcome = self.reconcile(actor, subject, transition, &confirmation);
                lock(&self.metrics).record_completion(transition);
                info!(%actor, %subject, "{} confirmed, status now {}", transition, outcome.status);
                Ok(outcome)
            }
            Err(e) => Err(self.reject(CommandError::RemoteFailure {
                operation: transition.as_str(),
                reason: e.to_string(),
            })),
        }
    }

    fn reconcile(
        &self,
        actor: AccountId,
        subject: AccountId,
        transition: Transition,
        confirmation: &Confirmation,
    ) -> CommandOutcome {
        let mut accounts = lock(&self.accounts);
        let sets = accounts.entry(actor).or_default();
        *sets = transition.apply(sets, subject, confirmation);

        CommandOutcome {
            transition,
            status: resolve_status(sets, subject),
            dispatched: true,
            is_following: sets.is_following(subject),
        }
    }
}
