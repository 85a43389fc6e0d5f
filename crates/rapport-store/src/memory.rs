//! In-memory relationship service

use crate::{StoreConfig, StoreError};
use async_trait::async_trait;
use rapport_domain::{
    AccountId, Confirmation, FriendRequest, FriendRequestStatus, RelationshipService,
    RelationshipSets,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current timestamp in seconds since Unix epoch
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Every account's sets plus the request ledger, guarded as one unit
#[derive(Debug, Default)]
struct Directory {
    accounts: HashMap<AccountId, RelationshipSets>,
    requests: Vec<FriendRequest>,
}

impl Directory {
    fn sets(&self, id: AccountId) -> Result<&RelationshipSets, StoreError> {
        self.accounts.get(&id).ok_or(StoreError::UnknownAccount(id))
    }

    fn sets_mut(&mut self, id: AccountId) -> Result<&mut RelationshipSets, StoreError> {
        self.accounts.get_mut(&id).ok_or(StoreError::UnknownAccount(id))
    }

    /// Close the pending ledger entry from `from` to `to`, if there is one
    fn close_request(&mut self, from: AccountId, to: AccountId, status: FriendRequestStatus) {
        let now = current_timestamp();
        if let Some(request) = self
            .requests
            .iter_mut()
            .find(|r| r.is_pending_between(from, to))
        {
            request.close(status, now);
        }
    }
}

/// Relationship service holding every account in process memory
///
/// All mutations of both accounts in a pair happen under one lock, which
/// makes each call atomic from any caller's point of view. Latency is
/// simulated before the lock is taken, never while holding it.
///
/// # Examples
///
/// ```
/// use rapport_store::{MemoryRelationshipService, StoreConfig};
///
/// let service = MemoryRelationshipService::new(StoreConfig::default());
/// let alice = service.create_account();
/// assert!(service.snapshot(alice).unwrap().friends.is_empty());
/// assert_eq!(service.call_count(), 0);
/// ```
#[derive(Debug)]
pub struct MemoryRelationshipService {
    config: StoreConfig,
    directory: Mutex<Directory>,
    calls: AtomicUsize,
    pending_failures: AtomicUsize,
}

impl MemoryRelationshipService {
    /// Create an empty service with the given configuration
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            directory: Mutex::new(Directory::default()),
            calls: AtomicUsize::new(0),
            pending_failures: AtomicUsize::new(0),
        }
    }

    /// Create an empty service with default configuration
    pub fn default_config() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Get the service configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn directory(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new account with empty sets
    pub fn create_account(&self) -> AccountId {
        let id = AccountId::new();
        self.insert_account(id);
        id
    }

    /// Register an account under a known id
    ///
    /// Returns false if the account already exists; its sets are kept.
    pub fn insert_account(&self, id: AccountId) -> bool {
        let mut directory = self.directory();
        if directory.accounts.contains_key(&id) {
            return false;
        }
        directory.accounts.insert(id, RelationshipSets::new());
        tracing::debug!(account = %id, "account created");
        true
    }

    /// Ids of every known account
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.directory().accounts.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Copy of an account's current sets
    pub fn snapshot(&self, id: AccountId) -> Option<RelationshipSets> {
        self.directory().accounts.get(&id).cloned()
    }

    /// Every ledger entry sent or received by `account`, oldest first
    pub fn request_history(&self, account: AccountId) -> Vec<FriendRequest> {
        self.directory()
            .requests
            .iter()
            .filter(|r| r.from == account || r.to == account)
            .cloned()
            .collect()
    }

    /// Number of service calls received so far, including failed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next `count` service calls fail with [`StoreError::InjectedFailure`]
    pub fn inject_failures(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Make two existing accounts friends without going through a request
    ///
    /// A pending request between the two, in either direction, is closed as
    /// accepted.
    pub fn seed_friendship(&self, a: AccountId, b: AccountId) -> Result<(), StoreError> {
        if a == b {
            return Err(StoreError::SelfTarget);
        }
        let mut directory = self.directory();
        directory.sets(a)?;
        directory.sets(b)?;

        directory.close_request(a, b, FriendRequestStatus::Accepted);
        directory.close_request(b, a, FriendRequestStatus::Accepted);
        for (owner, other) in [(a, b), (b, a)] {
            let sets = directory.sets_mut(owner)?;
            sets.friend_requests_sent.remove(&other);
            sets.friend_requests_received.remove(&other);
            sets.friends.insert(other);
        }
        Ok(())
    }

    /// Make `follower` follow `followee` without a service call
    pub fn seed_follow(&self, follower: AccountId, followee: AccountId) -> Result<(), StoreError> {
        if follower == followee {
            return Err(StoreError::SelfTarget);
        }
        let mut directory = self.directory();
        directory.sets(followee)?;
        directory.sets_mut(follower)?.following.insert(followee);
        directory.sets_mut(followee)?.followers.insert(follower);
        Ok(())
    }

    /// Audit every invariant across all accounts
    ///
    /// Checks self-reference, friend/request exclusion, friendship and
    /// request symmetry, follow mirroring, dangling ids, and that pending
    /// ledger entries match the request sets in both directions.
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        let directory = self.directory();
        let violation = |msg: String| Err(StoreError::InvariantViolation(msg));

        for (id, sets) in &directory.accounts {
            if let Err(e) = sets.validate(*id) {
                return violation(format!("{}: {}", id, e));
            }

            for other in &sets.friends {
                match directory.accounts.get(other) {
                    Some(o) if o.friends.contains(id) => {}
                    _ => return violation(format!("{} lists {} as friend one-sidedly", id, other)),
                }
            }
            for other in &sets.friend_requests_sent {
                match directory.accounts.get(other) {
                    Some(o) if o.friend_requests_received.contains(id) => {}
                    _ => return violation(format!("request {} -> {} not mirrored", id, other)),
                }
            }
            for other in &sets.friend_requests_received {
                match directory.accounts.get(other) {
                    Some(o) if o.friend_requests_sent.contains(id) => {}
                    _ => return violation(format!("request {} -> {} not mirrored", other, id)),
                }
            }
            for other in &sets.following {
                match directory.accounts.get(other) {
                    Some(o) if o.followers.contains(id) => {}
                    _ => return violation(format!("{} follows {} without mirror", id, other)),
                }
            }
            for other in &sets.followers {
                match directory.accounts.get(other) {
                    Some(o) if o.following.contains(id) => {}
                    _ => return violation(format!("{} followed by {} without mirror", id, other)),
                }
            }
        }

        for request in &directory.requests {
            if request.status != FriendRequestStatus::Pending {
                continue;
            }
            let sent = directory
                .accounts
                .get(&request.from)
                .is_some_and(|s| s.friend_requests_sent.contains(&request.to));
            if !sent {
                return violation(format!("ledger request {} has no matching sets", request.id));
            }
        }

        for (id, sets) in &directory.accounts {
            for other in &sets.friend_requests_sent {
                let recorded = directory
                    .requests
                    .iter()
                    .any(|r| r.is_pending_between(*id, *other));
                if !recorded {
                    return violation(format!(
                        "request {} -> {} has no pending ledger entry",
                        id, other
                    ));
                }
            }
        }

        Ok(())
    }

    /// Shared prologue of every service call
    ///
    /// Counts the call, waits out the simulated latency and consumes an
    /// injected failure if one is armed.
    async fn begin_call(&self, operation: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.config.latency() {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            tracing::warn!("Injected failure for {}", operation);
            return Err(StoreError::InjectedFailure);
        }

        Ok(())
    }

    /// Run a mutation on a pair of existing, distinct accounts under the lock
    async fn mutate_pair<T>(
        &self,
        operation: &str,
        actor: AccountId,
        subject: AccountId,
        f: impl FnOnce(&mut Directory) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.begin_call(operation).await?;

        if actor == subject {
            return Err(StoreError::SelfTarget);
        }

        let mut directory = self.directory();
        directory.sets(actor)?;
        directory.sets(subject)?;

        let result = f(&mut directory);
        match &result {
            Ok(_) => tracing::debug!(%actor, %subject, "{} applied", operation),
            Err(e) => tracing::debug!(%actor, %subject, "{} rejected: {}", operation, e),
        }
        result
    }
}

impl Default for MemoryRelationshipService {
    fn default() -> Self {
        Self::default_config()
    }
}

#[async_trait]
impl RelationshipService for MemoryRelationshipService {
    type Error = StoreError;

    async fn fetch_relationships(&self, account: AccountId) -> Result<RelationshipSets, StoreError> {
        self.begin_call("fetch_relationships").await?;
        self.directory().sets(account).cloned()
    }

    async fn send_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
        message: Option<String>,
    ) -> Result<Confirmation, StoreError> {
        self.mutate_pair("send_friend_request", actor, subject, |dir| {
            let sets = dir.sets(actor)?;
            if sets.is_friend(subject) {
                return Err(StoreError::AlreadyFriends);
            }
            if sets.has_sent_request(subject) {
                return Err(StoreError::RequestAlreadyPending);
            }
            if sets.has_received_request(subject) {
                return Err(StoreError::ReverseRequestPending);
            }

            dir.requests
                .push(FriendRequest::new(actor, subject, message, current_timestamp()));
            dir.sets_mut(actor)?.friend_requests_sent.insert(subject);
            dir.sets_mut(subject)?.friend_requests_received.insert(actor);
            Ok(Confirmation::unchanged())
        })
        .await
    }

    async fn cancel_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, StoreError> {
        self.mutate_pair("cancel_friend_request", actor, subject, |dir| {
            if !dir.sets(actor)?.has_sent_request(subject) {
                return Err(StoreError::RequestNotFound);
            }

            dir.close_request(actor, subject, FriendRequestStatus::Cancelled);
            dir.sets_mut(actor)?.friend_requests_sent.remove(&subject);
            dir.sets_mut(subject)?.friend_requests_received.remove(&actor);
            Ok(Confirmation::unchanged())
        })
        .await
    }

    async fn accept_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, StoreError> {
        let follow_on_accept = self.config.follow_on_accept;

        self.mutate_pair("accept_friend_request", actor, subject, |dir| {
            if !dir.sets(actor)?.has_received_request(subject) {
                return Err(StoreError::RequestNotFound);
            }

            dir.close_request(subject, actor, FriendRequestStatus::Accepted);

            let mine = dir.sets_mut(actor)?;
            mine.friend_requests_received.remove(&subject);
            mine.friends.insert(subject);
            if follow_on_accept {
                mine.following.insert(subject);
                mine.followers.insert(subject);
            }

            let theirs = dir.sets_mut(subject)?;
            theirs.friend_requests_sent.remove(&actor);
            theirs.friends.insert(actor);
            if follow_on_accept {
                theirs.following.insert(actor);
                theirs.followers.insert(actor);
            }

            if follow_on_accept {
                Ok(Confirmation {
                    is_following: Some(true),
                    is_followed_by: Some(true),
                })
            } else {
                Ok(Confirmation::unchanged())
            }
        })
        .await
    }

    async fn decline_friend_request(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, StoreError> {
        self.mutate_pair("decline_friend_request", actor, subject, |dir| {
            if !dir.sets(actor)?.has_received_request(subject) {
                return Err(StoreError::RequestNotFound);
            }

            dir.close_request(subject, actor, FriendRequestStatus::Declined);
            dir.sets_mut(actor)?.friend_requests_received.remove(&subject);
            dir.sets_mut(subject)?.friend_requests_sent.remove(&actor);
            Ok(Confirmation::unchanged())
        })
        .await
    }

    async fn remove_friend(
        &self,
        actor: AccountId,
        subject: AccountId,
    ) -> Result<Confirmation, StoreError> {
        self.mutate_pair("remove_friend", actor, subject, |dir| {
            if !dir.sets(actor)?.is_friend(subject) {
                return Err(StoreError::NotFriends);
            }

            // Follow state is left as it is
            dir.sets_mut(actor)?.friends.remove(&subject);
            dir.sets_mut(subject)?.friends.remove(&actor);
            Ok(Confirmation::unchanged())
        })
        .await
    }

    async fn toggle_follow(&self, actor: AccountId, subject: AccountId) -> Result<bool, StoreError> {
        self.mutate_pair("toggle_follow", actor, subject, |dir| {
            let now_following = !dir.sets(actor)?.is_following(subject);

            if now_following {
                dir.sets_mut(actor)?.following.insert(subject);
                dir.sets_mut(subject)?.followers.insert(actor);
            } else {
                dir.sets_mut(actor)?.following.remove(&subject);
                dir.sets_mut(subject)?.followers.remove(&actor);
            }
            Ok(now_following)
        })
        .await
    }

    async fn pending_friend_requests(
        &self,
        account: AccountId,
    ) -> Result<Vec<FriendRequest>, StoreError> {
        self.begin_call("pending_friend_requests").await?;

        let directory = self.directory();
        directory.sets(account)?;
        Ok(directory
            .requests
            .iter()
            .filter(|r| r.to == account && r.status == FriendRequestStatus::Pending)
            .cloned()
            .collect())
    }
}
