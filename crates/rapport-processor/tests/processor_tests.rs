//! Integration tests for rapport-processor
//!
//! These drive the processor against the in-memory relationship service and
//! check both the acting account's local view and the service's mirrored state.

use async_trait::async_trait;
use rapport_domain::{
    AccountId, Confirmation, FriendRequest, FriendRequestStatus, ProfileRelation,
    RelationshipService, RelationshipSets, RelationshipStatus, Transition,
};
use rapport_processor::{CommandError, CommandProcessor, ErrorKind};
use rapport_store::{MemoryRelationshipService, StoreConfig};
use std::time::Duration;

type Processor = CommandProcessor<MemoryRelationshipService>;

fn setup_with(config: StoreConfig) -> (Processor, AccountId, AccountId) {
    let service = MemoryRelationshipService::new(config);
    let a = service.create_account();
    let b = service.create_account();
    (CommandProcessor::new(service), a, b)
}

fn setup() -> (Processor, AccountId, AccountId) {
    setup_with(StoreConfig::default())
}

fn assert_no_requests_between(processor: &Processor, a: AccountId, b: AccountId) {
    let a_sets = processor.service().snapshot(a).unwrap();
    let b_sets = processor.service().snapshot(b).unwrap();
    assert!(!a_sets.has_sent_request(b) && !a_sets.has_received_request(b));
    assert!(!b_sets.has_sent_request(a) && !b_sets.has_received_request(a));
}

#[tokio::test]
async fn test_send_then_decline_scenario() {
    let (processor, a, b) = setup();

    let sent = processor
        .send_friend_request(a, b, Some("hi".to_string()))
        .await
        .unwrap();
    assert_eq!(sent.status, RelationshipStatus::RequestSent);
    assert!(sent.dispatched);
    assert_eq!(processor.status(a, b), RelationshipStatus::RequestSent);

    processor.refresh(b).await.unwrap();
    assert_eq!(processor.status(b, a), RelationshipStatus::RequestReceived);

    let pending = processor.pending_requests(b).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].from, a);
    assert_eq!(pending[0].message.as_deref(), Some("hi"));

    let declined = processor.decline_friend_request(b, a).await.unwrap();
    assert_eq!(declined.status, RelationshipStatus::None);

    processor.refresh(a).await.unwrap();
    assert_eq!(processor.status(a, b), RelationshipStatus::None);
    assert_eq!(processor.status(b, a), RelationshipStatus::None);
    assert_no_requests_between(&processor, a, b);
    assert!(processor.service().check_invariants().is_ok());
}

#[tokio::test]
async fn test_send_then_accept_makes_both_friends() {
    let (processor, a, b) = setup();

    processor.send_friend_request(a, b, None).await.unwrap();
    processor.refresh(b).await.unwrap();

    let accepted = processor.accept_friend_request(b, a).await.unwrap();
    assert_eq!(accepted.status, RelationshipStatus::Friends);
    assert!(accepted.is_following);

    processor.refresh(a).await.unwrap();
    assert_eq!(processor.status(a, b), RelationshipStatus::Friends);
    assert_eq!(processor.status(b, a), RelationshipStatus::Friends);

    // Local reconciliation matches the service for the acting account
    assert_eq!(processor.relationships(b), processor.service().snapshot(b).unwrap());
    assert!(processor.service().check_invariants().is_ok());

    let history = processor.service().request_history(a);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, FriendRequestStatus::Accepted);
    assert!(history[0].responded_at.is_some());
}

#[tokio::test]
async fn test_send_then_cancel_returns_to_none() {
    let (processor, a, b) = setup();

    processor.send_friend_request(a, b, None).await.unwrap();
    let cancelled = processor.cancel_friend_request(a, b).await.unwrap();
    assert_eq!(cancelled.status, RelationshipStatus::None);

    processor.refresh(b).await.unwrap();
    assert_eq!(processor.status(a, b), RelationshipStatus::None);
    assert_eq!(processor.status(b, a), RelationshipStatus::None);
    assert_no_requests_between(&processor, a, b);

    assert!(processor.pending_requests(b).await.unwrap().is_empty());
    assert_eq!(
        processor.service().request_history(a)[0].status,
        FriendRequestStatus::Cancelled
    );
}

#[tokio::test]
async fn test_send_friend_request_is_idempotent() {
    let (processor, a, b) = setup();

    processor.send_friend_request(a, b, None).await.unwrap();
    let calls = processor.service().call_count();

    let retry = processor.send_friend_request(a, b, None).await.unwrap();
    assert_eq!(retry.status, RelationshipStatus::RequestSent);
    assert!(!retry.dispatched);

    assert_eq!(processor.service().call_count(), calls);
    assert_eq!(processor.service().request_history(a).len(), 1);
    assert_eq!(processor.metrics().total_no_ops(), 1);
}

#[tokio::test]
async fn test_send_from_following_is_allowed() {
    let (processor, a, b) = setup();

    processor.toggle_follow(a, b).await.unwrap();
    assert_eq!(processor.status(a, b), RelationshipStatus::Following);

    let sent = processor.send_friend_request(a, b, None).await.unwrap();
    assert_eq!(sent.status, RelationshipStatus::RequestSent);
    assert!(sent.is_following);

    let cancelled = processor.cancel_friend_request(a, b).await.unwrap();
    assert_eq!(cancelled.status, RelationshipStatus::Following);
}

#[tokio::test]
async fn test_self_target_is_rejected_without_service_call() {
    let (processor, a, _) = setup();

    for transition in Transition::ALL {
        let err = processor
            .execute(a, a, transition, None)
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::InvalidTarget(a));
    }

    assert_eq!(processor.service().call_count(), 0);
    assert_eq!(processor.metrics().rejected_with(ErrorKind::InvalidTarget), 6);
    assert_eq!(processor.profile_relation(a, a), ProfileRelation::Own);
}

#[tokio::test]
async fn test_invalid_preconditions_are_rejected_locally() {
    let (processor, a, b) = setup();

    let err = processor.accept_friend_request(a, b).await.unwrap_err();
    assert_eq!(
        err,
        CommandError::InvalidPrecondition {
            transition: Transition::AcceptFriendRequest,
            status: RelationshipStatus::None,
        }
    );
    assert_eq!(
        processor.decline_friend_request(a, b).await.unwrap_err().kind(),
        ErrorKind::InvalidPrecondition
    );
    assert_eq!(
        processor.cancel_friend_request(a, b).await.unwrap_err().kind(),
        ErrorKind::InvalidPrecondition
    );
    assert_eq!(
        processor.remove_friend(a, b).await.unwrap_err().kind(),
        ErrorKind::InvalidPrecondition
    );

    assert_eq!(processor.service().call_count(), 0);
    assert!(!processor.is_pending(a, b));
}

#[tokio::test]
async fn test_request_received_blocks_sending_back() {
    let (processor, a, b) = setup();

    processor.send_friend_request(a, b, None).await.unwrap();
    processor.refresh(b).await.unwrap();

    let err = processor.send_friend_request(b, a, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPrecondition);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_double_accept_runs_once() {
    let (processor, a, b) = setup_with(StoreConfig::simulated_network());

    processor.send_friend_request(a, b, None).await.unwrap();
    processor.refresh(b).await.unwrap();
    let calls_before = processor.service().call_count();

    let (first, second) = tokio::join!(
        processor.accept_friend_request(b, a),
        processor.accept_friend_request(b, a)
    );

    let results = [first, second];
    let accepted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let rejected: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].status, RelationshipStatus::Friends);
    assert_eq!(rejected.len(), 1);
    assert_eq!(
        *rejected[0],
        CommandError::OperationInProgress { actor: b, subject: a }
    );

    assert_eq!(processor.service().call_count(), calls_before + 1);
    assert_eq!(
        processor.metrics().completed[&Transition::AcceptFriendRequest],
        1
    );
    assert!(!processor.is_pending(b, a));
}

#[tokio::test(start_paused = true)]
async fn test_pending_flag_tracks_in_flight_command() {
    let (processor, a, b) = setup_with(StoreConfig::simulated_network());

    let background = processor.clone();
    let handle = tokio::spawn(async move { background.toggle_follow(a, b).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(processor.is_pending(a, b));
    assert!(!processor.is_pending(b, a));

    let outcome = handle.await.unwrap().unwrap();
    assert!(outcome.is_following);
    assert!(!processor.is_pending(a, b));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_command_still_settles() {
    let (processor, a, b) = setup_with(StoreConfig::simulated_network());

    processor.send_friend_request(a, b, None).await.unwrap();
    processor.refresh(b).await.unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        processor.accept_friend_request(b, a),
    )
    .await;
    assert!(abandoned.is_err());
    assert!(processor.is_pending(b, a));

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!processor.is_pending(b, a));
    assert_eq!(processor.status(b, a), RelationshipStatus::Friends);

    // The pair is usable again
    let removed = processor.remove_friend(b, a).await.unwrap();
    assert_eq!(removed.status, RelationshipStatus::Following);
}

#[tokio::test(start_paused = true)]
async fn test_different_pairs_are_independent() {
    let service = MemoryRelationshipService::new(StoreConfig::simulated_network());
    let a = service.create_account();
    let b = service.create_account();
    let c = service.create_account();
    let processor = CommandProcessor::new(service);

    let (ab, ac, ca) = tokio::join!(
        processor.toggle_follow(a, b),
        processor.toggle_follow(a, c),
        processor.toggle_follow(c, a)
    );

    assert!(ab.unwrap().is_following);
    assert!(ac.unwrap().is_following);
    assert!(ca.unwrap().is_following);
    assert!(processor.service().check_invariants().is_ok());
}

#[tokio::test]
async fn test_toggle_follow_twice_restores_status() {
    let (processor, a, b) = setup();

    let first = processor.toggle_follow(a, b).await.unwrap();
    assert!(first.is_following);
    assert_eq!(first.status, RelationshipStatus::Following);

    processor.refresh(b).await.unwrap();
    assert!(processor.relationships(b).is_followed_by(a));

    let second = processor.toggle_follow(a, b).await.unwrap();
    assert!(!second.is_following);
    assert_eq!(second.status, RelationshipStatus::None);
    assert_eq!(processor.relationships(a), RelationshipSets::new());
}

#[tokio::test]
async fn test_remove_friend_scenario() {
    let (processor, a, b) = setup_with(StoreConfig {
        follow_on_accept: false,
        ..StoreConfig::default()
    });
    processor.service().seed_friendship(a, b).unwrap();
    processor.refresh(a).await.unwrap();
    processor.refresh(b).await.unwrap();
    assert_eq!(processor.status(a, b), RelationshipStatus::Friends);

    let removed = processor.remove_friend(a, b).await.unwrap();
    assert_eq!(removed.status, RelationshipStatus::None);

    processor.refresh(b).await.unwrap();
    assert_eq!(processor.status(a, b), RelationshipStatus::None);
    assert_eq!(processor.status(b, a), RelationshipStatus::None);
    assert_no_requests_between(&processor, a, b);
}

#[tokio::test]
async fn test_unfriending_keeps_follow() {
    let (processor, a, b) = setup();

    processor.send_friend_request(a, b, None).await.unwrap();
    processor.refresh(b).await.unwrap();
    processor.accept_friend_request(b, a).await.unwrap();

    let removed = processor.remove_friend(b, a).await.unwrap();
    assert_eq!(removed.status, RelationshipStatus::Following);
    assert!(processor.service().snapshot(a).unwrap().is_following(b));
}

#[tokio::test]
async fn test_remote_failure_leaves_local_state() {
    let (processor, a, b) = setup();
    processor.toggle_follow(a, b).await.unwrap();
    let before = processor.relationships(a);

    processor.service().inject_failures(1);
    let err = processor.send_friend_request(a, b, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    assert!(matches!(
        err,
        CommandError::RemoteFailure { operation: "send_friend_request", .. }
    ));
    assert_eq!(processor.relationships(a), before);
    assert_eq!(processor.status(a, b), RelationshipStatus::Following);
    assert!(!processor.is_pending(a, b));

    // No automatic retry; a manual one goes through
    let retried = processor.send_friend_request(a, b, None).await.unwrap();
    assert_eq!(retried.status, RelationshipStatus::RequestSent);
}

#[tokio::test]
async fn test_stale_local_view_surfaces_service_rejection() {
    let (processor, a, b) = setup();

    // Local view says a request is pending, the service disagrees
    let mut stale = RelationshipSets::new();
    stale.friend_requests_received.insert(b);
    processor.load_account(a, stale.clone());

    let err = processor.accept_friend_request(a, b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    assert_eq!(processor.relationships(a), stale);

    processor.refresh(a).await.unwrap();
    assert_eq!(processor.status(a, b), RelationshipStatus::None);
}

#[tokio::test]
async fn test_invariants_hold_after_every_command() {
    let service = MemoryRelationshipService::default_config();
    let accounts: Vec<AccountId> = (0..3).map(|_| service.create_account()).collect();
    let processor = CommandProcessor::new(service);

    // Deterministic walk over actors, subjects and transitions
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..120 {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let actor = accounts[(seed >> 33) as usize % accounts.len()];
        let subject = accounts[(seed >> 17) as usize % accounts.len()];
        let transition = Transition::ALL[(seed >> 5) as usize % Transition::ALL.len()];

        for account in &accounts {
            processor.refresh(*account).await.unwrap();
        }

        let before = processor.relationships(actor);
        let result = processor.execute(actor, subject, transition, None).await;
        if result.is_err() {
            assert_eq!(processor.relationships(actor), before);
        }

        processor.service().check_invariants().unwrap();
        for account in &accounts {
            let sets = processor.service().snapshot(*account).unwrap();
            sets.validate(*account).unwrap();
        }
    }
}

/// Service double whose every call fails, as an unreachable backend would
struct UnreachableService;

#[async_trait]
impl RelationshipService for UnreachableService {
    type Error = String;

    async fn fetch_relationships(&self, _account: AccountId) -> Result<RelationshipSets, String> {
        Err("network unreachable".to_string())
    }

    async fn send_friend_request(
        &self,
        _actor: AccountId,
        _subject: AccountId,
        _message: Option<String>,
    ) -> Result<Confirmation, String> {
        Err("network unreachable".to_string())
    }

    async fn cancel_friend_request(&self, _: AccountId, _: AccountId) -> Result<Confirmation, String> {
        Err("network unreachable".to_string())
    }

    async fn accept_friend_request(&self, _: AccountId, _: AccountId) -> Result<Confirmation, String> {
        Err("network unreachable".to_string())
    }

    async fn decline_friend_request(&self, _: AccountId, _: AccountId) -> Result<Confirmation, String> {
        Err("network unreachable".to_string())
    }

    async fn remove_friend(&self, _: AccountId, _: AccountId) -> Result<Confirmation, String> {
        Err("network unreachable".to_string())
    }

    async fn toggle_follow(&self, _: AccountId, _: AccountId) -> Result<bool, String> {
        Err("network unreachable".to_string())
    }

    async fn pending_friend_requests(&self, _: AccountId) -> Result<Vec<FriendRequest>, String> {
        Err("network unreachable".to_string())
    }
}

#[tokio::test]
async fn test_unreachable_service() {
    let processor = CommandProcessor::new(UnreachableService);
    let (a, b) = (AccountId::new(), AccountId::new());

    let err = processor.refresh(a).await.unwrap_err();
    assert_eq!(
        err,
        CommandError::RemoteFailure {
            operation: "fetch_relationships",
            reason: "network unreachable".to_string(),
        }
    );

    let err = processor.toggle_follow(a, b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    assert_eq!(processor.status(a, b), RelationshipStatus::None);
    assert!(!processor.is_pending(a, b));
    assert_eq!(processor.metrics().rejected_with(ErrorKind::RemoteFailure), 1);

    assert!(processor.pending_requests(a).await.is_err());
}
