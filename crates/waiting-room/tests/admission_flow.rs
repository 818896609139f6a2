//! End-to-end admission flows through `AdmissionService`.
//!
//! Covers:
//! - Batch actions with and without a remembered choice
//! - Partial and total backend failures
//! - Backend timeouts
//! - Serialization of concurrent actions

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use common::types::{MeetingId, UserId};
use waiting_room::admission::{AdmissionService, PolicyChange};
use waiting_room::backend::{AdmissionBackend, BatchApplyOutcome, PerUserBatchAdapter};
use waiting_room::config::Config;
use waiting_room::engine::{Action, BatchAction};
use waiting_room::errors::WaitingRoomError;
use waiting_room::registry::{registry_channel, RegistryHandle};
use waiting_room::types::{AdmissionStatus, GuestPolicy, SessionFlags};
use wr_test_utils::{
    all_features, BackendCall, MockAdmissionBackend, MockPanelLayout, MockPerUserTransport,
    QueuesBuilder,
};

struct Harness {
    registry: RegistryHandle,
    layout: Arc<MockPanelLayout>,
    service: Arc<AdmissionService>,
}

fn harness(
    backend: Arc<dyn AdmissionBackend>,
    flags: SessionFlags,
    queues: QueuesBuilder,
    config: Config,
) -> Harness {
    let (registry, receiver) = registry_channel(queues.snapshot(flags));
    let layout = Arc::new(MockPanelLayout::new());
    let service = Arc::new(AdmissionService::new(
        MeetingId::new(),
        receiver,
        backend,
        layout.clone(),
        config,
        None,
    ));
    Harness {
        registry,
        layout,
        service,
    }
}

fn ids(raw: &[&str]) -> Vec<UserId> {
    raw.iter().map(|id| UserId::new(*id)).collect()
}

// ============================================================================
// Batch actions
// ============================================================================

#[tokio::test]
async fn test_deny_everyone_remembered() {
    let backend = Arc::new(MockAdmissionBackend::accepting());
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().authenticated(1).guests(2),
        Config::default(),
    );

    let report = h
        .service
        .decide(BatchAction::DenyEveryone.into(), true)
        .await
        .unwrap();

    assert_eq!(report.decision.status, AdmissionStatus::Deny);
    assert_eq!(
        report.decision.target_user_ids,
        ids(&["guest-1", "guest-2", "auth-1"])
    );
    assert_eq!(report.policy, PolicyChange::Applied(GuestPolicy::AlwaysDeny));
    assert_eq!(h.service.current_policy(), Some(GuestPolicy::AlwaysDeny));
    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::Policy(Some(GuestPolicy::AlwaysDeny)),
            BackendCall::Batch(report.decision.clone()),
        ]
    );
    assert_eq!(h.layout.close_count(), 1);

    // The presence service removes decided users once the backend confirms
    assert_eq!(h.registry.remove_decided(&report.decision), 3);
    assert!(!h.service.panel_view().has_pending());
}

#[tokio::test]
async fn test_allow_all_guest_without_remember_targets_guests_only() {
    let backend = Arc::new(MockAdmissionBackend::accepting());
    let h = harness(
        backend.clone(),
        all_features(),
        QueuesBuilder::new().authenticated(2).guests(1),
        Config::default(),
    );

    let report = h
        .service
        .decide(BatchAction::AllowAllGuest.into(), false)
        .await
        .unwrap();

    assert_eq!(report.decision.target_user_ids, ids(&["guest-1"]));
    assert_eq!(report.policy, PolicyChange::Unchanged);
    assert!(backend.policy_writes().is_empty());
}

#[tokio::test]
async fn test_allow_all_guest_remembered_includes_authenticated() {
    let backend = Arc::new(MockAdmissionBackend::accepting());
    let h = harness(
        backend.clone(),
        all_features(),
        QueuesBuilder::new().authenticated(2).guests(1),
        Config::default(),
    );

    let report = h
        .service
        .decide(BatchAction::AllowAllGuest.into(), true)
        .await
        .unwrap();

    assert_eq!(
        report.decision.target_user_ids,
        ids(&["guest-1", "auth-1", "auth-2"])
    );
    assert_eq!(backend.policy_writes(), vec![Some(GuestPolicy::AlwaysAccept)]);
    assert_eq!(h.service.current_policy(), Some(GuestPolicy::AlwaysAccept));
}

#[tokio::test]
async fn test_empty_room_still_remembers_policy() {
    let backend = Arc::new(MockAdmissionBackend::accepting());
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new(),
        Config::default(),
    );

    let report = h
        .service
        .decide(BatchAction::AllowEveryone.into(), true)
        .await
        .unwrap();

    assert!(!report.dispatched);
    assert!(report.decision.is_empty());
    assert_eq!(
        backend.calls(),
        vec![BackendCall::Policy(Some(GuestPolicy::AlwaysAccept))]
    );
    assert_eq!(h.service.current_policy(), Some(GuestPolicy::AlwaysAccept));
}

#[tokio::test]
async fn test_panel_stays_open_when_configured() {
    let backend = Arc::new(MockAdmissionBackend::accepting());
    let h = harness(
        backend,
        SessionFlags::default(),
        QueuesBuilder::new().guests(1),
        Config {
            close_panel_on_batch: false,
            ..Config::default()
        },
    );

    h.service
        .decide(BatchAction::AllowEveryone.into(), false)
        .await
        .unwrap();

    assert_eq!(h.layout.close_count(), 0);
}

// ============================================================================
// Single-user actions
// ============================================================================

#[tokio::test]
async fn test_user_no_longer_pending_is_rejected() {
    let backend = Arc::new(MockAdmissionBackend::accepting());
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().guests(1),
        Config::default(),
    );

    h.registry.remove_pending(&UserId::new("guest-1"));
    let err = h
        .service
        .decide(Action::AcceptOne(UserId::new("guest-1")), false)
        .await
        .unwrap_err();

    assert!(matches!(err, WaitingRoomError::UserNotPending(_)));
    assert_eq!(err.error_code(), 4);
    assert_eq!(backend.call_count(), 0);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_per_user_partial_failure() {
    let backend = Arc::new(PerUserBatchAdapter::new(MockPerUserTransport::failing_for(
        &["guest-2"],
    )));
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().guests(3),
        Config::default(),
    );

    let err = h
        .service
        .decide(BatchAction::DenyEveryone.into(), true)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), 8);
    assert_eq!(err.failed_user_ids(), ids(&["guest-2"]).as_slice());
    assert!(err.is_retryable());
    // Every user was attempted and the policy stays applied
    assert_eq!(backend.transport().calls().len(), 3);
    assert_eq!(h.service.current_policy(), Some(GuestPolicy::AlwaysDeny));
    assert_eq!(h.layout.close_count(), 0);
}

#[tokio::test]
async fn test_total_failure_reverts_to_previous_policy() {
    let backend = Arc::new(MockAdmissionBackend::builder().fail_batches("down").build());
    let (registry, receiver) =
        registry_channel(QueuesBuilder::new().guests(1).snapshot(SessionFlags::default()));
    let service = AdmissionService::new(
        MeetingId::new(),
        receiver,
        backend.clone(),
        Arc::new(MockPanelLayout::new()),
        Config::default(),
        Some(GuestPolicy::AlwaysDeny),
    );

    let err = service
        .decide(BatchAction::AllowEveryone.into(), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WaitingRoomError::BatchApplyFailure {
            policy_reverted: true,
            ..
        }
    ));
    assert_eq!(
        backend.policy_writes(),
        vec![Some(GuestPolicy::AlwaysAccept), Some(GuestPolicy::AlwaysDeny)]
    );
    assert_eq!(service.current_policy(), Some(GuestPolicy::AlwaysDeny));
    assert_eq!(registry.snapshot().queues.pending_count(), 1);
}

#[tokio::test]
async fn test_retry_after_total_failure_succeeds() {
    let backend = Arc::new(
        MockAdmissionBackend::builder()
            .with_batch_outcomes(vec![
                BatchApplyOutcome::Failed {
                    reason: "down".to_string(),
                },
                BatchApplyOutcome::Applied,
            ])
            .build(),
    );
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().guests(2),
        Config::default(),
    );

    let first = h.service.decide(BatchAction::DenyEveryone.into(), false).await;
    assert!(first.unwrap_err().is_retryable());

    let second = h
        .service
        .decide(BatchAction::DenyEveryone.into(), false)
        .await
        .unwrap();

    let batches = backend.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], batches[1]);
    assert_eq!(second.decision, batches[1]);
}

#[tokio::test(start_paused = true)]
async fn test_backend_timeout_fails_batch_and_attempts_revert() {
    let backend = Arc::new(
        MockAdmissionBackend::builder()
            .with_delay(Duration::from_secs(30))
            .build(),
    );
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().guests(1),
        Config {
            backend_timeout: Duration::from_millis(200),
            ..Config::default()
        },
    );

    let err = h
        .service
        .decide(BatchAction::AllowEveryone.into(), true)
        .await
        .unwrap_err();

    // The revert went out but was never confirmed either
    assert!(matches!(
        err,
        WaitingRoomError::BatchApplyFailure {
            ref reason,
            policy_reverted: false,
        } if reason.contains("timed out")
    ));
    assert_eq!(
        backend.policy_writes(),
        vec![Some(GuestPolicy::AlwaysAccept), None]
    );
    assert_eq!(backend.stored_policy(), None);
    assert_eq!(h.service.current_policy(), None);
}

#[tokio::test(start_paused = true)]
async fn test_late_policy_write_is_reverted_when_batch_fails() {
    // The backend stores the policy but answers after the timeout
    let backend = Arc::new(
        MockAdmissionBackend::builder()
            .slow_first_policy_updates(1, Duration::from_secs(30))
            .fail_batches("down")
            .build(),
    );
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().guests(2),
        Config {
            backend_timeout: Duration::from_millis(100),
            ..Config::default()
        },
    );

    let err = h
        .service
        .decide(BatchAction::AllowEveryone.into(), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WaitingRoomError::BatchApplyFailure {
            ref reason,
            policy_reverted: true,
        } if reason == "down"
    ));
    assert_eq!(
        backend.policy_writes(),
        vec![Some(GuestPolicy::AlwaysAccept), None]
    );
    assert_eq!(backend.stored_policy(), None);
    assert_eq!(h.service.current_policy(), None);
}

#[tokio::test(start_paused = true)]
async fn test_per_user_timeout_reports_unreached_users() {
    // 40ms per user against a 100ms budget: two users land, the third is cut off
    let backend = Arc::new(PerUserBatchAdapter::new(
        MockPerUserTransport::accepting().with_delay(Duration::from_millis(40)),
    ));
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().guests(3),
        Config {
            backend_timeout: Duration::from_millis(100),
            ..Config::default()
        },
    );

    let err = h
        .service
        .decide(BatchAction::AllowEveryone.into(), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WaitingRoomError::BatchApplyPartialFailure {
            status: AdmissionStatus::Allow,
            ..
        }
    ));
    assert_eq!(err.failed_user_ids(), ids(&["guest-3"]).as_slice());
    assert_eq!(backend.transport().applied(), ids(&["guest-1", "guest-2"]));
    // Users were admitted, so the policy stays and nothing is reverted
    assert_eq!(h.service.current_policy(), Some(GuestPolicy::AlwaysAccept));
    assert_eq!(h.layout.close_count(), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_actions_are_serialized() {
    let backend = Arc::new(
        MockAdmissionBackend::builder()
            .with_delay(Duration::from_millis(50))
            .build(),
    );
    let h = harness(
        backend.clone(),
        SessionFlags::default(),
        QueuesBuilder::new().guests(2),
        Config::default(),
    );

    let bulk = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move { service.decide(BatchAction::DenyEveryone.into(), true).await })
    };
    // Let the bulk action take the lock and start its policy write
    tokio::task::yield_now().await;
    let single = {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move {
            service
                .decide(Action::AcceptOne(UserId::new("guest-1")), false)
                .await
        })
    };

    bulk.await.unwrap().unwrap();
    single.await.unwrap().unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], BackendCall::Policy(Some(GuestPolicy::AlwaysDeny)));
    assert!(matches!(&calls[1], BackendCall::Batch(d) if d.status == AdmissionStatus::Deny));
    assert!(matches!(&calls[2], BackendCall::Batch(d) if d.status == AdmissionStatus::Allow));
}

// ============================================================================
// Lobby message
// ============================================================================

#[tokio::test]
async fn test_lobby_message_backend_failure() {
    let backend = Arc::new(MockAdmissionBackend::builder().fail_lobby_message().build());
    let h = harness(
        backend.clone(),
        all_features(),
        QueuesBuilder::new(),
        Config::default(),
    );

    let err = h.service.set_lobby_message("Starting soon").await.unwrap_err();

    assert!(matches!(err, WaitingRoomError::Backend(_)));
    assert_eq!(
        backend.calls(),
        vec![BackendCall::LobbyMessage("Starting soon".to_string())]
    );
}
