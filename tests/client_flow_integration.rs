//! Client-side membership flow integration tests.
//!
//! These tests walk full user journeys through the client stack: snapshot
//! seeding, store refresh, the purchase signal, and the feature gate's live
//! state. The backend is a scripted mock; everything between it and the gate
//! is the production wiring.

use std::sync::Arc;

use nosmoke::client::{
    ApiError, FeatureGate, GateState, MembershipApi, MembershipPayload, MembershipSnapshot,
    MembershipStore, MemorySnapshotStore, MockMembershipApi, SnapshotStore, StoreConfig,
};
use nosmoke::domain::foundation::Timestamp;
use nosmoke::domain::membership::{AccessRequirement, MembershipTier};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn premium_feature() -> AccessRequirement {
    AccessRequirement::at_least(MembershipTier::Premium)
}

async fn store_on(
    mock: &MockMembershipApi,
    snapshots: Arc<MemorySnapshotStore>,
) -> Arc<MembershipStore> {
    Arc::new(MembershipStore::new(Arc::new(mock.clone()), snapshots, StoreConfig::default()).await)
}

fn premium_snapshot() -> MembershipSnapshot {
    MembershipSnapshot {
        membership: Some("premium".to_string()),
        refreshed_at: Some(Timestamp::now()),
        ..Default::default()
    }
}

fn assert_denied_with_upgrade(state: &GateState) {
    match state {
        GateState::Denied(denied) => {
            assert_eq!(denied.current, MembershipTier::Free);
            assert_eq!(denied.required, Some(MembershipTier::Premium));
            assert!(denied.can_upgrade());
        }
        other => panic!("expected a free-tier denial, got {other:?}"),
    }
}

// ============================================================================
// Journeys
// ============================================================================

#[tokio::test]
async fn fresh_session_settles_from_loading_to_denial() {
    let mock = MockMembershipApi::new();
    let store = store_on(&mock, Arc::new(MemorySnapshotStore::new())).await;
    let gate = FeatureGate::new(premium_feature(), Arc::new(mock.clone()), store);

    let mut state = gate.watch();
    assert_eq!(*state.borrow(), GateState::Loading);

    state.changed().await.unwrap();
    assert_denied_with_upgrade(&state.borrow());
    assert_eq!(mock.call_count("check_feature_access"), 1);
}

#[tokio::test]
async fn purchase_flow_unlocks_the_gate() {
    let mock = MockMembershipApi::new();
    let snapshots = Arc::new(MemorySnapshotStore::new());
    let store = store_on(&mock, snapshots.clone()).await;
    let gate = FeatureGate::new(premium_feature(), Arc::new(mock.clone()), store.clone());

    let mut state = gate.watch();
    state.changed().await.unwrap();
    assert!(state.borrow().is_denied());

    // The user starts an upgrade and is sent to the payment page.
    let order = mock.start_upgrade("premium_monthly").await.unwrap();
    assert!(!order.order_url.is_empty());

    // Payment confirmed server-side; the app signals the store to re-fetch.
    mock.set_tier(MembershipTier::Premium);
    store.notify_membership_changed().await;

    state.changed().await.unwrap();
    assert_eq!(*state.borrow(), GateState::Granted);
    assert!(mock.calls().contains(&"start_upgrade:premium_monthly".to_string()));

    // The new tier is on disk for the next launch.
    let persisted = snapshots.load().await.unwrap().unwrap();
    assert_eq!(persisted.membership.as_deref(), Some("premium"));
}

#[tokio::test]
async fn relaunch_reuses_persisted_snapshot_offline() {
    // Previous session left a premium snapshot; this one has no network.
    let snapshots = Arc::new(MemorySnapshotStore::with_snapshot(premium_snapshot()));
    let mock = MockMembershipApi::new();
    mock.set_fetch_error(ApiError::Network("offline".to_string()));
    mock.set_check_error(ApiError::Network("offline".to_string()));

    let store = store_on(&mock, snapshots).await;
    assert_eq!(store.current_tier().await, MembershipTier::Premium);

    // Refresh fails but the cache holds.
    assert!(store.refresh().await.is_err());
    assert_eq!(store.current_tier().await, MembershipTier::Premium);

    // The gate cannot reach the backend and falls back to the cached tier.
    let gate = FeatureGate::new(premium_feature(), Arc::new(mock.clone()), store);
    assert_eq!(gate.evaluate().await, GateState::Granted);
}

#[tokio::test]
async fn logout_locks_the_gate_again() {
    let mock = MockMembershipApi::with_tier(MembershipTier::Premium);
    let snapshots = Arc::new(MemorySnapshotStore::with_snapshot(premium_snapshot()));
    let store = store_on(&mock, snapshots.clone()).await;
    let gate = FeatureGate::new(premium_feature(), Arc::new(mock.clone()), store.clone());

    let mut state = gate.watch();
    state.changed().await.unwrap();
    assert_eq!(*state.borrow(), GateState::Granted);

    // Logout: the backend no longer knows the user and the local cache is
    // dropped along with the persisted blob.
    mock.set_membership(MembershipPayload::default());
    store.clear().await;

    state.changed().await.unwrap();
    assert_denied_with_upgrade(&state.borrow());
    assert!(snapshots.load().await.unwrap().is_none());
}

#[tokio::test]
async fn anonymous_session_never_consults_the_backend() {
    let mock = MockMembershipApi::with_tier(MembershipTier::Premium);
    let store = store_on(&mock, Arc::new(MemorySnapshotStore::new())).await;
    let gate = FeatureGate::anonymous(premium_feature(), Arc::new(mock.clone()), store);

    let state = gate.evaluate().await;

    assert_denied_with_upgrade(&state);
    assert_eq!(mock.call_count("check_feature_access"), 0);
}
