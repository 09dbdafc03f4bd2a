//! Client-side feature gate.
//!
//! Guards a protected feature behind a membership requirement. Evaluation
//! asks the backend first (the same decision the server middleware would
//! make) and falls back to the cached tier when the backend is unreachable:
//! availability over strict consistency.
//!
//! There is no retry loop. A gate re-evaluates only when constructed, when
//! [`FeatureGate::evaluate`] is called again, or when the state store
//! signals a membership change to a [`FeatureGate::watch`] subscription.

use std::sync::Arc;

use tokio::sync::watch;

use crate::client::api::{ApiError, MembershipApi};
use crate::client::store::MembershipStore;
use crate::domain::membership::{
    AccessDecision, AccessRequirement, DeniedAccess, MembershipTier,
};

/// The gate's externally visible state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// The initial backend round-trip is in flight.
    Loading,
    /// The feature may render.
    Granted,
    /// The feature is blocked; carries what the user has and needs.
    Denied(DeniedAccess),
}

impl GateState {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateState::Granted)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, GateState::Denied(_))
    }
}

/// Guard for one protected feature.
#[derive(Clone)]
pub struct FeatureGate {
    requirement: AccessRequirement,
    api: Arc<dyn MembershipApi>,
    store: Arc<MembershipStore>,
    has_principal: bool,
}

impl FeatureGate {
    /// Gate for an authenticated session.
    pub fn new(
        requirement: AccessRequirement,
        api: Arc<dyn MembershipApi>,
        store: Arc<MembershipStore>,
    ) -> Self {
        Self {
            requirement,
            api,
            store,
            has_principal: true,
        }
    }

    /// Gate for a session with no authenticated principal.
    ///
    /// Always denies; the effective tier is free, so the upgrade prompt
    /// applies.
    pub fn anonymous(
        requirement: AccessRequirement,
        api: Arc<dyn MembershipApi>,
        store: Arc<MembershipStore>,
    ) -> Self {
        Self {
            requirement,
            api,
            store,
            has_principal: false,
        }
    }

    /// The requirement this gate enforces.
    pub fn requirement(&self) -> &AccessRequirement {
        &self.requirement
    }

    /// Single-shot evaluation: backend check with local fallback.
    pub async fn evaluate(&self) -> GateState {
        if !self.has_principal {
            return GateState::Denied(DeniedAccess {
                current: MembershipTier::Free,
                required: self.requirement.required_tier(),
            });
        }

        match self.check_backend().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "Access check unreachable, evaluating locally");
                self.evaluate_local().await
            }
        }
    }

    /// Live gate state.
    ///
    /// The receiver starts at `Loading`, settles after the first
    /// evaluation, and re-evaluates whenever the store signals a tier
    /// change. The background task ends when either side hangs up.
    pub fn watch(&self) -> watch::Receiver<GateState> {
        let (tx, rx) = watch::channel(GateState::Loading);
        let gate = self.clone();

        tokio::spawn(async move {
            let mut tier_changes = gate.store.watch_tier();

            let state = gate.evaluate().await;
            if tx.send(state).is_err() {
                return;
            }

            loop {
                tokio::select! {
                    changed = tier_changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = gate.evaluate().await;
                        if tx.send(state).is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
        });

        rx
    }

    async fn check_backend(&self) -> Result<GateState, ApiError> {
        let outcome = self
            .api
            .check_feature_access(self.requirement.allowed())
            .await?;

        Ok(if outcome.has_access {
            GateState::Granted
        } else {
            GateState::Denied(DeniedAccess {
                current: outcome.user_membership,
                required: outcome.required_membership,
            })
        })
    }

    /// Fallback: evaluate the cached tier locally.
    async fn evaluate_local(&self) -> GateState {
        let tier = self.store.current_tier().await;
        match self.requirement.evaluate(tier) {
            AccessDecision::Granted => GateState::Granted,
            AccessDecision::Denied(denied) => GateState::Denied(denied),
        }
    }
}

impl std::fmt::Debug for FeatureGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureGate")
            .field("requirement", &self.requirement)
            .field("has_principal", &self.has_principal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::AccessCheckPayload;
    use crate::client::mock::MockMembershipApi;
    use crate::client::snapshot::{MembershipSnapshot, MemorySnapshotStore};
    use crate::client::store::StoreConfig;
    use crate::domain::foundation::Timestamp;

    use MembershipTier::{Free, Premium, Pro};

    async fn store_for(mock: &MockMembershipApi) -> Arc<MembershipStore> {
        Arc::new(
            MembershipStore::new(
                Arc::new(mock.clone()),
                Arc::new(MemorySnapshotStore::new()),
                StoreConfig::default(),
            )
            .await,
        )
    }

    async fn store_seeded(mock: &MockMembershipApi, tier: &str) -> Arc<MembershipStore> {
        let snapshot = MembershipSnapshot {
            membership: Some(tier.to_string()),
            refreshed_at: Some(Timestamp::now()),
            ..Default::default()
        };
        Arc::new(
            MembershipStore::new(
                Arc::new(mock.clone()),
                Arc::new(MemorySnapshotStore::with_snapshot(snapshot)),
                StoreConfig::default(),
            )
            .await,
        )
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Single-Shot Evaluation Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn granted_when_backend_allows() {
        let mock = MockMembershipApi::with_tier(Premium);
        let store = store_for(&mock).await;
        let gate = FeatureGate::new(
            AccessRequirement::new([Premium, Pro]),
            Arc::new(mock.clone()),
            store,
        );

        assert_eq!(gate.evaluate().await, GateState::Granted);
        assert_eq!(mock.call_count("check_feature_access"), 1);
    }

    #[tokio::test]
    async fn denied_carries_current_and_required_tier() {
        let mock = MockMembershipApi::with_tier(Free);
        let store = store_for(&mock).await;
        let gate = FeatureGate::new(
            AccessRequirement::new([Premium, Pro]),
            Arc::new(mock.clone()),
            store,
        );

        match gate.evaluate().await {
            GateState::Denied(denied) => {
                assert_eq!(denied.current, Free);
                assert_eq!(denied.required, Some(Premium));
                assert!(denied.can_upgrade());
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn denied_paid_user_gets_no_upgrade_prompt() {
        let mock = MockMembershipApi::with_tier(Premium);
        let store = store_for(&mock).await;
        let gate = FeatureGate::new(
            AccessRequirement::at_least(Pro),
            Arc::new(mock.clone()),
            store,
        );

        match gate.evaluate().await {
            GateState::Denied(denied) => {
                assert_eq!(denied.current, Premium);
                assert!(!denied.can_upgrade());
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn anonymous_gate_denies_regardless_of_requirement() {
        let mock = MockMembershipApi::with_tier(Pro);
        let store = store_for(&mock).await;

        for minimum in MembershipTier::ALL {
            let gate = FeatureGate::anonymous(
                AccessRequirement::at_least(minimum),
                Arc::new(mock.clone()),
                store.clone(),
            );

            match gate.evaluate().await {
                GateState::Denied(denied) => {
                    assert_eq!(denied.current, Free);
                    assert_eq!(denied.required, Some(minimum));
                    assert!(denied.can_upgrade());
                }
                other => panic!("anonymous gate must deny, got {:?}", other),
            }
        }

        // The backend is never consulted for a missing principal
        assert_eq!(mock.call_count("check_feature_access"), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Fallback Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn network_failure_falls_back_to_cached_tier() {
        let mock = MockMembershipApi::new();
        mock.set_check_error(ApiError::Network("connection refused".to_string()));
        let store = store_seeded(&mock, "premium").await;
        let gate = FeatureGate::new(
            AccessRequirement::new([Premium, Pro]),
            Arc::new(mock.clone()),
            store,
        );

        assert_eq!(gate.evaluate().await, GateState::Granted);
    }

    #[tokio::test]
    async fn fallback_denies_when_cache_says_free() {
        let mock = MockMembershipApi::new();
        mock.set_check_error(ApiError::Timeout);
        let store = store_for(&mock).await;
        let gate = FeatureGate::new(
            AccessRequirement::at_least(Premium),
            Arc::new(mock.clone()),
            store,
        );

        match gate.evaluate().await {
            GateState::Denied(denied) => {
                assert_eq!(denied.current, Free);
                assert_eq!(denied.required, Some(Premium));
            }
            other => panic!("expected local denial, got {:?}", other),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Watch Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn watch_seeds_loading_then_settles() {
        let mock = MockMembershipApi::with_tier(Premium);
        let store = store_for(&mock).await;
        let gate = FeatureGate::new(
            AccessRequirement::at_least(Premium),
            Arc::new(mock.clone()),
            store,
        );

        let mut rx = gate.watch();
        assert_eq!(*rx.borrow(), GateState::Loading);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), GateState::Granted);
    }

    #[tokio::test]
    async fn purchase_flips_watched_gate_from_denied_to_granted() {
        let mock = MockMembershipApi::with_tier(Free);
        let store = store_for(&mock).await;
        let gate = FeatureGate::new(
            AccessRequirement::new([Premium, Pro]),
            Arc::new(mock.clone()),
            store.clone(),
        );

        let mut rx = gate.watch();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_denied());

        // The purchase completes server-side and the store is signalled
        mock.set_tier(Premium);
        store.notify_membership_changed().await;

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), GateState::Granted);
    }

    #[tokio::test]
    async fn scripted_backend_answer_drives_watched_state() {
        let mock = MockMembershipApi::new();
        mock.set_access(AccessCheckPayload {
            has_access: false,
            user_membership: Free,
            required_membership: Some(Pro),
        });
        let store = store_for(&mock).await;
        let gate = FeatureGate::new(
            AccessRequirement::at_least(Pro),
            Arc::new(mock.clone()),
            store,
        );

        let mut rx = gate.watch();
        rx.changed().await.unwrap();

        match &*rx.borrow() {
            GateState::Denied(denied) => assert_eq!(denied.required, Some(Pro)),
            other => panic!("expected denial, got {:?}", other),
        }
    }
}
