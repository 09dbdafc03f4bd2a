//! Mock membership API for tests.
//!
//! Lets store and gate tests script backend responses, inject failures and
//! inspect calls without a network.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::client::api::{
    AccessCheckPayload, ApiError, MembershipApi, MembershipPayload, UpgradeOrder,
};
use crate::domain::membership::MembershipTier;

/// Scriptable [`MembershipApi`] implementation.
///
/// Clones share state, so a test can hold one handle for configuration and
/// hand another to the store or gate under test. Configured errors persist
/// until cleared so outage scenarios can span several calls.
#[derive(Clone)]
pub struct MockMembershipApi {
    inner: Arc<Mutex<MockApiState>>,
}

struct MockApiState {
    membership: MembershipPayload,
    access: Option<AccessCheckPayload>,
    upgrade: UpgradeOrder,
    fetch_error: Option<ApiError>,
    check_error: Option<ApiError>,
    calls: Vec<String>,
}

impl MockMembershipApi {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockApiState {
                membership: MembershipPayload::default(),
                access: None,
                upgrade: UpgradeOrder {
                    order_id: "240115_mockorder".to_string(),
                    order_url: "https://sb-openapi.zalopay.vn/mock/pay/240115_mockorder"
                        .to_string(),
                },
                fetch_error: None,
                check_error: None,
                calls: Vec::new(),
            })),
        }
    }

    /// Mock whose membership fetch reports the given explicit tier.
    pub fn with_tier(tier: MembershipTier) -> Self {
        let mock = Self::new();
        mock.set_tier(tier);
        mock
    }

    /// Script the payload returned by `fetch_membership`.
    pub fn set_membership(&self, payload: MembershipPayload) {
        self.inner.lock().unwrap().membership = payload;
    }

    /// Script a registered membership with the given explicit tier code.
    pub fn set_tier(&self, tier: MembershipTier) {
        self.set_membership(MembershipPayload {
            registered: true,
            id: Some("mock-membership".to_string()),
            tier: Some(tier.as_str().to_string()),
            ..Default::default()
        });
    }

    /// Script the payload returned by `check_feature_access`.
    ///
    /// Without a script the mock derives the answer from the configured
    /// membership payload, mirroring the real backend.
    pub fn set_access(&self, payload: AccessCheckPayload) {
        self.inner.lock().unwrap().access = Some(payload);
    }

    /// Script the order returned by `start_upgrade`.
    pub fn set_upgrade(&self, order: UpgradeOrder) {
        self.inner.lock().unwrap().upgrade = order;
    }

    /// Fail every `fetch_membership` call until cleared.
    pub fn set_fetch_error(&self, error: ApiError) {
        self.inner.lock().unwrap().fetch_error = Some(error);
    }

    /// Fail every `check_feature_access` call until cleared.
    pub fn set_check_error(&self, error: ApiError) {
        self.inner.lock().unwrap().check_error = Some(error);
    }

    /// Clear injected errors.
    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.fetch_error = None;
        state.check_error = None;
    }

    /// Names of the methods called, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// How many times the named method was called.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == method)
            .count()
    }
}

impl Default for MockMembershipApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipApi for MockMembershipApi {
    async fn fetch_membership(&self) -> Result<MembershipPayload, ApiError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push("fetch_membership".to_string());
        if let Some(error) = &state.fetch_error {
            return Err(error.clone());
        }
        Ok(state.membership.clone())
    }

    async fn check_feature_access(
        &self,
        allowed: &[MembershipTier],
    ) -> Result<AccessCheckPayload, ApiError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push("check_feature_access".to_string());
        if let Some(error) = &state.check_error {
            return Err(error.clone());
        }
        if let Some(access) = &state.access {
            return Ok(access.clone());
        }

        // Derive the answer the way the backend would
        let tier = state.membership.to_snapshot().tier();
        let requirement = crate::domain::membership::AccessRequirement::new(allowed.iter().copied());
        Ok(AccessCheckPayload {
            has_access: requirement.grants(tier),
            user_membership: tier,
            required_membership: requirement.required_tier(),
        })
    }

    async fn start_upgrade(&self, plan_code: &str) -> Result<UpgradeOrder, ApiError> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(format!("start_upgrade:{}", plan_code));
        Ok(state.upgrade.clone())
    }
}

impl std::fmt::Debug for MockMembershipApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMembershipApi").finish_non_exhaustive()
    }
}
