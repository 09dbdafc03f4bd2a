//! UpgradeMembershipHandler - Command handler for initiating a paid upgrade.
//!
//! Initiation creates a payment order with the provider and hands the payment
//! URL back to the client. No membership state changes here; the tier is only
//! applied when the provider's callback confirms the charge.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::membership::plan::MembershipPlan;
use crate::domain::membership::MembershipError;
use crate::ports::{CreateOrderRequest, MembershipReader, PaymentOrder, PaymentProvider};

/// Command to start a paid upgrade for a user.
#[derive(Debug, Clone)]
pub struct UpgradeMembershipCommand {
    pub user_id: UserId,
    pub plan_code: String,
}

/// Result of a successfully initiated upgrade.
#[derive(Debug, Clone)]
pub struct UpgradeMembershipResult {
    pub order: PaymentOrder,
    pub plan: &'static MembershipPlan,
}

/// Handler for upgrade initiation.
pub struct UpgradeMembershipHandler {
    reader: Arc<dyn MembershipReader>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl UpgradeMembershipHandler {
    pub fn new(
        reader: Arc<dyn MembershipReader>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            reader,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpgradeMembershipCommand,
    ) -> Result<UpgradeMembershipResult, MembershipError> {
        // 1. Resolve the plan
        let plan = MembershipPlan::by_code(&cmd.plan_code)
            .ok_or_else(|| MembershipError::invalid_plan(cmd.plan_code.clone()))?;

        if !plan.is_purchasable() {
            return Err(MembershipError::validation(
                "plan_code",
                format!("Plan '{}' is not purchasable", plan.code),
            ));
        }

        // 2. Reject downgrades against the user's effective tier. Equal rank is
        //    a renewal and goes through.
        let current = self.reader.get_tier(&cmd.user_id).await?;
        if plan.tier.rank() < current.rank() {
            return Err(MembershipError::invalid_tier(format!(
                "{} is below current tier {}",
                plan.tier.as_str(),
                current.as_str()
            )));
        }

        // 3. Create the payment order
        let order = self
            .payment_provider
            .create_order(CreateOrderRequest {
                user_id: cmd.user_id,
                plan_code: plan.code.to_string(),
                plan_name: plan.name.to_string(),
                amount: plan.price,
            })
            .await
            .map_err(DomainError::from)?;

        Ok(UpgradeMembershipResult { order, plan })
    }
}
