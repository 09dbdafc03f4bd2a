//! ApplyPaymentCallbackHandler - Command handler for confirmed payment callbacks.
//!
//! This is the authoritative write path for paid tiers. The provider adapter
//! verifies the callback signature and hands back a structured event; this
//! handler applies the purchase to the user's record, registering one on the
//! fly if the callback arrives for a user we have never seen.
//!
//! Providers redeliver callbacks until acknowledged, so the handler is
//! idempotent: a transaction id that is already in the payment history is
//! reported as `AlreadyApplied` without touching the record again.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, MembershipId, Timestamp};
use crate::domain::membership::plan;
use crate::domain::membership::{MembershipError, MembershipEvent, MembershipRecord, PaymentEntry};
use crate::ports::{EventPublisher, MembershipRepository, PaymentProvider};

/// Command carrying the raw callback body as received from the provider.
#[derive(Debug, Clone)]
pub struct ApplyPaymentCallbackCommand {
    pub body: Vec<u8>,
}

/// Outcome of processing a payment callback.
#[derive(Debug, Clone)]
pub enum ApplyPaymentCallbackResult {
    /// The purchase was applied to the membership.
    Applied { membership: MembershipRecord },
    /// The transaction was seen before; nothing changed.
    AlreadyApplied { provider_txn_id: String },
}

/// Handler for applying verified payment callbacks.
pub struct ApplyPaymentCallbackHandler {
    repository: Arc<dyn MembershipRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ApplyPaymentCallbackHandler {
    pub fn new(
        repository: Arc<dyn MembershipRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            payment_provider,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ApplyPaymentCallbackCommand,
    ) -> Result<ApplyPaymentCallbackResult, MembershipError> {
        // 1. Verify the signature and decode the callback
        let callback = self
            .payment_provider
            .verify_callback(&cmd.body)
            .await
            .map_err(DomainError::from)?;

        // 2. Resolve the plan the user paid for
        let plan = plan::MembershipPlan::by_code(&callback.plan_code)
            .ok_or_else(|| MembershipError::invalid_plan(callback.plan_code.clone()))?;
        if !plan.is_purchasable() {
            return Err(MembershipError::validation(
                "plan_code",
                format!("Plan '{}' is not purchasable", plan.code),
            ));
        }

        // 3. Load the record, or start one for a user paying before signup
        let now = Timestamp::now();
        let (mut membership, is_new) = match self
            .repository
            .find_by_user_id(&callback.user_id)
            .await?
        {
            Some(record) => (record, false),
            None => (
                MembershipRecord::register(MembershipId::new(), callback.user_id.clone(), now),
                true,
            ),
        };

        // 4. Redelivery of a transaction we already applied
        if membership.has_payment(&callback.provider_txn_id) {
            return Ok(ApplyPaymentCallbackResult::AlreadyApplied {
                provider_txn_id: callback.provider_txn_id,
            });
        }

        // 5. Capture the pre-purchase state for events
        let lapsed = !is_new && membership.is_expired(now);
        let stored_tier = membership.tier;
        let previous_tier = membership.effective_tier(now);

        // 6. Apply the purchase
        let payment = PaymentEntry::completed(
            callback.amount,
            "VND",
            plan.tier,
            callback.provider.clone(),
            callback.provider_txn_id.clone(),
            callback.paid_at,
        );
        membership.apply_purchase(plan.tier, plan.duration_days, payment, now)?;

        // 7. Persist
        if is_new {
            self.repository.save(&membership).await?;
        } else {
            self.repository.update(&membership).await?;
        }

        // 8. Publish events in causal order. A paid period that silently ran
        //    out is observed here, at the next write, so the expiry event goes
        //    out before the new purchase.
        let mut envelopes = Vec::new();
        if is_new {
            envelopes.push(
                MembershipEvent::Created {
                    membership_id: membership.id.clone(),
                    user_id: callback.user_id.clone(),
                    tier: previous_tier,
                    occurred_at: now,
                }
                .to_envelope(),
            );
        }
        if lapsed {
            envelopes.push(
                MembershipEvent::Expired {
                    membership_id: membership.id.clone(),
                    user_id: callback.user_id.clone(),
                    previous_tier: stored_tier,
                    occurred_at: now,
                }
                .to_envelope(),
            );
        }
        envelopes.push(
            MembershipEvent::Upgraded {
                membership_id: membership.id.clone(),
                user_id: callback.user_id.clone(),
                previous_tier,
                new_tier: plan.tier,
                expires_at: membership.expires_at.unwrap_or(now),
                occurred_at: now,
            }
            .to_envelope(),
        );
        self.event_publisher.publish_all(envelopes).await?;

        Ok(ApplyPaymentCallbackResult::Applied { membership })
    }
}
