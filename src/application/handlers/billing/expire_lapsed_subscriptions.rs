//! ExpireLapsedSubscriptionsHandler - Command handler for the expiry sweep.
//!
//! Webhooks alone cannot close a grace period: a cancelled subscription
//! whose paid period quietly runs out produces no further events. This
//! sweep finds those rows and downgrades them.

use std::sync::Arc;

use crate::domain::billing::SubscriptionTier;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SubscriptionStore, TierCache};

/// Command to expire all lapsed subscriptions.
#[derive(Debug, Clone)]
pub struct ExpireLapsedSubscriptionsCommand {
    /// The instant lapse is judged against; normally `Timestamp::now()`.
    pub now: Timestamp,
    /// Maximum number of subscriptions to expire in one pass.
    pub limit: u32,
}

/// Result of one expiry pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpireLapsedSubscriptionsResult {
    pub expired: usize,
    pub failed: usize,
}

/// Handler transitioning lapsed subscriptions to `expired` and their
/// users' cached tier to `free`.
pub struct ExpireLapsedSubscriptionsHandler {
    subscriptions: Arc<dyn SubscriptionStore>,
    tiers: Arc<dyn TierCache>,
}

impl ExpireLapsedSubscriptionsHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, tiers: Arc<dyn TierCache>) -> Self {
        Self {
            subscriptions,
            tiers,
        }
    }

    pub async fn handle(
        &self,
        cmd: ExpireLapsedSubscriptionsCommand,
    ) -> Result<ExpireLapsedSubscriptionsResult, DomainError> {
        let lapsed = self.subscriptions.find_lapsed(cmd.now, cmd.limit).await?;

        let mut expired = 0;
        let mut failed = 0;

        for mut subscription in lapsed {
            // One stuck row must not starve the rest of the batch.
            if let Err(error) = subscription.expire() {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    status = ?subscription.status,
                    error = %error,
                    "expiry transition refused"
                );
                failed += 1;
                continue;
            }

            if let Err(error) = self.subscriptions.update(&subscription).await {
                tracing::warn!(
                    subscription_id = %subscription.id,
                    error = %error,
                    "failed to persist subscription expiry"
                );
                failed += 1;
                continue;
            }

            if let Err(error) = self
                .tiers
                .set_tier(&subscription.user_id, SubscriptionTier::Free)
                .await
            {
                // The row is already expired; the cached tier is stale
                // until the next access check recomputes it live.
                tracing::warn!(
                    user_id = %subscription.user_id,
                    error = %error,
                    "failed to downgrade cached tier after expiry"
                );
                failed += 1;
                continue;
            }

            tracing::info!(
                subscription_id = %subscription.id,
                user_id = %subscription.user_id,
                "lapsed subscription expired"
            );
            expired += 1;
        }

        Ok(ExpireLapsedSubscriptionsResult { expired, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCreditsLedger, InMemorySubscriptionStore, InMemoryTierCache,
    };
    use crate::domain::billing::{BillingCycle, Subscription, SubscriptionStatus};
    use crate::domain::foundation::{SubscriptionId, UserId};
    use crate::ports::SubscriptionGrant;

    fn test_user_id() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    struct Rig {
        subscriptions: Arc<InMemorySubscriptionStore>,
        tiers: Arc<InMemoryTierCache>,
        handler: ExpireLapsedSubscriptionsHandler,
    }

    fn rig() -> Rig {
        let ledger = Arc::new(InMemoryCreditsLedger::new());
        let tiers = Arc::new(InMemoryTierCache::new());
        let subscriptions = Arc::new(InMemorySubscriptionStore::new(ledger, tiers.clone()));
        let handler =
            ExpireLapsedSubscriptionsHandler::new(subscriptions.clone(), tiers.clone());
        Rig {
            subscriptions,
            tiers,
            handler,
        }
    }

    async fn seed(rig: &Rig, status: SubscriptionStatus, period_end: Timestamp) {
        let subscription = Subscription::create(
            SubscriptionId::new(),
            test_user_id(),
            "stripe".to_string(),
            "sub_test_123".to_string(),
            None,
            status,
            BillingCycle::Monthly,
            Timestamp::now().minus_days(40),
            period_end,
        );
        rig.subscriptions
            .create_with_grant(
                &subscription,
                SubscriptionGrant::new(0, SubscriptionTier::Pro),
            )
            .await
            .unwrap();
    }

    fn sweep_now() -> ExpireLapsedSubscriptionsCommand {
        ExpireLapsedSubscriptionsCommand {
            now: Timestamp::now(),
            limit: 100,
        }
    }

    #[tokio::test]
    async fn expires_lapsed_subscription_and_downgrades_tier() {
        let rig = rig();
        seed(
            &rig,
            SubscriptionStatus::Cancelled,
            Timestamp::now().minus_days(10),
        )
        .await;

        let result = rig.handler.handle(sweep_now()).await.unwrap();

        assert_eq!(result, ExpireLapsedSubscriptionsResult { expired: 1, failed: 0 });
        let subscription = rig
            .subscriptions
            .find_by_provider_subscription_id("sub_test_123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Expired);
        assert_eq!(
            rig.tiers.get_tier(&test_user_id()).await.unwrap(),
            Some(SubscriptionTier::Free)
        );
    }

    #[tokio::test]
    async fn active_subscription_is_untouched() {
        let rig = rig();
        seed(
            &rig,
            SubscriptionStatus::Active,
            Timestamp::now().add_days(20),
        )
        .await;

        let result = rig.handler.handle(sweep_now()).await.unwrap();

        assert_eq!(result.expired, 0);
        assert_eq!(
            rig.tiers.get_tier(&test_user_id()).await.unwrap(),
            Some(SubscriptionTier::Pro)
        );
    }

    #[tokio::test]
    async fn grace_period_resists_the_sweep() {
        let rig = rig();
        seed(
            &rig,
            SubscriptionStatus::Cancelled,
            Timestamp::now().add_days(10),
        )
        .await;

        let result = rig.handler.handle(sweep_now()).await.unwrap();

        assert_eq!(result.expired, 0);
        assert_eq!(
            rig.tiers.get_tier(&test_user_id()).await.unwrap(),
            Some(SubscriptionTier::Pro)
        );
    }

    #[tokio::test]
    async fn expired_rows_are_not_swept_again() {
        let rig = rig();
        seed(
            &rig,
            SubscriptionStatus::PastDue,
            Timestamp::now().minus_days(10),
        )
        .await;

        let first = rig.handler.handle(sweep_now()).await.unwrap();
        let second = rig.handler.handle(sweep_now()).await.unwrap();

        assert_eq!(first.expired, 1);
        assert_eq!(second.expired, 0);
    }
}
