//! CheckAccessHandler - Query handler for feature access checks.

use std::sync::Arc;

use crate::domain::billing::SubscriptionTier;
use crate::domain::credits::{CreditsError, DenialReason, FeatureCatalog};
use crate::domain::foundation::{FeatureId, Timestamp, UserId};
use crate::ports::{CreditsLedger, SubscriptionStore, TierCache, UsageAnalytics, UsageEvent};

/// Query to check whether a user may use a feature.
#[derive(Debug, Clone)]
pub struct CheckAccessQuery {
    pub user_id: UserId,
    pub feature_id: FeatureId,
}

/// Result of an access check.
///
/// A denial carries a structured reason so the caller can render an
/// upgrade or purchase prompt instead of a generic error.
#[derive(Debug, Clone)]
pub struct CheckAccessResult {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
}

/// Handler for feature access checks.
///
/// Tier gating reads the cached tier first. A cached claim of paid
/// access is double-checked against the live subscription, because the
/// cache can lag behind a lapsed `current_period_end`. A cached `free`
/// needs no such check: the cache is only ever upgraded through billing
/// events, so it cannot overstate in that direction.
///
/// This is a read path: a stale cache entry discovered here is left for
/// the expiry sweep to repair.
pub struct CheckAccessHandler {
    catalog: FeatureCatalog,
    ledger: Arc<dyn CreditsLedger>,
    subscriptions: Arc<dyn SubscriptionStore>,
    tiers: Arc<dyn TierCache>,
    analytics: Arc<dyn UsageAnalytics>,
}

impl CheckAccessHandler {
    pub fn new(
        catalog: FeatureCatalog,
        ledger: Arc<dyn CreditsLedger>,
        subscriptions: Arc<dyn SubscriptionStore>,
        tiers: Arc<dyn TierCache>,
        analytics: Arc<dyn UsageAnalytics>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            subscriptions,
            tiers,
            analytics,
        }
    }

    pub async fn handle(&self, query: CheckAccessQuery) -> Result<CheckAccessResult, CreditsError> {
        let feature = self
            .catalog
            .get(&query.feature_id)
            .ok_or_else(|| CreditsError::feature_not_found(query.feature_id.clone()))?;

        if let Some(required_tier) = feature.required_tier {
            let cached = self
                .tiers
                .get_tier(&query.user_id)
                .await?
                .unwrap_or(SubscriptionTier::Free);

            let tier = if cached.satisfies(&required_tier) {
                self.live_tier(&query.user_id).await?
            } else {
                cached
            };

            if !tier.satisfies(&required_tier) {
                let reason = DenialReason::SubscriptionRequired { required_tier };
                return self.deny(query, reason).await;
            }
        }

        if feature.credits_required > 0 {
            let account = self.ledger.get_or_create(&query.user_id).await?;
            if account.balance < feature.credits_required {
                let reason = DenialReason::InsufficientCredits {
                    required: feature.credits_required,
                    available: account.balance,
                };
                return self.deny(query, reason).await;
            }
        }

        Ok(CheckAccessResult {
            allowed: true,
            reason: None,
        })
    }

    /// Recomputes the tier from the live subscription row.
    async fn live_tier(&self, user_id: &UserId) -> Result<SubscriptionTier, CreditsError> {
        let now = Timestamp::now();
        let tier = self
            .subscriptions
            .find_by_user_id(user_id)
            .await?
            .map(|subscription| subscription.effective_tier(now))
            .unwrap_or(SubscriptionTier::Free);
        Ok(tier)
    }

    async fn deny(
        &self,
        query: CheckAccessQuery,
        reason: DenialReason,
    ) -> Result<CheckAccessResult, CreditsError> {
        self.analytics
            .record(UsageEvent::AccessDenied {
                user_id: query.user_id,
                feature_id: query.feature_id,
                reason: reason.code().to_string(),
            })
            .await;

        Ok(CheckAccessResult {
            allowed: false,
            reason: Some(reason),
        })
    }
}
