//! SubscriptionStore port - subscription persistence.
//!
//! Defines the contract for storing subscriptions, including the atomic
//! creation unit that couples a new subscription with its first credit
//! grant and tier upgrade.
//!
//! # Design
//!
//! - **Provider id is the key**: webhook events locate subscriptions by
//!   `provider_subscription_id`, which is unique.
//! - **Soft state only**: subscriptions expire, they are never deleted.
//! - **All-or-nothing creation**: `create_with_grant` spans three writes
//!   (subscription row, first credit grant, cached tier) inside one
//!   transactional boundary; partial creation must be impossible.

use async_trait::async_trait;

use crate::domain::billing::{Subscription, SubscriptionTier};
use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// The first credit grant issued with a new subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionGrant {
    /// Monthly credit allowance to grant immediately.
    pub credits: i64,
    /// Tier to cache for the user.
    pub tier: SubscriptionTier,
    pub description: Option<String>,
    /// Provider event id that triggered the creation.
    pub external_ref: Option<String>,
}

impl SubscriptionGrant {
    pub fn new(credits: i64, tier: SubscriptionTier) -> Self {
        Self {
            credits,
            tier,
            description: None,
            external_ref: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }
}

/// Outcome of an atomic creation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Subscription, grant, and tier were all committed together.
    Created,
    /// A subscription with this provider id already exists; nothing
    /// was written (a redelivered or duplicated "created" event).
    AlreadyExists,
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created)
    }
}

/// Port for subscription persistence.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Atomically creates a subscription together with its first credit
    /// grant and the user's cached tier.
    ///
    /// Either all three effects commit, or none do. A duplicate
    /// `provider_subscription_id` reports `AlreadyExists` without
    /// writing anything.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure (whole unit rolled back)
    async fn create_with_grant(
        &self,
        subscription: &Subscription,
        grant: SubscriptionGrant,
    ) -> Result<CreateOutcome, DomainError>;

    /// Finds a subscription by the provider's subscription id.
    ///
    /// This is the lookup used for inbound webhook events.
    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Finds the subscription for a user.
    async fn find_by_user_id(&self, user_id: &UserId)
        -> Result<Option<Subscription>, DomainError>;

    /// Persists updated subscription state.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Finds subscriptions whose paid period has lapsed: status in a
    /// grace-eligible state (or flagged `cancel_at_period_end`) with
    /// `current_period_end` before `now`, excluding already-expired rows.
    ///
    /// Used by the periodic expiry sweep.
    async fn find_lapsed(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn subscription_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SubscriptionStore) {}
    }

    #[test]
    fn create_outcome_reports_created() {
        assert!(CreateOutcome::Created.is_created());
        assert!(!CreateOutcome::AlreadyExists.is_created());
    }

    #[test]
    fn grant_builders_attach_context() {
        let grant = SubscriptionGrant::new(100, SubscriptionTier::Pro)
            .with_description("initial allowance")
            .with_external_ref("evt_123");

        assert_eq!(grant.credits, 100);
        assert_eq!(grant.tier, SubscriptionTier::Pro);
        assert_eq!(grant.description.as_deref(), Some("initial allowance"));
        assert_eq!(grant.external_ref.as_deref(), Some("evt_123"));
    }
}
