//! TierCache port - denormalized per-user tier lookups.
//!
//! The cached tier is the fast path for access checks: a single keyed
//! read instead of loading and evaluating the subscription. It is a
//! projection, not a source of truth - webhook processing and the expiry
//! sweep rewrite it whenever subscription state changes, and access
//! checks double-check the live subscription before honoring a cached
//! `pro`.

use async_trait::async_trait;

use crate::domain::billing::SubscriptionTier;
use crate::domain::foundation::{DomainError, UserId};

/// Port for the per-user cached tier.
#[async_trait]
pub trait TierCache: Send + Sync {
    /// Returns the cached tier, or `None` if the user has never had one
    /// written (treated as `free` by callers).
    async fn get_tier(&self, user_id: &UserId) -> Result<Option<SubscriptionTier>, DomainError>;

    /// Writes the cached tier, overwriting any previous value.
    async fn set_tier(&self, user_id: &UserId, tier: SubscriptionTier)
        -> Result<(), DomainError>;
}
