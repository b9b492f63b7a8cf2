//! In-memory subscription store for testing and local runs.
//!
//! Composes the in-memory ledger and tier cache so that
//! `create_with_grant` applies all three effects (subscription, first
//! grant, cached tier) within one call. In a single process there is no
//! partial-failure window; the PostgreSQL adapter provides the same
//! guarantee with a real transaction.
//!
//! # Security Note
//!
//! This adapter is for **testing and local development**. It uses
//! `.expect()` on lock operations which will panic if the lock is
//! poisoned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::adapters::memory::{InMemoryCreditsLedger, InMemoryTierCache};
use crate::domain::billing::Subscription;
use crate::domain::credits::CreditTransactionType;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{
    AddCreditsRequest, CreateOutcome, CreditsLedger, SubscriptionGrant, SubscriptionStore,
    TierCache,
};

/// In-memory `SubscriptionStore` implementation.
///
/// # Panics
///
/// Methods may panic if the internal lock is poisoned.
pub struct InMemorySubscriptionStore {
    /// Keyed by `provider_subscription_id`; that key is the uniqueness
    /// constraint duplicate "created" events race on.
    subscriptions: Mutex<HashMap<String, Subscription>>,
    ledger: Arc<InMemoryCreditsLedger>,
    tiers: Arc<InMemoryTierCache>,
}

impl InMemorySubscriptionStore {
    pub fn new(ledger: Arc<InMemoryCreditsLedger>, tiers: Arc<InMemoryTierCache>) -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            ledger,
            tiers,
        }
    }

    // === Test Helpers ===

    /// Returns the number of stored subscriptions.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .expect("InMemorySubscriptionStore: lock poisoned")
            .len()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn create_with_grant(
        &self,
        subscription: &Subscription,
        grant: SubscriptionGrant,
    ) -> Result<CreateOutcome, DomainError> {
        if grant.credits < 0 {
            return Err(DomainError::validation(
                "credits",
                "Grant credits cannot be negative",
            ));
        }

        {
            let mut subscriptions = self
                .subscriptions
                .lock()
                .expect("InMemorySubscriptionStore: lock poisoned");
            if subscriptions.contains_key(&subscription.provider_subscription_id) {
                return Ok(CreateOutcome::AlreadyExists);
            }
            subscriptions.insert(
                subscription.provider_subscription_id.clone(),
                subscription.clone(),
            );
        }

        if grant.credits > 0 {
            let mut request = AddCreditsRequest::new(
                subscription.user_id.clone(),
                grant.credits,
                CreditTransactionType::SubscriptionGrant,
            );
            if let Some(description) = grant.description {
                request = request.with_description(description);
            }
            if let Some(external_ref) = grant.external_ref {
                request = request.with_external_ref(external_ref);
            }
            self.ledger.add_credits(request).await?;
        }
        self.tiers.set_tier(&subscription.user_id, grant.tier).await?;

        Ok(CreateOutcome::Created)
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let subscriptions = self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionStore: lock poisoned");
        Ok(subscriptions.get(provider_subscription_id).cloned())
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let subscriptions = self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionStore: lock poisoned");
        // A user who re-subscribes accumulates rows; the newest one is
        // the live subscription.
        Ok(subscriptions
            .values()
            .filter(|s| s.user_id == *user_id)
            .max_by_key(|s| s.created_at.as_datetime())
            .cloned())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionStore: lock poisoned");
        match subscriptions.get_mut(&subscription.provider_subscription_id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!(
                    "No subscription with provider id {}",
                    subscription.provider_subscription_id
                ),
            )),
        }
    }

    async fn find_lapsed(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError> {
        let subscriptions = self
            .subscriptions
            .lock()
            .expect("InMemorySubscriptionStore: lock poisoned");
        Ok(subscriptions
            .values()
            .filter(|s| s.is_lapsed(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
