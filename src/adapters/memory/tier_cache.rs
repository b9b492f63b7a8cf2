//! In-memory tier cache for testing and local runs.
//!
//! # Security Note
//!
//! This adapter is for **testing and local development**. It uses
//! `.expect()` on lock operations which will panic if the lock is
//! poisoned.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::SubscriptionTier;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::TierCache;

/// In-memory `TierCache` implementation.
///
/// # Panics
///
/// Methods may panic if the internal lock is poisoned.
pub struct InMemoryTierCache {
    tiers: Mutex<HashMap<String, SubscriptionTier>>,
}

impl InMemoryTierCache {
    pub fn new() -> Self {
        Self {
            tiers: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTierCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TierCache for InMemoryTierCache {
    async fn get_tier(&self, user_id: &UserId) -> Result<Option<SubscriptionTier>, DomainError> {
        let tiers = self.tiers.lock().expect("InMemoryTierCache: lock poisoned");
        Ok(tiers.get(user_id.as_str()).copied())
    }

    async fn set_tier(
        &self,
        user_id: &UserId,
        tier: SubscriptionTier,
    ) -> Result<(), DomainError> {
        let mut tiers = self.tiers.lock().expect("InMemoryTierCache: lock poisoned");
        tiers.insert(user_id.to_string(), tier);
        Ok(())
    }
}
