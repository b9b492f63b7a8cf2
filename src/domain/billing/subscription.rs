//! Subscription aggregate entity.
//!
//! The Subscription aggregate mirrors the payment provider's view of a
//! user's recurring billing relationship. Each user has at most one
//! active subscription row, keyed by the provider's subscription id.
//!
//! # Design Decisions
//!
//! - **Provider is source of truth**: webhook events carry absolute
//!   status/period values and are applied as-is, never as deltas, so
//!   out-of-order delivery converges on the provider's state.
//! - **Soft state only**: rows are updated in place and eventually
//!   expired; never hard-deleted.
//! - **Guarded self-transitions**: only transitions this service
//!   initiates itself (expiry sweep) go through the state machine.

use crate::domain::foundation::{DomainError, StateMachine, SubscriptionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::{BillingCycle, SubscriptionStatus, SubscriptionTier};

/// Subscription aggregate - a user's provider billing relationship.
///
/// # Invariants
///
/// - `provider_subscription_id` is unique across all rows
/// - Period dates: `current_period_start <= current_period_end`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription row.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// Payment provider name (e.g. "stripe").
    pub provider: String,

    /// The provider's subscription identifier.
    pub provider_subscription_id: String,

    /// The provider's customer identifier, when known.
    pub provider_customer_id: Option<String>,

    /// Current status as last reported by the provider.
    pub status: SubscriptionStatus,

    /// Renewal interval.
    pub billing_cycle: BillingCycle,

    /// Start of current billing period.
    pub current_period_start: Timestamp,

    /// End of current billing period.
    pub current_period_end: Timestamp,

    /// Whether the subscription will not renew past the current period.
    pub cancel_at_period_end: bool,

    /// When the subscription row was created.
    pub created_at: Timestamp,

    /// When the subscription row was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Create a new subscription row from a normalized "created" event.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: SubscriptionId,
        user_id: UserId,
        provider: String,
        provider_subscription_id: String,
        provider_customer_id: Option<String>,
        status: SubscriptionStatus,
        billing_cycle: BillingCycle,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id,
            provider,
            provider_subscription_id,
            provider_customer_id,
            status,
            billing_cycle,
            current_period_start: period_start,
            current_period_end: period_end,
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Compute the tier this subscription entitles the user to right now.
    ///
    /// `pro` while the status is in good standing, or while a lapsing
    /// status (cancelled, past_due, paused) is still inside its already
    /// paid period. `free` otherwise, including expired.
    pub fn effective_tier(&self, now: Timestamp) -> SubscriptionTier {
        if self.status.in_good_standing() {
            return SubscriptionTier::Pro;
        }
        if self.status.grace_eligible() && self.current_period_end.is_after(&now) {
            return SubscriptionTier::Pro;
        }
        SubscriptionTier::Free
    }

    /// Apply an absolute status/period update from an `updated` event.
    ///
    /// Fields absent from the event keep their current values.
    pub fn apply_update(
        &mut self,
        status: SubscriptionStatus,
        period_start: Option<Timestamp>,
        period_end: Option<Timestamp>,
        cancel_at_period_end: Option<bool>,
    ) {
        self.status = status;
        if let Some(start) = period_start {
            self.current_period_start = start;
        }
        if let Some(end) = period_end {
            self.current_period_end = end;
        }
        if let Some(flag) = cancel_at_period_end {
            self.cancel_at_period_end = flag;
        }
        self.updated_at = Timestamp::now();
    }

    /// Apply a `cancelled` event: cancellation takes effect at period end.
    ///
    /// The tier is deliberately left to the grace-period computation;
    /// paid access persists until `current_period_end` lapses.
    pub fn mark_cancelled(&mut self) {
        self.status = SubscriptionStatus::Cancelled;
        self.cancel_at_period_end = true;
        self.updated_at = Timestamp::now();
    }

    /// Apply a `payment_succeeded` event: reactivate and roll the period.
    pub fn record_payment(&mut self, period_start: Option<Timestamp>, period_end: Option<Timestamp>) {
        self.status = SubscriptionStatus::Active;
        if let Some(start) = period_start {
            self.current_period_start = start;
        }
        if let Some(end) = period_end {
            self.current_period_end = end;
        }
        self.updated_at = Timestamp::now();
    }

    /// Apply a `payment_failed` event.
    ///
    /// Status only; access during the retry window is governed by the
    /// grace-period computation.
    pub fn mark_payment_failed(&mut self) {
        self.status = SubscriptionStatus::PastDue;
        self.updated_at = Timestamp::now();
    }

    /// Transition to expired. Used by the periodic sweep, not by events.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(SubscriptionStatus::Expired)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Returns true if the paid period has lapsed and the row is waiting
    /// for the expiry sweep.
    pub fn is_lapsed(&self, now: Timestamp) -> bool {
        if !self.current_period_end.is_before(&now) {
            return false;
        }
        self.status.grace_eligible() || (self.cancel_at_period_end && self.status != SubscriptionStatus::Expired)
    }
}
