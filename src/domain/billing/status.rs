//! Subscription status state machine.
//!
//! Defines all possible subscription states and valid transitions
//! according to the provider billing lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Provider subscription status.
///
/// Webhook `updated` events carry the provider's absolute status and are
/// applied as-is; the transition rules below guard only the paths this
/// service initiates itself (the expiry sweep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Fully paid subscription.
    Active,

    /// In a free trial period. Same access as Active.
    Trialing,

    /// Payment failed but within the provider's retry window.
    PastDue,

    /// User requested cancellation. Access continues until period end.
    Cancelled,

    /// Billing paused by the user or provider.
    Paused,

    /// Subscription ended. No paid access.
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if this status grants paid access unconditionally,
    /// regardless of period dates.
    pub fn in_good_standing(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }

    /// Returns true if this status keeps paid access only while the
    /// already-paid billing period has not yet lapsed.
    pub fn grace_eligible(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Cancelled | SubscriptionStatus::PastDue | SubscriptionStatus::Paused
        )
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From TRIALING
            (Trialing, Active)
                | (Trialing, PastDue)
                | (Trialing, Cancelled)
                | (Trialing, Paused)
                | (Trialing, Expired)
            // From ACTIVE
                | (Active, PastDue)
                | (Active, Cancelled)
                | (Active, Paused)
                | (Active, Expired)
                | (Active, Active) // Renewal
            // From PAST_DUE
                | (PastDue, Active)
                | (PastDue, Cancelled)
                | (PastDue, Expired)
            // From CANCELLED
                | (Cancelled, Active)
                | (Cancelled, Expired)
            // From PAUSED
                | (Paused, Active)
                | (Paused, Cancelled)
                | (Paused, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trialing => vec![Active, PastDue, Cancelled, Paused, Expired],
            Active => vec![PastDue, Cancelled, Paused, Expired, Active],
            PastDue => vec![Active, Cancelled, Expired],
            Cancelled => vec![Active, Expired],
            Paused => vec![Active, Cancelled, Expired],
            Expired => vec![],
        }
    }
}
