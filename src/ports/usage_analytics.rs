//! UsageAnalytics port - fire-and-forget usage event recording.
//!
//! Credits activity (consumption, grants, denials, refunds) is recorded
//! for product analytics. The handle is injected explicitly into the
//! handlers that record usage; there is no process-wide global client.
//!
//! Recording is best-effort: `record` is infallible from the caller's
//! point of view, and implementations swallow and log their own
//! failures. Analytics must never change the outcome of a billing or
//! ledger operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::credits::CreditTransactionType;
use crate::domain::foundation::{FeatureId, UserId};

/// A usage event worth recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageEvent {
    /// Credits were deducted for a gated feature.
    CreditsConsumed {
        user_id: UserId,
        feature_id: Option<FeatureId>,
        amount: i64,
        balance_after: i64,
    },
    /// Credits were added to an account.
    CreditsGranted {
        user_id: UserId,
        credit_type: CreditTransactionType,
        amount: i64,
    },
    /// An access check denied a feature.
    AccessDenied {
        user_id: UserId,
        feature_id: FeatureId,
        reason: String,
    },
    /// A consumed amount was returned after a failed operation.
    CreditsRefunded {
        user_id: UserId,
        amount: i64,
        reason: String,
    },
}

impl UsageEvent {
    /// Stable tag for log and analytics pipelines.
    pub fn kind(&self) -> &'static str {
        match self {
            UsageEvent::CreditsConsumed { .. } => "credits_consumed",
            UsageEvent::CreditsGranted { .. } => "credits_granted",
            UsageEvent::AccessDenied { .. } => "access_denied",
            UsageEvent::CreditsRefunded { .. } => "credits_refunded",
        }
    }

    /// The user the event belongs to.
    pub fn user_id(&self) -> &UserId {
        match self {
            UsageEvent::CreditsConsumed { user_id, .. } => user_id,
            UsageEvent::CreditsGranted { user_id, .. } => user_id,
            UsageEvent::AccessDenied { user_id, .. } => user_id,
            UsageEvent::CreditsRefunded { user_id, .. } => user_id,
        }
    }
}

/// Port for recording usage events.
#[async_trait]
pub trait UsageAnalytics: Send + Sync {
    /// Records an event. Best-effort; never fails the caller.
    async fn record(&self, event: UsageEvent);
}
