//! Subscription tier definitions.
//!
//! Represents the coarse access levels gating AI-driven features.

use serde::{Deserialize, Serialize};

/// Subscription tier.
///
/// Determines which gated features are available before credits are
/// even considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Free tier - no subscription, credit-gated features only.
    Free,

    /// Pro tier - active (or grace-period) subscription.
    /// Unlocks subscription-gated features and the monthly credit grant.
    Pro,
}

impl SubscriptionTier {
    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Pro => "Pro",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = more access. Used for required-tier checks.
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Pro => 1,
        }
    }

    /// Returns true if this tier satisfies a feature's required tier.
    pub fn satisfies(&self, required: &SubscriptionTier) -> bool {
        self.rank() >= required.rank()
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
