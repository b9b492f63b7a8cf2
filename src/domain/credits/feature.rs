//! Feature catalog and access decisions.
//!
//! A feature declares what it costs to use: an optional minimum
//! subscription tier, a credit price, or both. The catalog ships with
//! compiled-in defaults and can be overlaid from a YAML file at startup.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::billing::SubscriptionTier;
use crate::domain::foundation::{FeatureId, ValidationError};

/// Gating requirements for a single feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Minimum tier required, if the feature is tier-gated.
    #[serde(default)]
    pub required_tier: Option<SubscriptionTier>,
    /// Credits consumed per use; 0 for tier-only features.
    #[serde(default)]
    pub credits_required: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Compiled-in catalog used when no override file is configured.
static DEFAULT_FEATURES: Lazy<HashMap<String, FeatureSpec>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(
        "ai_chat".to_string(),
        FeatureSpec {
            required_tier: None,
            credits_required: 1,
            description: Some("Conversational AI assistant".to_string()),
        },
    );
    map.insert(
        "ai_analysis".to_string(),
        FeatureSpec {
            required_tier: Some(SubscriptionTier::Pro),
            credits_required: 5,
            description: Some("Deep AI analysis run".to_string()),
        },
    );
    map.insert(
        "advanced_reports".to_string(),
        FeatureSpec {
            required_tier: Some(SubscriptionTier::Pro),
            credits_required: 0,
            description: Some("Full report exports".to_string()),
        },
    );
    map
});

/// The set of gated features known to this deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCatalog {
    pub features: HashMap<String, FeatureSpec>,
}

impl FeatureCatalog {
    /// Returns the compiled-in default catalog.
    pub fn defaults() -> Self {
        Self {
            features: DEFAULT_FEATURES.clone(),
        }
    }

    /// Parses a catalog from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ValidationError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ValidationError::invalid_format("feature_catalog", e.to_string()))
    }

    /// Overlays `other`'s entries onto this catalog. Entries in `other`
    /// replace same-named entries here; everything else is kept.
    pub fn merged_with(mut self, other: FeatureCatalog) -> Self {
        self.features.extend(other.features);
        self
    }

    pub fn get(&self, feature_id: &FeatureId) -> Option<&FeatureSpec> {
        self.features.get(feature_id.as_str())
    }

    pub fn contains(&self, feature_id: &FeatureId) -> bool {
        self.features.contains_key(feature_id.as_str())
    }
}

impl Default for FeatureCatalog {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Why an access check denied a request.
///
/// Reasons are structured so callers can render a targeted upgrade or
/// purchase prompt instead of a generic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    SubscriptionRequired { required_tier: SubscriptionTier },
    InsufficientCredits { required: i64, available: i64 },
}

impl DenialReason {
    /// Stable machine-readable tag for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::SubscriptionRequired { .. } => "subscription_required",
            DenialReason::InsufficientCredits { .. } => "insufficient_credits",
        }
    }

    /// User-facing explanation with a call to action.
    pub fn message(&self) -> String {
        match self {
            DenialReason::SubscriptionRequired { required_tier } => {
                format!(
                    "This feature requires a {} subscription. Upgrade to continue.",
                    required_tier.display_name()
                )
            }
            DenialReason::InsufficientCredits {
                required,
                available,
            } => {
                format!(
                    "Not enough credits: {} needed, {} available. Purchase more credits to continue.",
                    required, available
                )
            }
        }
    }
}

/// Outcome of a feature access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
}

impl AccessDecision {
    pub fn granted() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}
