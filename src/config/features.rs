//! Feature catalog configuration

use serde::Deserialize;

/// Feature catalog configuration
///
/// The gated-feature catalog ships with built-in defaults; deployments
/// can layer their own catalog on top from a YAML file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeaturesConfig {
    /// Path to a YAML catalog merged over the built-in defaults
    pub catalog_path: Option<String>,
}
