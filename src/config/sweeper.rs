//! Maintenance sweeper configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Background maintenance loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Run the maintenance loop at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between maintenance passes
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum rows handled per pass for each sweep stage
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Days to keep processed webhook event marks before pruning
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl SweeperConfig {
    /// Get the sweep interval as a Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate sweeper configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize);
        }
        if self.retention_days == 0 {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sweep_interval_secs: default_sweep_interval(),
            batch_size: default_batch_size(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_batch_size() -> u32 {
    100
}

fn default_retention_days() -> u32 {
    90
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeper_config_defaults() {
        let config = SweeperConfig::default();
        assert!(config.enabled);
        assert_eq!(config.sweep_interval_secs, 3600);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.retention_days, 90);
    }

    #[test]
    fn sweep_interval_converts_to_duration() {
        let config = SweeperConfig {
            sweep_interval_secs: 60,
            ..Default::default()
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn validation_rejects_zero_interval() {
        let config = SweeperConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_batch() {
        let config = SweeperConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_retention() {
        let config = SweeperConfig {
            retention_days: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidRetention)
        ));
    }
}
