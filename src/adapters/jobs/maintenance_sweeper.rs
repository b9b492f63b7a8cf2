//! MaintenanceSweeper - Background service for time-driven billing work.
//!
//! Webhooks push state changes in; this service handles the changes
//! that arrive by clock instead:
//! 1. Expiring subscriptions whose grace period ran out
//! 2. Granting monthly credit refreshes that have come due
//! 3. Pruning processed-event marks past the retention window
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `sweep_interval` | 1h | How often a full pass runs |
//! | `batch_size` | 100 | Max rows per handler per pass |
//! | `retention_days` | 90 | How long processed-event marks are kept |
//!
//! ## Graceful Shutdown
//!
//! The service listens on a watch channel and stops between passes. A
//! pass that fails is logged and retried at the next tick; the loop
//! itself never dies.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::application::handlers::billing::{
    ExpireLapsedSubscriptionsCommand, ExpireLapsedSubscriptionsHandler,
};
use crate::application::handlers::credits::{
    RefreshCreditGrantsCommand, RefreshCreditGrantsHandler,
};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::ProcessedEventStore;

/// Configuration for the MaintenanceSweeper service.
#[derive(Debug, Clone)]
pub struct MaintenanceSweeperConfig {
    /// How often a full maintenance pass runs.
    pub sweep_interval: Duration,

    /// Maximum rows each handler touches per pass.
    pub batch_size: u32,

    /// Processed-event marks older than this are pruned.
    ///
    /// Must comfortably outlive the payment provider's retry horizon,
    /// or a pruned mark lets an ancient redelivery through.
    pub retention_days: u32,
}

impl Default for MaintenanceSweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(3600),
            batch_size: 100,
            retention_days: 90,
        }
    }
}

impl MaintenanceSweeperConfig {
    /// Create config with custom sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Create config with custom batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Create config with custom mark retention.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }
}

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepSummary {
    pub expired: usize,
    pub expiry_failed: usize,
    pub refreshed: usize,
    pub refresh_failed: usize,
    pub events_pruned: u64,
}

impl SweepSummary {
    /// True when the pass changed or failed to change anything.
    pub fn has_activity(&self) -> bool {
        self.expired > 0
            || self.expiry_failed > 0
            || self.refreshed > 0
            || self.refresh_failed > 0
            || self.events_pruned > 0
    }
}

/// Background service running the periodic maintenance pass.
pub struct MaintenanceSweeper {
    expiry: ExpireLapsedSubscriptionsHandler,
    refresh: RefreshCreditGrantsHandler,
    events: Arc<dyn ProcessedEventStore>,
    config: MaintenanceSweeperConfig,
}

impl MaintenanceSweeper {
    /// Create a new sweeper with default configuration.
    pub fn new(
        expiry: ExpireLapsedSubscriptionsHandler,
        refresh: RefreshCreditGrantsHandler,
        events: Arc<dyn ProcessedEventStore>,
    ) -> Self {
        Self {
            expiry,
            refresh,
            events,
            config: MaintenanceSweeperConfig::default(),
        }
    }

    /// Create a new sweeper with custom configuration.
    pub fn with_config(
        expiry: ExpireLapsedSubscriptionsHandler,
        refresh: RefreshCreditGrantsHandler,
        events: Arc<dyn ProcessedEventStore>,
        config: MaintenanceSweeperConfig,
    ) -> Self {
        Self {
            expiry,
            refresh,
            events,
            config,
        }
    }

    /// Run the sweep loop until a shutdown signal is received.
    ///
    /// The first pass runs immediately at startup, which catches up on
    /// work that accumulated while the service was down.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("maintenance sweeper stopping");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(error) = self.sweep_once(Timestamp::now()).await {
                        tracing::warn!(error = %error, "maintenance pass failed");
                    }
                }
            }
        }
    }

    /// Run a single maintenance pass against the given instant.
    ///
    /// Also the seam for tests: passing a future `now` simulates the
    /// clock reaching grace-period ends and refresh due dates.
    pub async fn sweep_once(&self, now: Timestamp) -> Result<SweepSummary, DomainError> {
        let expiry = self
            .expiry
            .handle(ExpireLapsedSubscriptionsCommand {
                now,
                limit: self.config.batch_size,
            })
            .await?;

        let refresh = self
            .refresh
            .handle(RefreshCreditGrantsCommand {
                now,
                limit: self.config.batch_size,
            })
            .await
            .map_err(DomainError::from)?;

        let cutoff = now.minus_days(i64::from(self.config.retention_days));
        let events_pruned = self.events.delete_before(cutoff).await?;

        let summary = SweepSummary {
            expired: expiry.expired,
            expiry_failed: expiry.failed,
            refreshed: refresh.refreshed,
            refresh_failed: refresh.failed,
            events_pruned,
        };

        if summary.has_activity() {
            tracing::info!(
                expired = summary.expired,
                expiry_failed = summary.expiry_failed,
                refreshed = summary.refreshed,
                refresh_failed = summary.refresh_failed,
                events_pruned = summary.events_pruned,
                "maintenance pass complete"
            );
        } else {
            tracing::debug!("maintenance pass found nothing to do");
        }

        Ok(summary)
    }
}
