//! Tracing-backed analytics adapter.
//!
//! Emits each usage event as a structured log line. With the JSON
//! subscriber enabled, the lines are the analytics feed: downstream
//! pipelines filter on the `kind` field.

use async_trait::async_trait;

use crate::ports::{UsageAnalytics, UsageEvent};

/// `UsageAnalytics` implementation that records events to the tracing
/// pipeline.
///
/// Recording cannot fail; a dropped log line is a dropped data point,
/// never an error surfaced to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl TracingAnalytics {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UsageAnalytics for TracingAnalytics {
    async fn record(&self, event: UsageEvent) {
        let kind = event.kind();
        match event {
            UsageEvent::CreditsConsumed {
                user_id,
                feature_id,
                amount,
                balance_after,
            } => {
                tracing::info!(
                    kind,
                    user_id = %user_id,
                    feature_id = feature_id.as_ref().map(|f| f.as_str()),
                    amount,
                    balance_after,
                    "usage event"
                );
            }
            UsageEvent::CreditsGranted {
                user_id,
                credit_type,
                amount,
            } => {
                tracing::info!(
                    kind,
                    user_id = %user_id,
                    credit_type = credit_type.as_str(),
                    amount,
                    "usage event"
                );
            }
            UsageEvent::AccessDenied {
                user_id,
                feature_id,
                reason,
            } => {
                tracing::info!(
                    kind,
                    user_id = %user_id,
                    feature_id = %feature_id,
                    reason = %reason,
                    "usage event"
                );
            }
            UsageEvent::CreditsRefunded {
                user_id,
                amount,
                reason,
            } => {
                tracing::info!(
                    kind,
                    user_id = %user_id,
                    amount,
                    reason = %reason,
                    "usage event"
                );
            }
        }
    }
}
