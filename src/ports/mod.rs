//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Ledger Ports
//!
//! - `CreditsLedger` - Atomic per-user balance operations and the
//!   transaction log
//!
//! ## Billing Ports
//!
//! - `ProcessedEventStore` - Exactly-once marking of webhook event ids
//! - `SubscriptionStore` - Subscription persistence and atomic creation
//! - `TierCache` - Denormalized per-user tier lookups
//! - `PaymentProvider` - Webhook signature verification and normalization
//!
//! ## Telemetry Ports
//!
//! - `UsageAnalytics` - Fire-and-forget usage event recording

mod credits_ledger;
mod payment_provider;
mod processed_event_store;
mod subscription_store;
mod tier_cache;
mod usage_analytics;

pub use credits_ledger::{AddCreditsRequest, ConsumeOutcome, ConsumeRequest, CreditsLedger};
pub use payment_provider::PaymentProvider;
pub use processed_event_store::{MarkOutcome, ProcessedEventStore};
pub use subscription_store::{CreateOutcome, SubscriptionGrant, SubscriptionStore};
pub use tier_cache::TierCache;
pub use usage_analytics::{UsageAnalytics, UsageEvent};
