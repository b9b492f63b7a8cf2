//! PostgreSQL adapters - Database implementations for persistence ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresCreditsLedger` - Atomic balance operations and the transaction log
//! - `PostgresProcessedEventStore` - Guarded-insert webhook dedup marks
//! - `PostgresSubscriptionStore` - Subscriptions with atomic provisioning
//! - `PostgresTierCache` - Upserted per-user tier rows

mod credits_ledger;
mod processed_event_store;
mod subscription_store;
mod tier_cache;

pub use credits_ledger::PostgresCreditsLedger;
pub use processed_event_store::PostgresProcessedEventStore;
pub use subscription_store::PostgresSubscriptionStore;
pub use tier_cache::PostgresTierCache;
