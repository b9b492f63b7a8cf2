//! In-memory adapters for testing and local development.
//!
//! Deterministic, single-process implementations of the storage ports.
//! Each operation runs entirely under one lock acquisition, so the
//! atomicity contracts the ports require of real stores hold here too.

mod credits_ledger;
mod processed_event_store;
mod subscription_store;
mod tier_cache;

pub use credits_ledger::InMemoryCreditsLedger;
pub use processed_event_store::InMemoryProcessedEventStore;
pub use subscription_store::InMemorySubscriptionStore;
pub use tier_cache::InMemoryTierCache;
