//! ProcessedEventStore port - exactly-once marking of webhook event ids.
//!
//! This port enables idempotent webhook handling by recording which event
//! ids have been seen. The payment provider retries delivery on any
//! non-2xx response, and may redeliver an event while the first delivery
//! is still mid-processing, so the marking itself must be race-free.
//!
//! ## The One Rule
//!
//! `mark_processed` must be an insert guarded by a uniqueness constraint
//! on the event id, reporting whether this caller performed the first
//! insert. It must NEVER be implemented as "check existence, then
//! insert" - two concurrent deliveries would both pass the check and
//! both apply side effects, which is exactly the race this port exists
//! to close.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Outcome of attempting to mark an event id as processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This caller performed the first insert; side effects may run.
    FirstDelivery,
    /// The id was already marked (a retry or a concurrent delivery);
    /// side effects must be skipped, but the delivery is still reported
    /// as success so the sender stops retrying.
    AlreadyProcessed,
}

impl MarkOutcome {
    pub fn is_first(&self) -> bool {
        matches!(self, MarkOutcome::FirstDelivery)
    }
}

/// Port for tracking processed webhook event ids.
///
/// Implementations must back `mark_processed` with a uniqueness
/// constraint (e.g. `INSERT ... ON CONFLICT DO NOTHING` against a
/// primary key) so that exactly one caller per id observes
/// `FirstDelivery`, no matter how calls interleave. Marked ids are
/// never unmarked.
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Records `event_id` as processed.
    ///
    /// Returns `FirstDelivery` for exactly one caller per id across all
    /// processes; every other caller gets `AlreadyProcessed`.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<MarkOutcome, DomainError>;

    /// Deletes marks older than `cutoff` (retention policy).
    ///
    /// Returns the number of rows deleted. The retention window must
    /// exceed the provider's maximum retry horizon or pruning would
    /// reopen the dedup guarantee.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn processed_event_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn ProcessedEventStore) {}
    }

    #[test]
    fn mark_outcome_first_delivery_is_first() {
        assert!(MarkOutcome::FirstDelivery.is_first());
        assert!(!MarkOutcome::AlreadyProcessed.is_first());
    }
}
