//! In-memory processed-event store for testing and local runs.
//!
//! The mark is an insert-if-absent under a single lock acquisition, so
//! exactly one caller per event id observes `FirstDelivery` even when
//! tasks race.
//!
//! # Security Note
//!
//! This adapter is for **testing and local development**. It uses
//! `.expect()` on lock operations which will panic if the lock is
//! poisoned. Production code should use the PostgreSQL store, whose
//! primary-key constraint arbitrates across processes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{MarkOutcome, ProcessedEventStore};

struct ProcessedMark {
    #[allow(dead_code)]
    event_type: String,
    processed_at: Timestamp,
}

/// In-memory `ProcessedEventStore` implementation.
///
/// # Panics
///
/// Methods may panic if the internal lock is poisoned.
pub struct InMemoryProcessedEventStore {
    marks: Mutex<HashMap<String, ProcessedMark>>,
}

impl InMemoryProcessedEventStore {
    pub fn new() -> Self {
        Self {
            marks: Mutex::new(HashMap::new()),
        }
    }

    // === Test Helpers ===

    /// Returns the number of marked event ids.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn mark_count(&self) -> usize {
        self.marks
            .lock()
            .expect("InMemoryProcessedEventStore: lock poisoned")
            .len()
    }
}

impl Default for InMemoryProcessedEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<MarkOutcome, DomainError> {
        let mut marks = self
            .marks
            .lock()
            .expect("InMemoryProcessedEventStore: lock poisoned");

        if marks.contains_key(event_id) {
            return Ok(MarkOutcome::AlreadyProcessed);
        }
        marks.insert(
            event_id.to_string(),
            ProcessedMark {
                event_type: event_type.to_string(),
                processed_at: Timestamp::now(),
            },
        );
        Ok(MarkOutcome::FirstDelivery)
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut marks = self
            .marks
            .lock()
            .expect("InMemoryProcessedEventStore: lock poisoned");
        let before = marks.len();
        marks.retain(|_, mark| !mark.processed_at.is_before(&cutoff));
        Ok((before - marks.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_mark_reports_first_delivery() {
        let store = InMemoryProcessedEventStore::new();

        let outcome = store
            .mark_processed("evt_1", "subscription.created")
            .await
            .unwrap();

        assert_eq!(outcome, MarkOutcome::FirstDelivery);
    }

    #[tokio::test]
    async fn second_mark_reports_already_processed() {
        let store = InMemoryProcessedEventStore::new();

        store
            .mark_processed("evt_1", "subscription.created")
            .await
            .unwrap();
        let outcome = store
            .mark_processed("evt_1", "subscription.created")
            .await
            .unwrap();

        assert_eq!(outcome, MarkOutcome::AlreadyProcessed);
    }

    #[tokio::test]
    async fn distinct_event_ids_mark_independently() {
        let store = InMemoryProcessedEventStore::new();

        let first = store.mark_processed("evt_1", "a").await.unwrap();
        let second = store.mark_processed("evt_2", "b").await.unwrap();

        assert!(first.is_first());
        assert!(second.is_first());
        assert_eq!(store.mark_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_marks_yield_exactly_one_first_delivery() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryProcessedEventStore::new());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.mark_processed("evt_race", "subscription.created").await
            }));
        }

        let mut firsts = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_first() {
                firsts += 1;
            }
        }

        assert_eq!(firsts, 1);
    }

    #[tokio::test]
    async fn delete_before_prunes_only_old_marks() {
        let store = InMemoryProcessedEventStore::new();

        store.mark_processed("evt_recent", "a").await.unwrap();

        // Nothing older than a cutoff in the past
        let deleted = store
            .delete_before(Timestamp::now().minus_days(1))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(store.mark_count(), 1);

        // Everything older than a future cutoff
        let deleted = store
            .delete_before(Timestamp::now().add_days(1))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.mark_count(), 0);

        // Pruned ids can be marked again; retention must outlive the
        // provider's retry horizon for the guarantee to hold.
        let outcome = store.mark_processed("evt_recent", "a").await.unwrap();
        assert!(outcome.is_first());
    }
}
