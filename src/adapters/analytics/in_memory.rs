//! In-memory analytics recorder for testing and local runs.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{UsageAnalytics, UsageEvent};

/// In-memory `UsageAnalytics` implementation.
///
/// Keeps every recorded event so tests can assert on what the handlers
/// reported.
///
/// # Panics
///
/// Methods may panic if the internal lock is poisoned.
#[derive(Default)]
pub struct InMemoryAnalytics {
    events: Mutex<Vec<UsageEvent>>,
}

impl InMemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in arrival order.
    pub fn events(&self) -> Vec<UsageEvent> {
        self.events
            .lock()
            .expect("InMemoryAnalytics: lock poisoned")
            .clone()
    }

    /// Number of recorded events with the given kind tag.
    pub fn count_of(&self, kind: &str) -> usize {
        self.events
            .lock()
            .expect("InMemoryAnalytics: lock poisoned")
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .expect("InMemoryAnalytics: lock poisoned")
            .clear();
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .expect("InMemoryAnalytics: lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageAnalytics for InMemoryAnalytics {
    async fn record(&self, event: UsageEvent) {
        self.events
            .lock()
            .expect("InMemoryAnalytics: lock poisoned")
            .push(event);
    }
}
