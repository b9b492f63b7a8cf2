//! PostgreSQL implementation of ProcessedEventStore.
//!
//! The `event_id` primary key arbitrates concurrent deliveries: the
//! guarded insert succeeds for exactly one caller per id, and
//! `rows_affected` reports which caller that was. There is no read
//! before the write, so there is no window for two deliveries to both
//! claim the first slot.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{MarkOutcome, ProcessedEventStore};

/// PostgreSQL implementation of the ProcessedEventStore port.
#[derive(Clone)]
pub struct PostgresProcessedEventStore {
    pool: PgPool,
}

impl PostgresProcessedEventStore {
    /// Creates a new PostgresProcessedEventStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn mark_processed(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<MarkOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark event as processed: {}", e),
            )
        })?;

        if result.rows_affected() == 1 {
            Ok(MarkOutcome::FirstDelivery)
        } else {
            Ok(MarkOutcome::AlreadyProcessed)
        }
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM processed_webhook_events WHERE processed_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to prune processed events: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }
}
