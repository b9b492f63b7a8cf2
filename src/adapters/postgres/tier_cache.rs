//! PostgreSQL implementation of TierCache.
//!
//! One row per user, rewritten whenever subscription state changes. The
//! upsert keeps writes idempotent so webhook processing and the expiry
//! sweep can both set the tier without coordinating.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::billing::SubscriptionTier;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::TierCache;

/// PostgreSQL implementation of the TierCache port.
#[derive(Clone)]
pub struct PostgresTierCache {
    pool: PgPool,
}

impl PostgresTierCache {
    /// Creates a new PostgresTierCache with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_tier(s: &str) -> Result<SubscriptionTier, DomainError> {
    match s.to_lowercase().as_str() {
        "free" => Ok(SubscriptionTier::Free),
        "pro" => Ok(SubscriptionTier::Pro),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid tier value: {}", s),
        )),
    }
}

fn tier_to_string(tier: &SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Free => "free",
        SubscriptionTier::Pro => "pro",
    }
}

#[async_trait]
impl TierCache for PostgresTierCache {
    async fn get_tier(&self, user_id: &UserId) -> Result<Option<SubscriptionTier>, DomainError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT tier FROM user_tiers WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to load cached tier: {}", e),
                )
            })?;

        row.map(|(tier,)| parse_tier(&tier)).transpose()
    }

    async fn set_tier(
        &self,
        user_id: &UserId,
        tier: SubscriptionTier,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO user_tiers (user_id, tier, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET tier = EXCLUDED.tier, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id.as_str())
        .bind(tier_to_string(&tier))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to cache tier: {}", e),
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trips() {
        for tier in [SubscriptionTier::Free, SubscriptionTier::Pro] {
            assert_eq!(parse_tier(tier_to_string(&tier)).unwrap(), tier);
        }
    }

    #[test]
    fn test_parse_tier_normalizes_case() {
        assert_eq!(parse_tier("Pro").unwrap(), SubscriptionTier::Pro);
    }

    #[test]
    fn test_parse_tier_rejects_unknown() {
        let err = parse_tier("enterprise").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
