//! PostgreSQL implementation of SubscriptionStore.
//!
//! `create_with_grant` is the atomic provisioning unit: the subscription
//! row, the initial credit grant with its log entry, and the cached tier
//! all commit in one database transaction. The unique constraint on
//! `provider_subscription_id` turns redelivered "created" events into a
//! clean `AlreadyExists` instead of a double grant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingCycle, Subscription, SubscriptionStatus, SubscriptionTier};
use crate::domain::credits::{CreditTransaction, CreditTransactionType};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::ports::{CreateOutcome, SubscriptionGrant, SubscriptionStore};

/// PostgreSQL implementation of the SubscriptionStore port.
#[derive(Clone)]
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a new PostgresSubscriptionStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row for subscription queries.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    provider: String,
    provider_subscription_id: String,
    provider_customer_id: Option<String>,
    status: String,
    billing_cycle: String,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    cancel_at_period_end: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: parse_user_id(&row.user_id)?,
            provider: row.provider,
            provider_subscription_id: row.provider_subscription_id,
            provider_customer_id: row.provider_customer_id,
            status: parse_status(&row.status)?,
            billing_cycle: parse_billing_cycle(&row.billing_cycle)?,
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_user_id(s: &str) -> Result<UserId, DomainError> {
    UserId::new(s).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid user id value: {}", e),
        )
    })
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "active" => Ok(SubscriptionStatus::Active),
        "trialing" => Ok(SubscriptionStatus::Trialing),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        "paused" => Ok(SubscriptionStatus::Paused),
        "expired" => Ok(SubscriptionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn status_to_string(status: &SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::Trialing => "trialing",
        SubscriptionStatus::PastDue => "past_due",
        SubscriptionStatus::Cancelled => "cancelled",
        SubscriptionStatus::Paused => "paused",
        SubscriptionStatus::Expired => "expired",
    }
}

fn parse_billing_cycle(s: &str) -> Result<BillingCycle, DomainError> {
    match s.to_lowercase().as_str() {
        "monthly" => Ok(BillingCycle::Monthly),
        "annual" => Ok(BillingCycle::Annual),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid billing cycle value: {}", s),
        )),
    }
}

fn billing_cycle_to_string(cycle: &BillingCycle) -> &'static str {
    match cycle {
        BillingCycle::Monthly => "monthly",
        BillingCycle::Annual => "annual",
    }
}

fn tier_to_string(tier: &SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Free => "free",
        SubscriptionTier::Pro => "pro",
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn create_with_grant(
        &self,
        subscription: &Subscription,
        grant: SubscriptionGrant,
    ) -> Result<CreateOutcome, DomainError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to start transaction: {}", e),
            )
        })?;

        let insert = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, provider, provider_subscription_id, provider_customer_id,
                status, billing_cycle, current_period_start, current_period_end,
                cancel_at_period_end, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(&subscription.provider)
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.provider_customer_id.as_deref())
        .bind(status_to_string(&subscription.status))
        .bind(billing_cycle_to_string(&subscription.billing_cycle))
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_provider_subscription_id_key") {
                    // Dropping the transaction rolls it back; nothing was
                    // written for this duplicate.
                    return Ok(CreateOutcome::AlreadyExists);
                }
            }
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert subscription: {}", e),
            ));
        }

        // The grant needs an account row to land on.
        sqlx::query(
            r#"
            INSERT INTO user_credits (
                user_id, balance, total_granted, total_consumed, total_purchased,
                subscription_credits_per_month, created_at, updated_at
            ) VALUES ($1, 0, 0, 0, 0, 0, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to create credit account: {}", e),
            )
        })?;

        if grant.credits > 0 {
            let next_refresh = Timestamp::from_datetime(now).add_months(1);
            let (balance,): (i64,) = sqlx::query_as(
                r#"
                UPDATE user_credits
                SET balance = balance + $2,
                    total_granted = total_granted + $2,
                    subscription_credits_per_month = $2,
                    last_refresh_at = $3,
                    next_refresh_at = $4,
                    updated_at = $3
                WHERE user_id = $1
                RETURNING balance
                "#,
            )
            .bind(subscription.user_id.as_str())
            .bind(grant.credits)
            .bind(now)
            .bind(next_refresh.as_datetime())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to apply subscription grant: {}", e),
                )
            })?;

            let mut transaction = CreditTransaction::record(
                subscription.user_id.clone(),
                CreditTransactionType::SubscriptionGrant,
                grant.credits,
                balance - grant.credits,
                balance,
            );
            if let Some(description) = grant.description {
                transaction = transaction.with_description(description);
            }
            if let Some(external_ref) = grant.external_ref {
                transaction = transaction.with_external_ref(external_ref);
            }

            sqlx::query(
                r#"
                INSERT INTO credit_transactions (
                    id, user_id, transaction_type, amount, balance_before, balance_after,
                    feature_id, description, external_ref, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(transaction.id.as_uuid())
            .bind(transaction.user_id.as_str())
            .bind(transaction.transaction_type.as_str())
            .bind(transaction.amount)
            .bind(transaction.balance_before)
            .bind(transaction.balance_after)
            .bind(transaction.feature_id.as_ref().map(|f| f.as_str()))
            .bind(transaction.description.as_deref())
            .bind(transaction.external_ref.as_deref())
            .bind(transaction.created_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to insert credit transaction: {}", e),
                )
            })?;
        }

        sqlx::query(
            r#"
            INSERT INTO user_tiers (user_id, tier, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET tier = EXCLUDED.tier, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(tier_to_string(&grant.tier))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to cache tier: {}", e),
            )
        })?;

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit transaction: {}", e),
            )
        })?;

        Ok(CreateOutcome::Created)
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, provider, provider_subscription_id, provider_customer_id,
                   status, billing_cycle, current_period_start, current_period_end,
                   cancel_at_period_end, created_at, updated_at
            FROM subscriptions
            WHERE provider_subscription_id = $1
            "#,
        )
        .bind(provider_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, provider, provider_subscription_id, provider_customer_id,
                   status, billing_cycle, current_period_start, current_period_end,
                   cancel_at_period_end, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2,
                billing_cycle = $3,
                current_period_start = $4,
                current_period_end = $5,
                cancel_at_period_end = $6,
                provider_customer_id = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(status_to_string(&subscription.status))
        .bind(billing_cycle_to_string(&subscription.billing_cycle))
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.provider_customer_id.as_deref())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", subscription.id),
            ));
        }

        Ok(())
    }

    async fn find_lapsed(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, provider, provider_subscription_id, provider_customer_id,
                   status, billing_cycle, current_period_start, current_period_end,
                   cancel_at_period_end, created_at, updated_at
            FROM subscriptions
            WHERE current_period_end < $1
              AND (
                  status IN ('cancelled', 'past_due', 'paused')
                  OR (cancel_at_period_end AND status != 'expired')
              )
            ORDER BY current_period_end ASC
            LIMIT $2
            "#,
        )
        .bind(now.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find lapsed subscriptions: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}
