//! PostgreSQL implementation of CreditsLedger.
//!
//! The balance row is the concurrency arbiter: consumption is a single
//! conditional `UPDATE ... WHERE balance >= amount`, so overlapping
//! requests can never overdraw an account no matter how many processes
//! serve them. Every balance change appends one `credit_transactions`
//! row inside the same database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::credits::{CreditAccount, CreditTransaction, CreditTransactionType};
use crate::domain::foundation::{
    DomainError, ErrorCode, FeatureId, Timestamp, TransactionId, UserId,
};
use crate::ports::{AddCreditsRequest, ConsumeOutcome, ConsumeRequest, CreditsLedger};

/// PostgreSQL implementation of the CreditsLedger port.
#[derive(Clone)]
pub struct PostgresCreditsLedger {
    pool: PgPool,
}

impl PostgresCreditsLedger {
    /// Creates a new PostgresCreditsLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row for user_credits queries.
#[derive(Debug, sqlx::FromRow)]
struct CreditAccountRow {
    user_id: String,
    balance: i64,
    total_granted: i64,
    total_consumed: i64,
    total_purchased: i64,
    subscription_credits_per_month: i64,
    last_refresh_at: Option<DateTime<Utc>>,
    next_refresh_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CreditAccountRow> for CreditAccount {
    type Error = DomainError;

    fn try_from(row: CreditAccountRow) -> Result<Self, Self::Error> {
        Ok(CreditAccount {
            user_id: parse_user_id(&row.user_id)?,
            balance: row.balance,
            total_granted: row.total_granted,
            total_consumed: row.total_consumed,
            total_purchased: row.total_purchased,
            subscription_credits_per_month: row.subscription_credits_per_month,
            last_refresh_at: row.last_refresh_at.map(Timestamp::from_datetime),
            next_refresh_at: row.next_refresh_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Row for credit_transactions queries.
#[derive(Debug, sqlx::FromRow)]
struct CreditTransactionRow {
    id: Uuid,
    user_id: String,
    transaction_type: String,
    amount: i64,
    balance_before: i64,
    balance_after: i64,
    feature_id: Option<String>,
    description: Option<String>,
    external_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CreditTransactionRow> for CreditTransaction {
    type Error = DomainError;

    fn try_from(row: CreditTransactionRow) -> Result<Self, Self::Error> {
        Ok(CreditTransaction {
            id: TransactionId::from_uuid(row.id),
            user_id: parse_user_id(&row.user_id)?,
            transaction_type: parse_transaction_type(&row.transaction_type)?,
            amount: row.amount,
            balance_before: row.balance_before,
            balance_after: row.balance_after,
            feature_id: row.feature_id.as_deref().map(parse_feature_id).transpose()?,
            description: row.description,
            external_ref: row.external_ref,
            created_at: Timestamp::from_datetime(row.created_at),
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

fn parse_feature_id(s: &str) -> Result<FeatureId, DomainError> {
    FeatureId::new(s).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid feature id value: {}", e),
        )
    })
}

fn parse_transaction_type(s: &str) -> Result<CreditTransactionType, DomainError> {
    CreditTransactionType::parse_str(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid transaction type value: {}", s),
        )
    })
}

/// Inserts the zero-balance row if the user has none yet.
async fn ensure_account(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO user_credits (
            user_id, balance, total_granted, total_consumed, total_purchased,
            subscription_credits_per_month, created_at, updated_at
        ) VALUES ($1, 0, 0, 0, 0, 0, $2, $2)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id.as_str())
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to create credit account: {}", e),
        )
    })?;

    Ok(())
}

/// Appends one immutable log entry for a balance change.
async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    transaction: &CreditTransaction,
) -> Result<(), DomainError> {
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
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to insert credit transaction: {}", e),
        )
    })?;

    Ok(())
}

#[async_trait]
impl CreditsLedger for PostgresCreditsLedger {
    async fn get_or_create(&self, user_id: &UserId) -> Result<CreditAccount, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO user_credits (
                user_id, balance, total_granted, total_consumed, total_purchased,
                subscription_credits_per_month, created_at, updated_at
            ) VALUES ($1, 0, 0, 0, 0, 0, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to create credit account: {}", e),
            )
        })?;

        let row: CreditAccountRow = sqlx::query_as(
            r#"
            SELECT user_id, balance, total_granted, total_consumed, total_purchased,
                   subscription_credits_per_month, last_refresh_at, next_refresh_at,
                   created_at, updated_at
            FROM user_credits
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load credit account: {}", e),
            )
        })?;

        CreditAccount::try_from(row)
    }

    async fn consume(&self, request: ConsumeRequest) -> Result<ConsumeOutcome, DomainError> {
        if request.amount <= 0 {
            return Err(DomainError::new(
                ErrorCode::OutOfRange,
                format!("Credit amount must be positive, got {}", request.amount),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to start transaction: {}", e),
            )
        })?;

        ensure_account(&mut tx, &request.user_id, now).await?;

        // The WHERE clause is the whole concurrency story: the deduction
        // lands only if the balance still covers the amount.
        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE user_credits
            SET balance = balance - $2,
                total_consumed = total_consumed + $2,
                updated_at = $3
            WHERE user_id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(request.user_id.as_str())
        .bind(request.amount)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to consume credits: {}", e),
            )
        })?;

        let Some((balance,)) = updated else {
            // Deduction refused. Read the balance it was refused at, and
            // keep the lazily created row.
            let (balance,): (i64,) =
                sqlx::query_as("SELECT balance FROM user_credits WHERE user_id = $1")
                    .bind(request.user_id.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Failed to load credit account: {}", e),
                        )
                    })?;

            tx.commit().await.map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to commit transaction: {}", e),
                )
            })?;

            return Ok(ConsumeOutcome::InsufficientCredits { balance });
        };

        let mut transaction = CreditTransaction::record(
            request.user_id.clone(),
            CreditTransactionType::Consumption,
            request.amount,
            balance + request.amount,
            balance,
        );
        if let Some(feature_id) = request.feature_id {
            transaction = transaction.with_feature(feature_id);
        }
        if let Some(description) = request.description {
            transaction = transaction.with_description(description);
        }

        insert_transaction(&mut tx, &transaction).await?;

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit transaction: {}", e),
            )
        })?;

        Ok(ConsumeOutcome::Consumed {
            balance,
            transaction_id: transaction.id,
        })
    }

    async fn add_credits(&self, request: AddCreditsRequest) -> Result<CreditAccount, DomainError> {
        if request.amount <= 0 {
            return Err(DomainError::new(
                ErrorCode::OutOfRange,
                format!("Credit amount must be positive, got {}", request.amount),
            ));
        }
        if request.credit_type.is_debit() {
            return Err(DomainError::validation(
                "credit_type",
                "consumption cannot be applied as a credit",
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to start transaction: {}", e),
            )
        })?;

        ensure_account(&mut tx, &request.user_id, now).await?;

        let row: CreditAccountRow = match request.credit_type {
            CreditTransactionType::SubscriptionGrant => {
                let next_refresh = Timestamp::from_datetime(now).add_months(1);
                sqlx::query_as(
                    r#"
                    UPDATE user_credits
                    SET balance = balance + $2,
                        total_granted = total_granted + $2,
                        subscription_credits_per_month = $2,
                        last_refresh_at = $3,
                        next_refresh_at = $4,
                        updated_at = $3
                    WHERE user_id = $1
                    RETURNING user_id, balance, total_granted, total_consumed,
                              total_purchased, subscription_credits_per_month,
                              last_refresh_at, next_refresh_at, created_at, updated_at
                    "#,
                )
                .bind(request.user_id.as_str())
                .bind(request.amount)
                .bind(now)
                .bind(next_refresh.as_datetime())
                .fetch_one(&mut *tx)
                .await
            }
            CreditTransactionType::Purchase => {
                sqlx::query_as(
                    r#"
                    UPDATE user_credits
                    SET balance = balance + $2,
                        total_purchased = total_purchased + $2,
                        updated_at = $3
                    WHERE user_id = $1
                    RETURNING user_id, balance, total_granted, total_consumed,
                              total_purchased, subscription_credits_per_month,
                              last_refresh_at, next_refresh_at, created_at, updated_at
                    "#,
                )
                .bind(request.user_id.as_str())
                .bind(request.amount)
                .bind(now)
                .fetch_one(&mut *tx)
                .await
            }
            CreditTransactionType::Refund | CreditTransactionType::Adjustment => {
                sqlx::query_as(
                    r#"
                    UPDATE user_credits
                    SET balance = balance + $2,
                        updated_at = $3
                    WHERE user_id = $1
                    RETURNING user_id, balance, total_granted, total_consumed,
                              total_purchased, subscription_credits_per_month,
                              last_refresh_at, next_refresh_at, created_at, updated_at
                    "#,
                )
                .bind(request.user_id.as_str())
                .bind(request.amount)
                .bind(now)
                .fetch_one(&mut *tx)
                .await
            }
            CreditTransactionType::Consumption => unreachable!("rejected above"),
        }
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to add credits: {}", e),
            )
        })?;

        let account = CreditAccount::try_from(row)?;

        let mut transaction = CreditTransaction::record(
            request.user_id.clone(),
            request.credit_type,
            request.amount,
            account.balance - request.amount,
            account.balance,
        );
        if let Some(description) = request.description {
            transaction = transaction.with_description(description);
        }
        if let Some(external_ref) = request.external_ref {
            transaction = transaction.with_external_ref(external_ref);
        }

        insert_transaction(&mut tx, &transaction).await?;

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit transaction: {}", e),
            )
        })?;

        Ok(account)
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CreditTransaction>, DomainError> {
        let rows: Vec<CreditTransactionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, transaction_type, amount, balance_before, balance_after,
                   feature_id, description, external_ref, created_at
            FROM credit_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list credit transactions: {}", e),
            )
        })?;

        rows.into_iter().map(CreditTransaction::try_from).collect()
    }

    async fn find_due_for_refresh(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<CreditAccount>, DomainError> {
        let rows: Vec<CreditAccountRow> = sqlx::query_as(
            r#"
            SELECT user_id, balance, total_granted, total_consumed, total_purchased,
                   subscription_credits_per_month, last_refresh_at, next_refresh_at,
                   created_at, updated_at
            FROM user_credits
            WHERE subscription_credits_per_month > 0
              AND next_refresh_at IS NOT NULL
              AND next_refresh_at <= $1
            ORDER BY next_refresh_at ASC
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
                format!("Failed to find accounts due for refresh: {}", e),
            )
        })?;

        rows.into_iter().map(CreditAccount::try_from).collect()
    }
}
