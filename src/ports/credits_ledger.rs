//! CreditsLedger port - durable per-user credit balance.
//!
//! Defines the contract for the credit ledger: lazy account creation,
//! atomic consumption, atomic grants, and the transaction log.
//!
//! # Design
//!
//! - **Store-arbitrated**: handlers may run in many processes at once, so
//!   every mutation must be a single atomic statement in the backing
//!   store. `consume` in particular must be a conditional update
//!   ("subtract where balance >= amount"), never a read followed by a
//!   write.
//! - **Append-only log**: every balance change appends exactly one
//!   `CreditTransaction`.
//! - **No negative balances**: a consumption that would overdraw fails
//!   without mutating anything.
//!
//! # Example
//!
//! ```ignore
//! let outcome = ledger
//!     .consume(ConsumeRequest::new(user_id, 5).with_feature(feature_id))
//!     .await?;
//!
//! match outcome {
//!     ConsumeOutcome::Consumed { balance, .. } => run_feature(balance).await,
//!     ConsumeOutcome::InsufficientCredits { balance } => deny(balance),
//! }
//! ```

use async_trait::async_trait;

use crate::domain::credits::{CreditAccount, CreditTransaction, CreditTransactionType};
use crate::domain::foundation::{DomainError, FeatureId, Timestamp, TransactionId, UserId};

/// Request to consume credits for a gated operation.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    pub user_id: UserId,
    /// Positive number of credits to deduct.
    pub amount: i64,
    /// The feature charging the credits, recorded on the transaction.
    pub feature_id: Option<FeatureId>,
    pub description: Option<String>,
}

impl ConsumeRequest {
    pub fn new(user_id: UserId, amount: i64) -> Self {
        Self {
            user_id,
            amount,
            feature_id: None,
            description: None,
        }
    }

    pub fn with_feature(mut self, feature_id: FeatureId) -> Self {
        self.feature_id = Some(feature_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Outcome of a consume attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Credits were deducted; `balance` is the post-deduction balance.
    Consumed {
        balance: i64,
        transaction_id: TransactionId,
    },
    /// Balance was too low; nothing changed. `balance` is the balance
    /// observed after the failed attempt, for reporting.
    InsufficientCredits { balance: i64 },
}

impl ConsumeOutcome {
    pub fn is_consumed(&self) -> bool {
        matches!(self, ConsumeOutcome::Consumed { .. })
    }

    /// The balance the caller should report, in either outcome.
    pub fn balance(&self) -> i64 {
        match self {
            ConsumeOutcome::Consumed { balance, .. } => *balance,
            ConsumeOutcome::InsufficientCredits { balance } => *balance,
        }
    }
}

/// Request to add credits to an account.
#[derive(Debug, Clone)]
pub struct AddCreditsRequest {
    pub user_id: UserId,
    /// Positive number of credits to add.
    pub amount: i64,
    /// Additive type; determines which lifetime counters move.
    pub credit_type: CreditTransactionType,
    pub description: Option<String>,
    /// Provider-side reference (event or charge id).
    pub external_ref: Option<String>,
}

impl AddCreditsRequest {
    pub fn new(user_id: UserId, amount: i64, credit_type: CreditTransactionType) -> Self {
        Self {
            user_id,
            amount,
            credit_type,
            description: None,
            external_ref: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }
}

/// Port for the per-user credit ledger.
///
/// Implementations must ensure:
/// - One row per user, created lazily, never deleted
/// - Atomic conditional deduction for `consume`
/// - One appended transaction per balance change
#[async_trait]
pub trait CreditsLedger: Send + Sync {
    /// Returns the user's account, creating a zero-balance one if absent.
    async fn get_or_create(&self, user_id: &UserId) -> Result<CreditAccount, DomainError>;

    /// Atomically deducts credits if the balance covers the amount.
    ///
    /// A failed deduction is reported in the outcome, not as an error;
    /// `Err` is reserved for storage failures.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if `amount` is not positive
    /// - `DatabaseError` on persistence failure
    async fn consume(&self, request: ConsumeRequest) -> Result<ConsumeOutcome, DomainError>;

    /// Atomically adds credits, applying the counter rules for the type:
    /// `subscription_grant` bumps `total_granted` and schedules the next
    /// monthly refresh; `purchase` bumps `total_purchased`; `refund` and
    /// `adjustment` touch only the balance.
    ///
    /// # Errors
    ///
    /// - `OutOfRange` if `amount` is not positive
    /// - `ValidationFailed` if `credit_type` is `consumption`
    /// - `DatabaseError` on persistence failure
    async fn add_credits(&self, request: AddCreditsRequest) -> Result<CreditAccount, DomainError>;

    /// Returns the user's most recent transactions, newest first.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CreditTransaction>, DomainError>;

    /// Finds accounts whose monthly subscription grant is due
    /// (`subscription_credits_per_month > 0` and `next_refresh_at <= now`).
    async fn find_due_for_refresh(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<CreditAccount>, DomainError>;
}
