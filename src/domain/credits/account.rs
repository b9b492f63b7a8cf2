//! CreditAccount aggregate - per-user consumable credit balance.
//!
//! # Design Decisions
//!
//! - **Lazy creation**: accounts materialize with a zero balance on first
//!   access; there is no explicit "open account" operation and rows are
//!   never deleted.
//! - **Counters only grow**: `total_granted`, `total_consumed`, and
//!   `total_purchased` are monotonic; the live `balance` is the only field
//!   that moves both ways.
//! - **The store is the arbiter**: these methods define the arithmetic and
//!   counter rules for a single account value. Stores that serve concurrent
//!   requests must apply them under their own atomic primitive (conditional
//!   SQL update, or a lock) rather than read-modify-write through this type
//!   from multiple tasks.

use serde::{Deserialize, Serialize};

use crate::domain::credits::{CreditTransactionType, CreditsError};
use crate::domain::foundation::{Timestamp, UserId};

/// A user's credit balance with lifetime counters and refresh schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub user_id: UserId,
    /// Current spendable balance. Never negative.
    pub balance: i64,
    /// Lifetime credits granted from subscriptions.
    pub total_granted: i64,
    /// Lifetime credits consumed by gated features.
    pub total_consumed: i64,
    /// Lifetime credits bought as one-time packs.
    pub total_purchased: i64,
    /// Monthly allowance from the current subscription; 0 when none.
    pub subscription_credits_per_month: i64,
    /// When the last subscription grant was applied.
    pub last_refresh_at: Option<Timestamp>,
    /// When the next subscription grant is due.
    pub next_refresh_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CreditAccount {
    /// Creates a zero-balance account for a user.
    pub fn new(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            user_id,
            balance: 0,
            total_granted: 0,
            total_consumed: 0,
            total_purchased: 0,
            subscription_credits_per_month: 0,
            last_refresh_at: None,
            next_refresh_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deducts `amount` from the balance.
    ///
    /// Fails with `InsufficientCredits` when the balance is too low, in
    /// which case nothing changes.
    pub fn try_consume(&mut self, amount: i64, now: Timestamp) -> Result<(), CreditsError> {
        if amount <= 0 {
            return Err(CreditsError::invalid_amount(amount));
        }
        if self.balance < amount {
            return Err(CreditsError::insufficient_credits(amount, self.balance));
        }

        self.balance -= amount;
        self.total_consumed += amount;
        self.updated_at = now;
        Ok(())
    }

    /// Adds `amount` to the balance, applying the counter rules for the
    /// credit type.
    ///
    /// - `subscription_grant` bumps `total_granted`, records the grant size
    ///   as the monthly allowance, and schedules the next refresh one
    ///   calendar month out.
    /// - `purchase` bumps `total_purchased`.
    /// - `refund` and `adjustment` touch only the balance.
    ///
    /// `consumption` is not an additive type and is rejected.
    pub fn apply_credit(
        &mut self,
        amount: i64,
        credit_type: CreditTransactionType,
        now: Timestamp,
    ) -> Result<(), CreditsError> {
        if amount <= 0 {
            return Err(CreditsError::invalid_amount(amount));
        }
        if credit_type.is_debit() {
            return Err(CreditsError::validation(
                "transaction_type",
                "consumption cannot be applied as a credit",
            ));
        }

        self.balance += amount;
        match credit_type {
            CreditTransactionType::SubscriptionGrant => {
                self.total_granted += amount;
                self.subscription_credits_per_month = amount;
                self.last_refresh_at = Some(now);
                self.next_refresh_at = Some(now.add_months(1));
            }
            CreditTransactionType::Purchase => {
                self.total_purchased += amount;
            }
            CreditTransactionType::Refund | CreditTransactionType::Adjustment => {}
            CreditTransactionType::Consumption => unreachable!("rejected above"),
        }
        self.updated_at = now;
        Ok(())
    }

    /// Returns true when a monthly subscription grant is due.
    pub fn needs_refresh(&self, now: Timestamp) -> bool {
        if self.subscription_credits_per_month <= 0 {
            return false;
        }
        match self.next_refresh_at {
            Some(due) => !due.is_after(&now),
            None => false,
        }
    }
}
