//! In-memory credits ledger for testing and local runs.
//!
//! Provides deterministic, single-process ledger semantics backed by a
//! mutex. The whole of every operation runs under one lock acquisition,
//! so the atomicity contract of the port (conditional deduction, one
//! appended transaction per change) holds under concurrent tasks.
//!
//! # Security Note
//!
//! This adapter is for **testing and local development** and should not
//! back a multi-process deployment. It uses `.expect()` on lock
//! operations which will panic if the lock is poisoned. Production code
//! should use the PostgreSQL ledger adapter.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::credits::{
    CreditAccount, CreditTransaction, CreditTransactionType, CreditsError,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{AddCreditsRequest, ConsumeOutcome, ConsumeRequest, CreditsLedger};

struct LedgerState {
    accounts: HashMap<String, CreditAccount>,
    transactions: Vec<CreditTransaction>,
}

/// In-memory `CreditsLedger` implementation.
///
/// # Panics
///
/// Methods may panic if the internal lock is poisoned. This is
/// acceptable for test code but this adapter should NOT back production.
pub struct InMemoryCreditsLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryCreditsLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                accounts: HashMap::new(),
                transactions: Vec::new(),
            }),
        }
    }

    // === Test Helpers ===

    /// Returns all transactions for a user in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn transactions_for(&self, user_id: &UserId) -> Vec<CreditTransaction> {
        self.state
            .lock()
            .expect("InMemoryCreditsLedger: lock poisoned")
            .transactions
            .iter()
            .filter(|t| t.user_id == *user_id)
            .cloned()
            .collect()
    }

    /// Returns the total number of appended transactions.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn transaction_count(&self) -> usize {
        self.state
            .lock()
            .expect("InMemoryCreditsLedger: lock poisoned")
            .transactions
            .len()
    }
}

impl Default for InMemoryCreditsLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CreditsLedger for InMemoryCreditsLedger {
    async fn get_or_create(&self, user_id: &UserId) -> Result<CreditAccount, DomainError> {
        let mut state = self
            .state
            .lock()
            .expect("InMemoryCreditsLedger: lock poisoned");
        let account = state
            .accounts
            .entry(user_id.to_string())
            .or_insert_with(|| CreditAccount::new(user_id.clone()));
        Ok(account.clone())
    }

    async fn consume(&self, request: ConsumeRequest) -> Result<ConsumeOutcome, DomainError> {
        let now = Timestamp::now();
        let mut state = self
            .state
            .lock()
            .expect("InMemoryCreditsLedger: lock poisoned");

        let account = state
            .accounts
            .entry(request.user_id.to_string())
            .or_insert_with(|| CreditAccount::new(request.user_id.clone()));

        let balance_before = account.balance;
        match account.try_consume(request.amount, now) {
            Ok(()) => {
                let balance_after = account.balance;
                let mut tx = CreditTransaction::record(
                    request.user_id.clone(),
                    CreditTransactionType::Consumption,
                    request.amount,
                    balance_before,
                    balance_after,
                );
                if let Some(feature_id) = request.feature_id {
                    tx = tx.with_feature(feature_id);
                }
                if let Some(description) = request.description {
                    tx = tx.with_description(description);
                }
                let transaction_id = tx.id.clone();
                state.transactions.push(tx);

                Ok(ConsumeOutcome::Consumed {
                    balance: balance_after,
                    transaction_id,
                })
            }
            Err(CreditsError::InsufficientCredits { available, .. }) => {
                Ok(ConsumeOutcome::InsufficientCredits { balance: available })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn add_credits(&self, request: AddCreditsRequest) -> Result<CreditAccount, DomainError> {
        let now = Timestamp::now();
        let mut state = self
            .state
            .lock()
            .expect("InMemoryCreditsLedger: lock poisoned");

        let account = state
            .accounts
            .entry(request.user_id.to_string())
            .or_insert_with(|| CreditAccount::new(request.user_id.clone()));

        let balance_before = account.balance;
        account
            .apply_credit(request.amount, request.credit_type, now)
            .map_err(DomainError::from)?;
        let updated = account.clone();

        let mut tx = CreditTransaction::record(
            request.user_id.clone(),
            request.credit_type,
            request.amount,
            balance_before,
            updated.balance,
        );
        if let Some(description) = request.description {
            tx = tx.with_description(description);
        }
        if let Some(external_ref) = request.external_ref {
            tx = tx.with_external_ref(external_ref);
        }
        state.transactions.push(tx);

        Ok(updated)
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<CreditTransaction>, DomainError> {
        let state = self
            .state
            .lock()
            .expect("InMemoryCreditsLedger: lock poisoned");
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.user_id == *user_id)
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_due_for_refresh(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<CreditAccount>, DomainError> {
        let state = self
            .state
            .lock()
            .expect("InMemoryCreditsLedger: lock poisoned");
        Ok(state
            .accounts
            .values()
            .filter(|a| a.needs_refresh(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
