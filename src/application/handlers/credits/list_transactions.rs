//! ListTransactionsHandler - Query handler for recent credit transactions.

use std::sync::Arc;

use crate::domain::credits::{CreditsError, CreditTransaction};
use crate::domain::foundation::UserId;
use crate::ports::CreditsLedger;

/// Applied when the query carries no limit.
const DEFAULT_LIMIT: u32 = 50;
/// Hard ceiling regardless of what the caller asks for.
const MAX_LIMIT: u32 = 200;

/// Query for a user's recent credit transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsQuery {
    pub user_id: UserId,
    /// Maximum number of entries to return; clamped to [`MAX_LIMIT`].
    pub limit: Option<u32>,
}

/// Result carrying transactions, newest first.
#[derive(Debug, Clone)]
pub struct ListTransactionsResult {
    pub transactions: Vec<CreditTransaction>,
}

/// Handler for listing a user's credit transaction history.
pub struct ListTransactionsHandler {
    ledger: Arc<dyn CreditsLedger>,
}

impl ListTransactionsHandler {
    pub fn new(ledger: Arc<dyn CreditsLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        query: ListTransactionsQuery,
    ) -> Result<ListTransactionsResult, CreditsError> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

        let transactions = self.ledger.list_transactions(&query.user_id, limit).await?;

        Ok(ListTransactionsResult { transactions })
    }
}
