//! GetBalanceHandler - Query handler for a user's credit balance.

use std::sync::Arc;

use crate::domain::credits::{CreditAccount, CreditsError};
use crate::domain::foundation::UserId;
use crate::ports::CreditsLedger;

/// Query for a user's current credit state.
#[derive(Debug, Clone)]
pub struct GetBalanceQuery {
    pub user_id: UserId,
}

/// Result carrying the full credit account projection.
#[derive(Debug, Clone)]
pub struct GetBalanceResult {
    pub account: CreditAccount,
}

/// Handler for reading a user's credit balance.
///
/// Accounts are created lazily, so this never reports "not found": a
/// user with no prior activity gets a fresh zero-balance account.
pub struct GetBalanceHandler {
    ledger: Arc<dyn CreditsLedger>,
}

impl GetBalanceHandler {
    pub fn new(ledger: Arc<dyn CreditsLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, query: GetBalanceQuery) -> Result<GetBalanceResult, CreditsError> {
        let account = self.ledger.get_or_create(&query.user_id).await?;

        Ok(GetBalanceResult { account })
    }
}
