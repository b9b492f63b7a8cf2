//! RefreshCreditGrantsHandler - Command handler for the monthly grant sweep.

use std::sync::Arc;

use crate::domain::credits::{CreditsError, CreditTransactionType};
use crate::domain::foundation::Timestamp;
use crate::ports::{AddCreditsRequest, CreditsLedger, UsageAnalytics, UsageEvent};

/// Command to refresh all due monthly credit grants.
#[derive(Debug, Clone)]
pub struct RefreshCreditGrantsCommand {
    /// The instant grants are due against; normally `Timestamp::now()`.
    pub now: Timestamp,
    /// Maximum number of accounts to refresh in one pass.
    pub limit: u32,
}

/// Result of one refresh pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCreditGrantsResult {
    pub refreshed: usize,
    pub failed: usize,
}

/// Handler granting the monthly subscription allowance to accounts
/// whose `next_refresh_at` has come due.
///
/// Each grant goes through the ledger's `subscription_grant` path,
/// which advances the account's schedule by one calendar month, so a
/// refreshed account drops out of the due set on its own.
pub struct RefreshCreditGrantsHandler {
    ledger: Arc<dyn CreditsLedger>,
    analytics: Arc<dyn UsageAnalytics>,
}

impl RefreshCreditGrantsHandler {
    pub fn new(ledger: Arc<dyn CreditsLedger>, analytics: Arc<dyn UsageAnalytics>) -> Self {
        Self { ledger, analytics }
    }

    pub async fn handle(
        &self,
        cmd: RefreshCreditGrantsCommand,
    ) -> Result<RefreshCreditGrantsResult, CreditsError> {
        let due = self.ledger.find_due_for_refresh(cmd.now, cmd.limit).await?;

        let mut refreshed = 0;
        let mut failed = 0;

        for account in due {
            let amount = account.subscription_credits_per_month;
            let request = AddCreditsRequest::new(
                account.user_id.clone(),
                amount,
                CreditTransactionType::SubscriptionGrant,
            )
            .with_description("Monthly subscription credit refresh");

            // One bad account must not starve the rest of the batch.
            match self.ledger.add_credits(request).await {
                Ok(updated) => {
                    self.analytics
                        .record(UsageEvent::CreditsGranted {
                            user_id: account.user_id.clone(),
                            credit_type: CreditTransactionType::SubscriptionGrant,
                            amount,
                        })
                        .await;
                    tracing::info!(
                        user_id = %account.user_id,
                        amount,
                        balance = updated.balance,
                        "monthly credit grant refreshed"
                    );
                    refreshed += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        user_id = %account.user_id,
                        amount,
                        error = %error,
                        "monthly credit refresh failed"
                    );
                    failed += 1;
                }
            }
        }

        Ok(RefreshCreditGrantsResult { refreshed, failed })
    }
}
