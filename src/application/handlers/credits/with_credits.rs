//! WithCreditsHandler - Command handler wrapping a gated operation.
//!
//! Consumes the feature's credit cost up front, runs the operation, and
//! refunds on failure. Consuming first keeps the ledger the arbiter
//! under concurrency: two racing calls cannot both pass a balance check
//! and then both spend.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::domain::credits::{CreditsError, CreditTransactionType, FeatureCatalog};
use crate::domain::foundation::{FeatureId, UserId};
use crate::ports::{
    AddCreditsRequest, ConsumeOutcome, ConsumeRequest, CreditsLedger, UsageAnalytics, UsageEvent,
};

/// Command to run an operation under a feature's credit cost.
#[derive(Debug, Clone)]
pub struct WithCreditsCommand {
    pub user_id: UserId,
    pub feature_id: FeatureId,
    /// Recorded on the consumption transaction.
    pub description: Option<String>,
}

/// The operation's value annotated with what it cost.
#[derive(Debug, Clone)]
pub struct WithCreditsResult<T> {
    pub value: T,
    pub credits_consumed: i64,
    pub credits_remaining: i64,
}

/// Failure of a credit-gated operation.
///
/// The two sides are kept apart so callers can tell "you could not
/// afford this" from "the thing you paid for broke". An operation
/// failure always reaches the caller unchanged, even when the refund
/// that follows it fails too.
#[derive(Debug)]
pub enum WithCreditsError<E> {
    /// The gate refused the call; the operation never ran.
    Credits(CreditsError),
    /// The operation itself failed; consumed credits were refunded.
    Operation(E),
}

impl<E: fmt::Display> fmt::Display for WithCreditsError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithCreditsError::Credits(e) => write!(f, "{}", e),
            WithCreditsError::Operation(e) => write!(f, "{}", e),
        }
    }
}

/// Handler running operations under the credit gate.
pub struct WithCreditsHandler {
    catalog: FeatureCatalog,
    ledger: Arc<dyn CreditsLedger>,
    analytics: Arc<dyn UsageAnalytics>,
}

impl WithCreditsHandler {
    pub fn new(
        catalog: FeatureCatalog,
        ledger: Arc<dyn CreditsLedger>,
        analytics: Arc<dyn UsageAnalytics>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            analytics,
        }
    }

    pub async fn handle<T, E, F, Fut>(
        &self,
        cmd: WithCreditsCommand,
        operation: F,
    ) -> Result<WithCreditsResult<T>, WithCreditsError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let feature = self
            .catalog
            .get(&cmd.feature_id)
            .ok_or_else(|| {
                WithCreditsError::Credits(CreditsError::feature_not_found(cmd.feature_id.clone()))
            })?;
        let required = feature.credits_required;

        let balance = if required > 0 {
            self.consume(&cmd, required).await?
        } else {
            self.ledger
                .get_or_create(&cmd.user_id)
                .await
                .map_err(|e| WithCreditsError::Credits(e.into()))?
                .balance
        };

        match operation().await {
            Ok(value) => Ok(WithCreditsResult {
                value,
                credits_consumed: required,
                credits_remaining: balance,
            }),
            Err(error) => {
                if required > 0 {
                    self.refund(&cmd, required, &error).await;
                }
                Err(WithCreditsError::Operation(error))
            }
        }
    }

    /// Deducts the cost, returning the post-deduction balance.
    async fn consume<E>(
        &self,
        cmd: &WithCreditsCommand,
        required: i64,
    ) -> Result<i64, WithCreditsError<E>> {
        let mut request =
            ConsumeRequest::new(cmd.user_id.clone(), required).with_feature(cmd.feature_id.clone());
        if let Some(description) = &cmd.description {
            request = request.with_description(description.clone());
        }

        let outcome = self
            .ledger
            .consume(request)
            .await
            .map_err(|e| WithCreditsError::Credits(e.into()))?;

        match outcome {
            ConsumeOutcome::Consumed { balance, .. } => {
                self.analytics
                    .record(UsageEvent::CreditsConsumed {
                        user_id: cmd.user_id.clone(),
                        feature_id: Some(cmd.feature_id.clone()),
                        amount: required,
                        balance_after: balance,
                    })
                    .await;
                Ok(balance)
            }
            ConsumeOutcome::InsufficientCredits { balance } => {
                self.analytics
                    .record(UsageEvent::AccessDenied {
                        user_id: cmd.user_id.clone(),
                        feature_id: cmd.feature_id.clone(),
                        reason: "insufficient_credits".to_string(),
                    })
                    .await;
                Err(WithCreditsError::Credits(
                    CreditsError::insufficient_credits(required, balance),
                ))
            }
        }
    }

    /// Returns the consumed amount after a failed operation.
    ///
    /// A refund that itself fails is logged with enough context for
    /// manual reconciliation and otherwise swallowed; the caller must
    /// see the original operation failure, not the refund's.
    async fn refund<E: fmt::Display>(&self, cmd: &WithCreditsCommand, amount: i64, cause: &E) {
        let request =
            AddCreditsRequest::new(cmd.user_id.clone(), amount, CreditTransactionType::Refund)
                .with_description(format!("Refund for failed {}: {}", cmd.feature_id, cause));

        match self.ledger.add_credits(request).await {
            Ok(_) => {
                self.analytics
                    .record(UsageEvent::CreditsRefunded {
                        user_id: cmd.user_id.clone(),
                        amount,
                        reason: cause.to_string(),
                    })
                    .await;
            }
            Err(refund_error) => {
                tracing::warn!(
                    user_id = %cmd.user_id,
                    feature_id = %cmd.feature_id,
                    amount,
                    operation_error = %cause,
                    refund_error = %refund_error,
                    "credit refund failed; manual reconciliation required"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCreditsLedger;
    use crate::domain::credits::{CreditAccount, CreditTransaction, FeatureSpec};
    use crate::domain::foundation::{DomainError, Timestamp};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    struct RecordingAnalytics {
        events: Mutex<Vec<UsageEvent>>,
    }

    impl RecordingAnalytics {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn recorded(&self) -> Vec<UsageEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UsageAnalytics for RecordingAnalytics {
        async fn record(&self, event: UsageEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Ledger whose refunds always fail, for the reconciliation path.
    struct FailingRefundLedger {
        inner: InMemoryCreditsLedger,
    }

    #[async_trait]
    impl CreditsLedger for FailingRefundLedger {
        async fn get_or_create(&self, user_id: &UserId) -> Result<CreditAccount, DomainError> {
            self.inner.get_or_create(user_id).await
        }

        async fn consume(&self, request: ConsumeRequest) -> Result<ConsumeOutcome, DomainError> {
            self.inner.consume(request).await
        }

        async fn add_credits(
            &self,
            _request: AddCreditsRequest,
        ) -> Result<CreditAccount, DomainError> {
            Err(DomainError::storage("Simulated refund failure"))
        }

        async fn list_transactions(
            &self,
            user_id: &UserId,
            limit: u32,
        ) -> Result<Vec<CreditTransaction>, DomainError> {
            self.inner.list_transactions(user_id, limit).await
        }

        async fn find_due_for_refresh(
            &self,
            now: Timestamp,
            limit: u32,
        ) -> Result<Vec<CreditAccount>, DomainError> {
            self.inner.find_due_for_refresh(now, limit).await
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_user_id() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    fn test_catalog() -> FeatureCatalog {
        let mut features = HashMap::new();
        features.insert(
            "metered_feature".to_string(),
            FeatureSpec {
                required_tier: None,
                credits_required: 2,
                description: None,
            },
        );
        features.insert(
            "open_feature".to_string(),
            FeatureSpec {
                required_tier: None,
                credits_required: 0,
                description: None,
            },
        );
        FeatureCatalog { features }
    }

    fn command(feature_id: &str) -> WithCreditsCommand {
        WithCreditsCommand {
            user_id: test_user_id(),
            feature_id: FeatureId::new(feature_id).unwrap(),
            description: Some("chat message".to_string()),
        }
    }

    async fn seeded_ledger(balance: i64) -> InMemoryCreditsLedger {
        let ledger = InMemoryCreditsLedger::new();
        if balance > 0 {
            ledger
                .add_credits(AddCreditsRequest::new(
                    test_user_id(),
                    balance,
                    CreditTransactionType::Purchase,
                ))
                .await
                .unwrap();
        }
        ledger
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn successful_operation_annotates_cost_and_balance() {
        let ledger = Arc::new(seeded_ledger(5).await);
        let analytics = Arc::new(RecordingAnalytics::new());
        let handler = WithCreditsHandler::new(test_catalog(), ledger.clone(), analytics.clone());

        let result = handler
            .handle(command("metered_feature"), || async {
                Ok::<_, String>("generated text")
            })
            .await
            .unwrap();

        assert_eq!(result.value, "generated text");
        assert_eq!(result.credits_consumed, 2);
        assert_eq!(result.credits_remaining, 3);

        let recorded = analytics.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind(), "credits_consumed");
    }

    #[tokio::test]
    async fn zero_cost_feature_runs_without_ledger_writes() {
        let ledger = Arc::new(seeded_ledger(0).await);
        let analytics = Arc::new(RecordingAnalytics::new());
        let handler = WithCreditsHandler::new(test_catalog(), ledger.clone(), analytics);

        let result = handler
            .handle(command("open_feature"), || async { Ok::<_, String>(42) })
            .await
            .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.credits_consumed, 0);
        assert_eq!(result.credits_remaining, 0);
        assert_eq!(ledger.transaction_count(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Gate Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn insufficient_credits_blocks_the_operation() {
        let ledger = Arc::new(seeded_ledger(1).await);
        let analytics = Arc::new(RecordingAnalytics::new());
        let handler = WithCreditsHandler::new(test_catalog(), ledger.clone(), analytics);

        let ran = Arc::new(AtomicBool::new(false));
        let ran_flag = ran.clone();

        let result = handler
            .handle(command("metered_feature"), move || async move {
                ran_flag.store(true, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(WithCreditsError::Credits(CreditsError::InsufficientCredits {
                required: 2,
                available: 1,
            }))
        ));
        assert!(!ran.load(Ordering::SeqCst));

        let account = ledger.get_or_create(&test_user_id()).await.unwrap();
        assert_eq!(account.balance, 1);
    }

    #[tokio::test]
    async fn unknown_feature_is_rejected_before_consuming() {
        let ledger = Arc::new(seeded_ledger(5).await);
        let analytics = Arc::new(RecordingAnalytics::new());
        let handler = WithCreditsHandler::new(test_catalog(), ledger.clone(), analytics);

        let result = handler
            .handle(command("no_such_feature"), || async {
                Ok::<_, String>(())
            })
            .await;

        assert!(matches!(
            result,
            Err(WithCreditsError::Credits(CreditsError::FeatureNotFound(_)))
        ));
        assert_eq!(ledger.get_or_create(&test_user_id()).await.unwrap().balance, 5);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Refund Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failed_operation_refunds_and_propagates_original_error() {
        let ledger = Arc::new(seeded_ledger(5).await);
        let analytics = Arc::new(RecordingAnalytics::new());
        let handler = WithCreditsHandler::new(test_catalog(), ledger.clone(), analytics.clone());

        let result = handler
            .handle(command("metered_feature"), || async {
                Err::<(), String>("model exploded".to_string())
            })
            .await;

        match result {
            Err(WithCreditsError::Operation(message)) => {
                assert_eq!(message, "model exploded");
            }
            other => panic!("expected operation error, got {:?}", other),
        }

        // Balance restored, with both legs in the log.
        let account = ledger.get_or_create(&test_user_id()).await.unwrap();
        assert_eq!(account.balance, 5);

        let transactions = ledger.transactions_for(&test_user_id());
        assert_eq!(transactions.len(), 3);
        assert_eq!(
            transactions[2].transaction_type,
            CreditTransactionType::Refund
        );
        assert!(transactions[2]
            .description
            .as_deref()
            .unwrap()
            .contains("model exploded"));

        let kinds: Vec<_> = analytics.recorded().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["credits_consumed", "credits_refunded"]);
    }

    #[tokio::test]
    async fn refund_failure_still_propagates_original_error() {
        let inner = seeded_ledger(5).await;
        let ledger = Arc::new(FailingRefundLedger { inner });
        let analytics = Arc::new(RecordingAnalytics::new());
        let handler = WithCreditsHandler::new(test_catalog(), ledger.clone(), analytics);

        let result = handler
            .handle(command("metered_feature"), || async {
                Err::<(), String>("model exploded".to_string())
            })
            .await;

        match result {
            Err(WithCreditsError::Operation(message)) => {
                assert_eq!(message, "model exploded");
            }
            other => panic!("expected operation error, got {:?}", other),
        }

        // The refund never landed; the gap is the reconciliation log's
        // problem, not the caller's.
        let account = ledger.get_or_create(&test_user_id()).await.unwrap();
        assert_eq!(account.balance, 3);
    }

    #[tokio::test]
    async fn gate_denial_records_analytics() {
        let ledger = Arc::new(seeded_ledger(0).await);
        let analytics = Arc::new(RecordingAnalytics::new());
        let handler = WithCreditsHandler::new(test_catalog(), ledger, analytics.clone());

        let _ = handler
            .handle(command("metered_feature"), || async {
                Ok::<_, String>(())
            })
            .await;

        let recorded = analytics.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind(), "access_denied");
    }
}
