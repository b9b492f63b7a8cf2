//! Credit transaction log entries.
//!
//! Every balance-changing ledger operation appends exactly one transaction.
//! Entries are immutable once written; the log is the audit trail the
//! balance can be reconciled against.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{FeatureId, Timestamp, TransactionId, UserId};

/// The kind of balance change a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionType {
    /// Monthly allowance from an active subscription.
    SubscriptionGrant,
    /// One-time credit-pack purchase.
    Purchase,
    /// Credits spent on a gated feature.
    Consumption,
    /// Credits returned after a failed gated operation.
    Refund,
    /// Manual correction applied by an operator.
    Adjustment,
}

impl CreditTransactionType {
    /// Stable string form used in storage and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionType::SubscriptionGrant => "subscription_grant",
            CreditTransactionType::Purchase => "purchase",
            CreditTransactionType::Consumption => "consumption",
            CreditTransactionType::Refund => "refund",
            CreditTransactionType::Adjustment => "adjustment",
        }
    }

    /// Parses the storage string form.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "subscription_grant" => Some(CreditTransactionType::SubscriptionGrant),
            "purchase" => Some(CreditTransactionType::Purchase),
            "consumption" => Some(CreditTransactionType::Consumption),
            "refund" => Some(CreditTransactionType::Refund),
            "adjustment" => Some(CreditTransactionType::Adjustment),
            _ => None,
        }
    }

    /// Returns true if this type increases the balance.
    pub fn is_credit(&self) -> bool {
        !matches!(self, CreditTransactionType::Consumption)
    }

    /// Returns true if this type decreases the balance.
    pub fn is_debit(&self) -> bool {
        matches!(self, CreditTransactionType::Consumption)
    }
}

impl std::fmt::Display for CreditTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable entry in a user's credit ledger.
///
/// `amount` is always the positive magnitude of the change; the direction
/// comes from `transaction_type`. `balance_before`/`balance_after` snapshot
/// the balance around the change for audit purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    /// The gated feature that consumed credits, when applicable.
    pub feature_id: Option<FeatureId>,
    /// Human-readable context (grant source, refund reason).
    pub description: Option<String>,
    /// Provider-side reference (event or charge id) for purchases and grants.
    pub external_ref: Option<String>,
    pub created_at: Timestamp,
}

impl CreditTransaction {
    /// Records a new transaction with a fresh id, stamped now.
    pub fn record(
        user_id: UserId,
        transaction_type: CreditTransactionType,
        amount: i64,
        balance_before: i64,
        balance_after: i64,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            transaction_type,
            amount,
            balance_before,
            balance_after,
            feature_id: None,
            description: None,
            external_ref: None,
            created_at: Timestamp::now(),
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

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }
}
