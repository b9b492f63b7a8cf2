//! HTTP DTOs for credits endpoints.
//!
//! These types decouple the HTTP API from domain types, allowing independent evolution.

use serde::{Deserialize, Serialize};

use crate::application::handlers::credits::CheckAccessResult;
use crate::domain::credits::{CreditAccount, CreditTransaction, CreditTransactionType, DenialReason};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Query parameters for listing transactions.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionListParams {
    pub limit: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Current credit balance for a user.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
    pub total_granted: i64,
    pub total_consumed: i64,
    pub total_purchased: i64,
    pub subscription_credits_per_month: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_refresh_at: Option<String>,
}

impl From<CreditAccount> for BalanceResponse {
    fn from(account: CreditAccount) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            balance: account.balance,
            total_granted: account.total_granted,
            total_consumed: account.total_consumed,
            total_purchased: account.total_purchased,
            subscription_credits_per_month: account.subscription_credits_per_month,
            last_refresh_at: account
                .last_refresh_at
                .map(|ts| ts.as_datetime().to_rfc3339()),
            next_refresh_at: account
                .next_refresh_at
                .map(|ts| ts.as_datetime().to_rfc3339()),
        }
    }
}

/// One ledger entry in a transaction listing.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub created_at: String,
}

impl From<CreditTransaction> for TransactionResponse {
    fn from(tx: CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            transaction_type: tx.transaction_type,
            amount: tx.amount,
            balance_before: tx.balance_before,
            balance_after: tx.balance_after,
            feature_id: tx.feature_id.map(|f| f.to_string()),
            description: tx.description,
            external_ref: tx.external_ref,
            created_at: tx.created_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Transaction history, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub count: usize,
}

impl From<Vec<CreditTransaction>> for TransactionListResponse {
    fn from(transactions: Vec<CreditTransaction>) -> Self {
        let transactions: Vec<TransactionResponse> =
            transactions.into_iter().map(Into::into).collect();
        let count = transactions.len();
        Self {
            transactions,
            count,
        }
    }
}

/// Why a feature access check was denied.
#[derive(Debug, Clone, Serialize)]
pub struct DenialResponse {
    pub code: String,
    pub message: String,
}

impl From<DenialReason> for DenialResponse {
    fn from(reason: DenialReason) -> Self {
        Self {
            code: reason.code().to_string(),
            message: reason.message(),
        }
    }
}

/// Outcome of a feature access check.
///
/// Always delivered with status 200; a denial is a valid answer to the
/// question, not a request failure.
#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialResponse>,
}

impl From<CheckAccessResult> for AccessResponse {
    fn from(result: CheckAccessResult) -> Self {
        Self {
            allowed: result.allowed,
            reason: result.reason.map(Into::into),
        }
    }
}
