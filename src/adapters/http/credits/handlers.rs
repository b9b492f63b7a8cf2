//! HTTP handlers for credits endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::CallerIdentity;
use crate::application::handlers::credits::{
    CheckAccessHandler, CheckAccessQuery, GetBalanceHandler, GetBalanceQuery,
    ListTransactionsHandler, ListTransactionsQuery,
};
use crate::domain::foundation::FeatureId;

use super::dto::{
    AccessResponse, BalanceResponse, TransactionListParams, TransactionListResponse,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct CreditsHandlers {
    balance_handler: Arc<GetBalanceHandler>,
    transactions_handler: Arc<ListTransactionsHandler>,
    access_handler: Arc<CheckAccessHandler>,
}

impl CreditsHandlers {
    pub fn new(
        balance_handler: Arc<GetBalanceHandler>,
        transactions_handler: Arc<ListTransactionsHandler>,
        access_handler: Arc<CheckAccessHandler>,
    ) -> Self {
        Self {
            balance_handler,
            transactions_handler,
            access_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/credits - Current balance for the caller
pub async fn get_balance(
    State(handlers): State<CreditsHandlers>,
    CallerIdentity(user_id): CallerIdentity,
) -> Response {
    let query = GetBalanceQuery { user_id };

    match handlers.balance_handler.handle(query).await {
        Ok(result) => {
            let response: BalanceResponse = result.account.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /api/credits/transactions - Recent ledger entries, newest first
pub async fn list_transactions(
    State(handlers): State<CreditsHandlers>,
    CallerIdentity(user_id): CallerIdentity,
    Query(params): Query<TransactionListParams>,
) -> Response {
    let query = ListTransactionsQuery {
        user_id,
        limit: params.limit,
    };

    match handlers.transactions_handler.handle(query).await {
        Ok(result) => {
            let response: TransactionListResponse = result.transactions.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET /api/credits/access/:feature_id - Check feature access for the caller
pub async fn check_feature_access(
    State(handlers): State<CreditsHandlers>,
    CallerIdentity(user_id): CallerIdentity,
    Path(feature_id): Path<String>,
) -> Response {
    let feature_id = match FeatureId::new(feature_id) {
        Ok(id) => id,
        Err(_) => {
            return ApiError::bad_request("Invalid feature id").into_response();
        }
    };

    let query = CheckAccessQuery {
        user_id,
        feature_id,
    };

    match handlers.access_handler.handle(query).await {
        Ok(result) => {
            let response: AccessResponse = result.into();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::analytics::InMemoryAnalytics;
    use crate::adapters::memory::{
        InMemoryCreditsLedger, InMemorySubscriptionStore, InMemoryTierCache,
    };
    use crate::domain::credits::{CreditTransactionType, FeatureCatalog};
    use crate::domain::foundation::UserId;
    use crate::ports::{AddCreditsRequest, CreditsLedger};

    fn test_handlers(ledger: Arc<InMemoryCreditsLedger>) -> CreditsHandlers {
        let tiers = Arc::new(InMemoryTierCache::new());
        let subscriptions = Arc::new(InMemorySubscriptionStore::new(ledger.clone(), tiers.clone()));
        let analytics = Arc::new(InMemoryAnalytics::new());

        CreditsHandlers::new(
            Arc::new(GetBalanceHandler::new(ledger.clone())),
            Arc::new(ListTransactionsHandler::new(ledger.clone())),
            Arc::new(CheckAccessHandler::new(
                FeatureCatalog::defaults(),
                ledger,
                subscriptions,
                tiers,
                analytics,
            )),
        )
    }

    fn caller() -> CallerIdentity {
        CallerIdentity(UserId::new("user-1").unwrap())
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_balance_returns_zero_account_for_new_user() {
        let ledger = Arc::new(InMemoryCreditsLedger::new());
        let handlers = test_handlers(ledger);

        let response = get_balance(State(handlers), caller()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["balance"], 0);
    }

    #[tokio::test]
    async fn list_transactions_honors_limit_param() {
        let ledger = Arc::new(InMemoryCreditsLedger::new());
        for _ in 0..3 {
            ledger
                .add_credits(AddCreditsRequest::new(
                    UserId::new("user-1").unwrap(),
                    10,
                    CreditTransactionType::Purchase,
                ))
                .await
                .unwrap();
        }
        let handlers = test_handlers(ledger);

        let params = TransactionListParams { limit: Some(2) };
        let response = list_transactions(State(handlers), caller(), Query(params)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["count"], 2);
    }

    #[tokio::test]
    async fn check_access_allows_credit_gated_feature_with_balance() {
        let ledger = Arc::new(InMemoryCreditsLedger::new());
        ledger
            .add_credits(AddCreditsRequest::new(
                UserId::new("user-1").unwrap(),
                5,
                CreditTransactionType::Purchase,
            ))
            .await
            .unwrap();
        let handlers = test_handlers(ledger);

        let response =
            check_feature_access(State(handlers), caller(), Path("ai_chat".to_string())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["allowed"], true);
    }

    #[tokio::test]
    async fn check_access_denial_is_still_a_200() {
        let ledger = Arc::new(InMemoryCreditsLedger::new());
        let handlers = test_handlers(ledger);

        let response =
            check_feature_access(State(handlers), caller(), Path("ai_chat".to_string())).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["allowed"], false);
        assert_eq!(json["reason"]["code"], "insufficient_credits");
    }

    #[tokio::test]
    async fn check_access_unknown_feature_returns_404() {
        let ledger = Arc::new(InMemoryCreditsLedger::new());
        let handlers = test_handlers(ledger);

        let response =
            check_feature_access(State(handlers), caller(), Path("no_such".to_string())).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], "FEATURE_NOT_FOUND");
    }
}
