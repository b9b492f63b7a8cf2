//! HTTP routes for credits endpoints.

use axum::{routing::get, Router};

use super::handlers::{check_feature_access, get_balance, list_transactions, CreditsHandlers};

/// Creates the credits router with all endpoints.
///
/// # Routes
///
/// - `GET /api/credits` - Current balance
/// - `GET /api/credits/transactions` - Transaction history (`?limit=`)
/// - `GET /api/credits/access/:feature_id` - Feature access check
pub fn credits_routes(handlers: CreditsHandlers) -> Router {
    Router::new()
        .route("/api/credits", get(get_balance))
        .route("/api/credits/transactions", get(list_transactions))
        .route("/api/credits/access/:feature_id", get(check_feature_access))
        .with_state(handlers)
}
