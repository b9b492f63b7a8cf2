//! Credits handlers.
//!
//! Command and query handlers for the credit ledger and the feature
//! gate:
//!
//! ## Commands
//! - Running a gated operation with automatic consume and refund
//! - Refreshing due monthly credit grants
//!
//! ## Queries
//! - Get balance
//! - List recent transactions
//! - Check feature access

mod check_access;
mod get_balance;
mod list_transactions;
mod refresh_credit_grants;
mod with_credits;

// Commands
pub use refresh_credit_grants::{
    RefreshCreditGrantsCommand, RefreshCreditGrantsHandler, RefreshCreditGrantsResult,
};
pub use with_credits::{
    WithCreditsCommand, WithCreditsError, WithCreditsHandler, WithCreditsResult,
};

// Queries
pub use check_access::{CheckAccessHandler, CheckAccessQuery, CheckAccessResult};
pub use get_balance::{GetBalanceHandler, GetBalanceQuery, GetBalanceResult};
pub use list_transactions::{
    ListTransactionsHandler, ListTransactionsQuery, ListTransactionsResult,
};
