//! Credits domain module.
//!
//! Handles the per-user credit ledger, the transaction log, and
//! feature gating by tier and credit price.
//!
//! # Module Structure
//!
//! - `account` - CreditAccount aggregate with counter rules
//! - `transaction` - Immutable transaction log entries
//! - `feature` - Feature catalog and access decisions
//! - `errors` - Credits error taxonomy

mod account;
mod errors;
mod feature;
mod transaction;

pub use account::CreditAccount;
pub use errors::CreditsError;
pub use feature::{AccessDecision, DenialReason, FeatureCatalog, FeatureSpec};
pub use transaction::{CreditTransaction, CreditTransactionType};
