//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `credits` - Credit ledger, transaction log, and feature gating
//! - `billing` - Subscription lifecycle and payment webhook events

pub mod billing;
pub mod credits;
pub mod foundation;
