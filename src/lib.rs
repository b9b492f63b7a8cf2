//! Tallygate - Credits, subscriptions, and payment webhook processing
//!
//! This crate keeps a per-user credit ledger, mirrors subscription state
//! from a payment provider's webhooks exactly once, and gates feature
//! access on subscription tier and credit balance.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
