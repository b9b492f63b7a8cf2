//! Billing domain module.
//!
//! Handles subscription lifecycle, tier derivation, and normalized
//! payment-provider webhook events.
//!
//! # Module Structure
//!
//! - `subscription` - Subscription aggregate entity
//! - `status` - SubscriptionStatus state machine
//! - `tier` - SubscriptionTier access levels
//! - `billing_cycle` - Monthly/annual billing cadence
//! - `event` - Normalized webhook event envelope
//! - `webhook_errors` - Webhook failure taxonomy with HTTP mapping

mod billing_cycle;
mod event;
mod status;
mod subscription;
mod tier;
mod webhook_errors;

pub use billing_cycle::BillingCycle;
pub use event::{BillingEvent, BillingEventType};
pub use status::SubscriptionStatus;
pub use subscription::Subscription;
pub use tier::SubscriptionTier;
pub use webhook_errors::WebhookError;

#[cfg(test)]
pub use event::BillingEventBuilder;
