//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe webhook deliveries:
//! signature verification and normalization into `BillingEvent`.
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! Required environment variables:
//! - `TALLYGATE__BILLING__WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod stripe_adapter;
mod webhook_types;

pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
pub use webhook_types::{
    SignatureHeader, SignatureParseError, StripeCheckoutSession, StripePlan, StripeSubscription,
    StripeWebhookEvent,
};
