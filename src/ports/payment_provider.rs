//! Payment provider port for webhook verification and normalization.
//!
//! Defines the contract for payment gateway integrations (e.g., Stripe).
//! This subsystem never initiates provider calls; its only provider
//! surface is inbound webhooks, so the port covers exactly that:
//! verifying a delivery's signature and normalizing the provider-specific
//! payload into a `BillingEvent`.
//!
//! # Design
//!
//! - **Gateway agnostic**: the normalized event shape works with any
//!   provider; only the adapter knows the wire format.
//! - **Signature outcome is data**: a bad signature is `Ok(None)`, not an
//!   error - the HTTP layer turns it into 401. `Err` is reserved for
//!   payloads that verified but could not be normalized.

use async_trait::async_trait;

use crate::domain::billing::{BillingEvent, WebhookError};

/// Port for verifying and normalizing payment webhooks.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Verifies the webhook signature and parses the payload into a
    /// normalized event.
    ///
    /// Returns `Ok(None)` when the signature does not verify, and
    /// `Ok(Some(event))` for an authentic delivery.
    ///
    /// # Errors
    ///
    /// - `ParseError` if the verified payload cannot be normalized
    /// - `MissingMetadata` if a required field is absent
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<Option<BillingEvent>, WebhookError>;
}
