//! Billing configuration
//!
//! Settings for the payment provider webhook pipeline: the signing
//! secret, which request headers may carry the signature, and the
//! credit grant sizes applied to billing events.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Billing configuration (payment provider webhooks, credit grants)
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Webhook signing secret
    pub webhook_secret: SecretString,

    /// Header names checked for the webhook signature, in priority
    /// order (comma-separated)
    pub signature_headers: Option<String>,

    /// Reject events that were not sent in live mode
    #[serde(default)]
    pub require_livemode: bool,

    /// Monthly credit allowance granted with a new subscription
    #[serde(default = "default_monthly_credits")]
    pub monthly_credits: i64,

    /// Pack size for purchase events that carry no explicit amount
    #[serde(default = "default_purchase_credits")]
    pub purchase_credits: i64,
}

impl BillingConfig {
    /// Get the signature header names as a vector, in priority order.
    ///
    /// Falls back to the provider defaults when unconfigured.
    pub fn signature_header_list(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .signature_headers
            .as_ref()
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if configured.is_empty() {
            default_signature_headers()
        } else {
            configured
        }
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secret = self.webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_WEBHOOK_SECRET"));
        }
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }
        if self.signature_header_list().is_empty() {
            return Err(ValidationError::NoSignatureHeaders);
        }
        if self.monthly_credits <= 0 || self.purchase_credits <= 0 {
            return Err(ValidationError::InvalidGrantAmount);
        }
        Ok(())
    }
}

fn default_signature_headers() -> Vec<String> {
    vec![
        "Stripe-Signature".to_string(),
        "X-Provider-Signature".to_string(),
        "X-Webhook-Signature".to_string(),
    ]
}

fn default_monthly_credits() -> i64 {
    100
}

fn default_purchase_credits() -> i64 {
    50
}
