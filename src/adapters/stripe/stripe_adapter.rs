//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port: verifies webhook signatures and
//! normalizes Stripe's wire events into provider-neutral `BillingEvent`s.
//!
//! # Security
//!
//! - HMAC-SHA256 signature verification with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(webhook_secret);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::billing::{BillingCycle, BillingEvent, SubscriptionStatus, WebhookError};
use crate::domain::foundation::Timestamp;
use crate::ports::PaymentProvider;

use super::webhook_types::{
    SignatureHeader, StripeCheckoutSession, StripeSubscription, StripeWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

/// Provider name stamped on every normalized event.
const PROVIDER_NAME: &str = "stripe";

/// Stripe webhook configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Whether to require livemode events in production.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(webhook_secret: SecretString) -> Self {
        Self {
            webhook_secret,
            require_livemode: false,
        }
    }

    /// Require livemode events (reject test mode deliveries).
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe implementation of the `PaymentProvider` port.
///
/// # Design Decisions
///
/// - Signature verification happens before anything else looks at the
///   payload. An unauthenticated delivery produces `Ok(None)` so the
///   HTTP layer can return 401 without leaking which check failed.
/// - Timestamp verdicts (`StaleTimestamp`, `InvalidTimestamp`) are only
///   issued for deliveries that already passed the HMAC check.
/// - Unknown event types still normalize. The processing pipeline marks
///   them processed and skips them, which keeps retry queues quiet.
#[derive(Clone)]
pub struct StripePaymentAdapter {
    config: StripeConfig,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self { config }
    }

    /// Compute the expected HMAC and compare it in constant time.
    fn signature_matches(&self, header: &SignatureHeader, payload: &[u8]) -> bool {
        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .expect("HMAC can take key of any size");
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        expected
            .as_slice()
            .ct_eq(header.v1_signature.as_slice())
            .into()
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<Option<BillingEvent>, WebhookError> {
        let header = match SignatureHeader::parse(signature) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!(error = %e, "Webhook signature header rejected");
                return Ok(None);
            }
        };

        if !self.signature_matches(&header, payload) {
            tracing::warn!("Webhook signature mismatch");
            return Ok(None);
        }

        // Timestamps are judged only on authenticated deliveries.
        let age_secs = Timestamp::now().as_unix_secs() - header.timestamp;
        if age_secs > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(age_secs, "Webhook timestamp too old, rejecting");
            return Err(WebhookError::StaleTimestamp { age_secs });
        }
        if age_secs < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(age_secs, "Webhook timestamp too far in the future");
            return Err(WebhookError::InvalidTimestamp);
        }

        let event: StripeWebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(format!("Invalid JSON: {}", e)))?;

        if self.config.require_livemode && !event.livemode {
            return Err(WebhookError::ParseError(
                "Test mode events not allowed in production".to_string(),
            ));
        }

        let billing_event = normalize_event(event)?;

        tracing::info!(
            event_id = %billing_event.event_id,
            event_type = %billing_event.event_type,
            "Webhook signature verified"
        );

        Ok(Some(billing_event))
    }
}

/// Normalize a verified Stripe event into the provider-neutral shape.
///
/// `subscription.*` events carry a subscription object; credit purchases
/// carry a checkout session. Anything else passes through with only the
/// envelope fields and whatever metadata the object carried.
fn normalize_event(event: StripeWebhookEvent) -> Result<BillingEvent, WebhookError> {
    let occurred_at = Timestamp::from_unix_secs(event.created);

    if event.event_type.starts_with("subscription.") {
        let sub: StripeSubscription = serde_json::from_value(event.data.object)
            .map_err(|e| WebhookError::ParseError(format!("Invalid subscription object: {}", e)))?;

        return Ok(BillingEvent {
            event_id: event.id,
            event_type: event.event_type,
            occurred_at,
            provider: PROVIDER_NAME.to_string(),
            provider_subscription_id: Some(sub.id),
            provider_customer_id: sub.customer,
            status: sub.status.as_deref().and_then(map_status),
            billing_cycle: sub
                .plan
                .and_then(|p| p.interval)
                .as_deref()
                .and_then(map_interval),
            current_period_start: sub.current_period_start.map(Timestamp::from_unix_secs),
            current_period_end: sub.current_period_end.map(Timestamp::from_unix_secs),
            cancel_at_period_end: sub.cancel_at_period_end,
            custom_data: metadata_value(&sub.metadata),
        });
    }

    if event.event_type == "credit.purchase_completed" {
        let session: StripeCheckoutSession =
            serde_json::from_value(event.data.object).map_err(|e| {
                WebhookError::ParseError(format!("Invalid checkout session object: {}", e))
            })?;

        return Ok(BillingEvent {
            event_id: event.id,
            event_type: event.event_type,
            occurred_at,
            provider: PROVIDER_NAME.to_string(),
            provider_subscription_id: None,
            provider_customer_id: session.customer,
            status: None,
            billing_cycle: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: None,
            custom_data: metadata_value(&session.metadata),
        });
    }

    let custom_data = event
        .data
        .object
        .get("metadata")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    Ok(BillingEvent {
        event_id: event.id,
        event_type: event.event_type,
        occurred_at,
        provider: PROVIDER_NAME.to_string(),
        provider_subscription_id: None,
        provider_customer_id: None,
        status: None,
        billing_cycle: None,
        current_period_start: None,
        current_period_end: None,
        cancel_at_period_end: None,
        custom_data,
    })
}

/// Map Stripe's subscription status strings to the domain enum.
fn map_status(status: &str) -> Option<SubscriptionStatus> {
    match status {
        "active" => Some(SubscriptionStatus::Active),
        "trialing" => Some(SubscriptionStatus::Trialing),
        "past_due" => Some(SubscriptionStatus::PastDue),
        "canceled" | "cancelled" => Some(SubscriptionStatus::Cancelled),
        "paused" => Some(SubscriptionStatus::Paused),
        "expired" => Some(SubscriptionStatus::Expired),
        _ => None,
    }
}

/// Map Stripe's plan interval strings to the domain enum.
fn map_interval(interval: &str) -> Option<BillingCycle> {
    match interval {
        "month" | "monthly" => Some(BillingCycle::Monthly),
        "year" | "annual" => Some(BillingCycle::Annual),
        _ => None,
    }
}

/// Convert object metadata into the event's `custom_data` value.
fn metadata_value(metadata: &std::collections::HashMap<String, String>) -> serde_json::Value {
    serde_json::to_value(metadata).unwrap_or(serde_json::Value::Null)
}
