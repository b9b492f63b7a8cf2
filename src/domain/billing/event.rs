//! Normalized billing webhook events.
//!
//! Provider adapters verify and parse raw webhook payloads into this
//! provider-neutral shape; everything downstream of the payment adapter
//! works only with these types.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::{BillingCycle, SubscriptionStatus};

/// Kinds of billing events this service processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventType {
    /// A new subscription was created at the provider.
    SubscriptionCreated,
    /// An existing subscription's status or period changed.
    SubscriptionUpdated,
    /// The user cancelled; access runs out at period end.
    SubscriptionCancelled,
    /// A recurring payment went through.
    PaymentSucceeded,
    /// A recurring payment failed.
    PaymentFailed,
    /// A one-time credit pack was purchased.
    CreditPurchase,
    /// Anything else. Acknowledged and ignored.
    Unknown,
}

impl BillingEventType {
    /// Parse event type from its wire string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "subscription.created" => Self::SubscriptionCreated,
            "subscription.updated" => Self::SubscriptionUpdated,
            "subscription.cancelled" => Self::SubscriptionCancelled,
            "subscription.payment_succeeded" => Self::PaymentSucceeded,
            "subscription.payment_failed" => Self::PaymentFailed,
            "credit.purchase_completed" => Self::CreditPurchase,
            _ => Self::Unknown,
        }
    }

    /// Convert to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "subscription.created",
            Self::SubscriptionUpdated => "subscription.updated",
            Self::SubscriptionCancelled => "subscription.cancelled",
            Self::PaymentSucceeded => "subscription.payment_succeeded",
            Self::PaymentFailed => "subscription.payment_failed",
            Self::CreditPurchase => "credit.purchase_completed",
            Self::Unknown => "unknown",
        }
    }
}

/// A verified, provider-neutral billing event.
///
/// Subscription-shaped events carry the provider's absolute view of the
/// subscription; fields that a given event type does not include are
/// `None`. `custom_data` is the metadata the application attached when
/// the checkout was created (user id, pack size).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    /// Provider-unique event identifier. The dedup key.
    pub event_id: String,

    /// Wire event type string, as received.
    pub event_type: String,

    /// When the provider generated the event.
    pub occurred_at: Timestamp,

    /// Payment provider name (e.g. "stripe").
    pub provider: String,

    /// The provider's subscription id, for subscription-shaped events.
    pub provider_subscription_id: Option<String>,

    /// The provider's customer id, when present.
    pub provider_customer_id: Option<String>,

    /// Absolute subscription status carried by the event.
    pub status: Option<SubscriptionStatus>,

    /// Billing interval carried by the event.
    pub billing_cycle: Option<BillingCycle>,

    /// Start of the billing period the event describes.
    pub current_period_start: Option<Timestamp>,

    /// End of the billing period the event describes.
    pub current_period_end: Option<Timestamp>,

    /// Whether the subscription is set to lapse at period end.
    pub cancel_at_period_end: Option<bool>,

    /// Application metadata echoed back by the provider.
    #[serde(default)]
    pub custom_data: serde_json::Value,
}

impl BillingEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> BillingEventType {
        BillingEventType::from_str(&self.event_type)
    }

    /// Age of the event relative to `now`, in seconds.
    ///
    /// Negative if the event claims to come from the future.
    pub fn age_secs(&self, now: Timestamp) -> i64 {
        now.duration_since(&self.occurred_at).num_seconds()
    }

    /// Look up a string value in `custom_data`.
    pub fn custom_str(&self, key: &str) -> Option<&str> {
        self.custom_data.get(key).and_then(|v| v.as_str())
    }

    /// Look up an integer value in `custom_data`.
    ///
    /// Providers echo metadata as strings, so numeric strings parse too.
    pub fn custom_i64(&self, key: &str) -> Option<i64> {
        let value = self.custom_data.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }
}

/// Builder for creating test BillingEvent instances.
#[cfg(test)]
pub struct BillingEventBuilder {
    event_id: String,
    event_type: String,
    occurred_at: Timestamp,
    provider: String,
    provider_subscription_id: Option<String>,
    provider_customer_id: Option<String>,
    status: Option<SubscriptionStatus>,
    billing_cycle: Option<BillingCycle>,
    current_period_start: Option<Timestamp>,
    current_period_end: Option<Timestamp>,
    cancel_at_period_end: Option<bool>,
    custom_data: serde_json::Value,
}

#[cfg(test)]
impl Default for BillingEventBuilder {
    fn default() -> Self {
        Self {
            event_id: "evt_test_123".to_string(),
            event_type: "subscription.created".to_string(),
            occurred_at: Timestamp::now(),
            provider: "stripe".to_string(),
            provider_subscription_id: Some("sub_test_123".to_string()),
            provider_customer_id: Some("cus_test_123".to_string()),
            status: Some(SubscriptionStatus::Active),
            billing_cycle: Some(BillingCycle::Monthly),
            current_period_start: Some(Timestamp::now()),
            current_period_end: Some(Timestamp::now().add_days(30)),
            cancel_at_period_end: Some(false),
            custom_data: serde_json::json!({ "user_id": "user-1" }),
        }
    }
}

#[cfg(test)]
impl BillingEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_id(mut self, id: impl Into<String>) -> Self {
        self.event_id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn occurred_at(mut self, ts: Timestamp) -> Self {
        self.occurred_at = ts;
        self
    }

    pub fn subscription_id(mut self, id: impl Into<String>) -> Self {
        self.provider_subscription_id = Some(id.into());
        self
    }

    pub fn status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn period_end(mut self, ts: Timestamp) -> Self {
        self.current_period_end = Some(ts);
        self
    }

    pub fn cancel_at_period_end(mut self, flag: bool) -> Self {
        self.cancel_at_period_end = Some(flag);
        self
    }

    pub fn custom_data(mut self, data: serde_json::Value) -> Self {
        self.custom_data = data;
        self
    }

    pub fn build(self) -> BillingEvent {
        BillingEvent {
            event_id: self.event_id,
            event_type: self.event_type,
            occurred_at: self.occurred_at,
            provider: self.provider,
            provider_subscription_id: self.provider_subscription_id,
            provider_customer_id: self.provider_customer_id,
            status: self.status,
            billing_cycle: self.billing_cycle,
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
            cancel_at_period_end: self.cancel_at_period_end,
            custom_data: self.custom_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ══════════════════════════════════════════════════════════════
    // BillingEventType Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn event_type_from_str_created() {
        assert_eq!(
            BillingEventType::from_str("subscription.created"),
            BillingEventType::SubscriptionCreated
        );
    }

    #[test]
    fn event_type_from_str_credit_purchase() {
        assert_eq!(
            BillingEventType::from_str("credit.purchase_completed"),
            BillingEventType::CreditPurchase
        );
    }

    #[test]
    fn event_type_from_str_unknown() {
        assert_eq!(
            BillingEventType::from_str("some.unhandled.event"),
            BillingEventType::Unknown
        );
    }

    #[test]
    fn event_type_as_str_roundtrip() {
        let types = [
            BillingEventType::SubscriptionCreated,
            BillingEventType::SubscriptionUpdated,
            BillingEventType::SubscriptionCancelled,
            BillingEventType::PaymentSucceeded,
            BillingEventType::PaymentFailed,
            BillingEventType::CreditPurchase,
        ];

        for event_type in types {
            let s = event_type.as_str();
            assert_eq!(BillingEventType::from_str(s), event_type);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // BillingEvent Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parsed_type_returns_correct_variant() {
        let event = BillingEventBuilder::new()
            .event_type("subscription.payment_failed")
            .build();

        assert_eq!(event.parsed_type(), BillingEventType::PaymentFailed);
    }

    #[test]
    fn age_secs_positive_for_past_event() {
        let event = BillingEventBuilder::new()
            .occurred_at(Timestamp::now().plus_secs(-120))
            .build();

        let age = event.age_secs(Timestamp::now());
        assert!(age >= 119 && age <= 121, "age was {}", age);
    }

    #[test]
    fn age_secs_negative_for_future_event() {
        let event = BillingEventBuilder::new()
            .occurred_at(Timestamp::now().plus_secs(120))
            .build();

        assert!(event.age_secs(Timestamp::now()) < 0);
    }

    #[test]
    fn custom_str_reads_metadata() {
        let event = BillingEventBuilder::new()
            .custom_data(json!({ "user_id": "user-42" }))
            .build();

        assert_eq!(event.custom_str("user_id"), Some("user-42"));
        assert_eq!(event.custom_str("missing"), None);
    }

    #[test]
    fn custom_i64_reads_number_and_numeric_string() {
        let event = BillingEventBuilder::new()
            .custom_data(json!({ "credits": 500, "packs": "3" }))
            .build();

        assert_eq!(event.custom_i64("credits"), Some(500));
        assert_eq!(event.custom_i64("packs"), Some(3));
        assert_eq!(event.custom_i64("missing"), None);
    }

    #[test]
    fn event_serializes_roundtrip() {
        let event = BillingEventBuilder::new()
            .event_id("evt_roundtrip")
            .status(SubscriptionStatus::PastDue)
            .build();

        let json = serde_json::to_string(&event).unwrap();
        let parsed: BillingEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.event_id, "evt_roundtrip");
        assert_eq!(parsed.status, Some(SubscriptionStatus::PastDue));
    }
}
