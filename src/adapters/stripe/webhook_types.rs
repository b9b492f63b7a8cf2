//! Stripe-specific types for webhook handling.
//!
//! These types represent the provider's wire format as it arrives in
//! webhook deliveries: the signature header, the event envelope, and the
//! objects carried inside `data.object`. The adapter normalizes them
//! into `BillingEvent`; nothing outside this module sees these shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// Header is empty or missing.
    MissingHeader,
    /// Missing timestamp component (t=...).
    MissingTimestamp,
    /// Missing v1 signature component.
    MissingV1Signature,
    /// Invalid timestamp format.
    InvalidTimestamp,
    /// Invalid signature format (not valid hex).
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed signature header components.
///
/// The header format is: `t=<timestamp>,v1=<hex signature>`
///
/// # Example
///
/// ```ignore
/// let header = "t=1704067200,v1=abc123def456...";
/// let parsed = SignatureHeader::parse(header)?;
/// assert_eq!(parsed.timestamp, 1704067200);
/// ```
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when the provider signed the payload.
    pub timestamp: i64,

    /// HMAC-SHA256 signature, decoded from hex.
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parse a signature header into components.
    ///
    /// Unknown `key=value` pairs are skipped so new scheme versions do
    /// not break existing deployments.
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or(SignatureParseError::MissingTimestamp)?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex_decode(value.trim())
                            .ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                _ => {}
            }
        }

        Ok(Self {
            timestamp: timestamp.ok_or(SignatureParseError::MissingTimestamp)?,
            v1_signature: v1_signature.ok_or(SignatureParseError::MissingV1Signature)?,
        })
    }
}

/// Decode a hex string to bytes.
fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }

    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
        bytes.push(byte);
    }
    Some(bytes)
}

/// Encode bytes to hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Wire Event Types
// ════════════════════════════════════════════════════════════════════════════════

/// Raw webhook event envelope as received from the provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "subscription.created").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    /// Event payload containing the affected object.
    pub data: StripeEventData,

    /// Whether this is a live or test event.
    #[serde(default)]
    pub livemode: bool,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,
}

/// Subscription object carried by `subscription.*` events.
///
/// Everything past the id is optional: each event type carries the
/// subset it describes, and absent fields mean "unchanged" downstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: Option<String>,

    /// Subscription status as the provider spells it.
    pub status: Option<String>,

    /// Current period start (Unix timestamp).
    pub current_period_start: Option<i64>,

    /// Current period end (Unix timestamp).
    pub current_period_end: Option<i64>,

    /// Whether the subscription lapses at period end.
    pub cancel_at_period_end: Option<bool>,

    /// Plan summary with the billing interval.
    pub plan: Option<StripePlan>,

    /// Custom metadata attached at checkout.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Plan summary embedded in subscription objects.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePlan {
    /// Billing interval (month, year).
    pub interval: Option<String>,
}

/// Checkout-session object carried by credit purchase events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Customer ID if one was attached.
    pub customer: Option<String>,

    /// Session payment status.
    pub payment_status: Option<String>,

    /// Custom metadata attached to the session.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // SignatureHeader Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_signature_header_valid() {
        let header = "t=1704067200,v1=5d41402abc4b2a76b9719d911017c592";
        let parsed = SignatureHeader::parse(header).unwrap();

        assert_eq!(parsed.timestamp, 1704067200);
        assert_eq!(
            hex_encode(&parsed.v1_signature),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn parse_signature_header_skips_unknown_keys() {
        let header = "t=1704067200,v1=5d41402abc4b2a76b9719d911017c592,v0=aabbccdd";
        let parsed = SignatureHeader::parse(header).unwrap();

        assert_eq!(parsed.timestamp, 1704067200);
        assert_eq!(
            hex_encode(&parsed.v1_signature),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn parse_signature_header_missing_timestamp() {
        let header = "v1=5d41402abc4b2a76b9719d911017c592";
        let result = SignatureHeader::parse(header);
        assert!(matches!(result, Err(SignatureParseError::MissingTimestamp)));
    }

    #[test]
    fn parse_signature_header_missing_v1() {
        let header = "t=1704067200";
        let result = SignatureHeader::parse(header);
        assert!(matches!(
            result,
            Err(SignatureParseError::MissingV1Signature)
        ));
    }

    #[test]
    fn parse_signature_header_empty() {
        let result = SignatureHeader::parse("");
        assert!(matches!(result, Err(SignatureParseError::MissingHeader)));
    }

    #[test]
    fn parse_signature_header_invalid_timestamp() {
        let header = "t=not_a_number,v1=5d41402abc4b2a76b9719d911017c592";
        let result = SignatureHeader::parse(header);
        assert!(matches!(result, Err(SignatureParseError::InvalidTimestamp)));
    }

    #[test]
    fn parse_signature_header_invalid_hex() {
        let header = "t=1704067200,v1=not_valid_hex_xyz";
        let result = SignatureHeader::parse(header);
        assert!(matches!(
            result,
            Err(SignatureParseError::InvalidSignatureFormat)
        ));
    }

    #[test]
    fn parse_signature_header_odd_length_hex() {
        let header = "t=1704067200,v1=abc";
        let result = SignatureHeader::parse(header);
        assert!(matches!(
            result,
            Err(SignatureParseError::InvalidSignatureFormat)
        ));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Hex Encoding Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn hex_encode_empty() {
        assert_eq!(hex_encode(&[]), "");
    }

    #[test]
    fn hex_encode_bytes() {
        assert_eq!(hex_encode(&[0x00, 0xff, 0x10]), "00ff10");
    }

    #[test]
    fn hex_decode_roundtrip() {
        let original = vec![0xde, 0xad, 0xbe, 0xef];
        let encoded = hex_encode(&original);
        let decoded = hex_decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Event Parsing Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_subscription_created_event() {
        let json = r#"{
            "id": "evt_1234567890",
            "type": "subscription.created",
            "created": 1704067200,
            "data": {
                "object": {
                    "id": "sub_test_123",
                    "customer": "cus_test_xyz",
                    "status": "active",
                    "current_period_start": 1704067200,
                    "current_period_end": 1706745600,
                    "cancel_at_period_end": false,
                    "plan": { "interval": "month" },
                    "metadata": {
                        "user_id": "user-abc"
                    }
                }
            },
            "livemode": false
        }"#;

        let event: StripeWebhookEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_1234567890");
        assert_eq!(event.event_type, "subscription.created");
        assert_eq!(event.created, 1704067200);
        assert!(!event.livemode);

        let sub: StripeSubscription = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(sub.id, "sub_test_123");
        assert_eq!(sub.status.as_deref(), Some("active"));
        assert_eq!(sub.cancel_at_period_end, Some(false));
        assert_eq!(
            sub.plan.and_then(|p| p.interval).as_deref(),
            Some("month")
        );
        assert_eq!(sub.metadata.get("user_id").unwrap(), "user-abc");
    }

    #[test]
    fn parse_minimal_subscription_object() {
        let json = r#"{ "id": "sub_minimal" }"#;

        let sub: StripeSubscription = serde_json::from_str(json).unwrap();

        assert_eq!(sub.id, "sub_minimal");
        assert!(sub.status.is_none());
        assert!(sub.current_period_end.is_none());
        assert!(sub.cancel_at_period_end.is_none());
        assert!(sub.metadata.is_empty());
    }

    #[test]
    fn absent_cancel_flag_is_distinct_from_false() {
        let absent: StripeSubscription = serde_json::from_str(r#"{ "id": "sub_1" }"#).unwrap();
        let explicit: StripeSubscription =
            serde_json::from_str(r#"{ "id": "sub_1", "cancel_at_period_end": false }"#).unwrap();

        assert_eq!(absent.cancel_at_period_end, None);
        assert_eq!(explicit.cancel_at_period_end, Some(false));
    }

    #[test]
    fn parse_checkout_session_object() {
        let json = r#"{
            "id": "cs_test_abc",
            "customer": "cus_123",
            "payment_status": "paid",
            "metadata": {
                "user_id": "user-xyz",
                "credits": "500"
            }
        }"#;

        let session: StripeCheckoutSession = serde_json::from_str(json).unwrap();

        assert_eq!(session.id, "cs_test_abc");
        assert_eq!(session.customer.as_deref(), Some("cus_123"));
        assert_eq!(session.payment_status.as_deref(), Some("paid"));
        assert_eq!(session.metadata.get("credits").unwrap(), "500");
    }

    #[test]
    fn envelope_defaults_livemode_to_false() {
        let json = r#"{
            "id": "evt_min",
            "type": "subscription.updated",
            "created": 1704067200,
            "data": { "object": {} }
        }"#;

        let event: StripeWebhookEvent = serde_json::from_str(json).unwrap();
        assert!(!event.livemode);
    }
}
