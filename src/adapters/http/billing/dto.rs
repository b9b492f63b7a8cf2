//! HTTP DTOs for the payment webhook endpoint.

use serde::Serialize;

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the payment provider.
///
/// Anything the provider should not retry is acknowledged with
/// `received: true`, including redeliveries; those additionally carry
/// `deduplicated: true` so log correlation can tell the two apart.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplicated: Option<bool>,
}

impl WebhookAckResponse {
    /// Ack for a first-time delivery.
    pub fn received() -> Self {
        Self {
            received: true,
            deduplicated: None,
        }
    }

    /// Ack for a redelivery of an already-processed event.
    pub fn deduplicated() -> Self {
        Self {
            received: true,
            deduplicated: Some(true),
        }
    }
}
