//! HTTP handlers for the payment webhook endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::ApiError;
use crate::application::handlers::billing::{
    ProcessWebhookEventCommand, ProcessWebhookEventHandler,
};
use crate::domain::billing::WebhookError;

use super::dto::WebhookAckResponse;

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct BillingHandlers {
    webhook_handler: Arc<ProcessWebhookEventHandler>,
    /// Header names checked for the webhook signature, in priority order.
    signature_headers: Vec<String>,
}

impl BillingHandlers {
    pub fn new(webhook_handler: Arc<ProcessWebhookEventHandler>, signature_headers: Vec<String>) -> Self {
        Self {
            webhook_handler,
            signature_headers,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/payment - Receive a payment provider webhook
///
/// The body is taken raw: signature verification runs over the exact
/// bytes the provider sent, before any JSON parsing.
pub async fn post_payment_webhook(
    State(handlers): State<BillingHandlers>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = match find_signature(&handlers.signature_headers, &headers) {
        Some(signature) => signature.to_string(),
        None => return ApiError::from(WebhookError::MissingSignature).into_response(),
    };

    let cmd = ProcessWebhookEventCommand {
        payload: body.to_vec(),
        signature,
    };

    match handlers.webhook_handler.handle(cmd).await {
        Ok(outcome) if outcome.is_deduplicated() => {
            (StatusCode::OK, Json(WebhookAckResponse::deduplicated())).into_response()
        }
        Ok(_) => (StatusCode::OK, Json(WebhookAckResponse::received())).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Returns the value of the first configured signature header present on
/// the request. A present header that is not valid UTF-8 counts as absent.
fn find_signature<'a>(names: &[String], headers: &'a HeaderMap) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| headers.get(name.as_str()))
        .and_then(|value| value.to_str().ok())
}
