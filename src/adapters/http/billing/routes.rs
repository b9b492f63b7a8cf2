//! HTTP routes for billing endpoints.

use axum::{routing::post, Router};

use super::handlers::{post_payment_webhook, BillingHandlers};

/// Creates the billing router.
///
/// # Routes
///
/// - `POST /api/webhooks/payment` - Payment provider webhook receiver
pub fn billing_routes(handlers: BillingHandlers) -> Router {
    Router::new()
        .route("/api/webhooks/payment", post(post_payment_webhook))
        .with_state(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use secrecy::SecretString;
    use tower::ServiceExt;

    use crate::adapters::analytics::InMemoryAnalytics;
    use crate::adapters::memory::{
        InMemoryCreditsLedger, InMemoryProcessedEventStore, InMemorySubscriptionStore,
        InMemoryTierCache,
    };
    use crate::adapters::stripe::{StripeConfig, StripePaymentAdapter};
    use crate::application::handlers::billing::{GrantDefaults, ProcessWebhookEventHandler};

    fn test_handlers() -> BillingHandlers {
        let provider = Arc::new(StripePaymentAdapter::new(StripeConfig::new(
            SecretString::new("whsec_route_test".to_string()),
        )));
        let events = Arc::new(InMemoryProcessedEventStore::new());
        let ledger = Arc::new(InMemoryCreditsLedger::new());
        let tiers = Arc::new(InMemoryTierCache::new());
        let subscriptions = Arc::new(InMemorySubscriptionStore::new(ledger.clone(), tiers.clone()));
        let analytics = Arc::new(InMemoryAnalytics::new());

        let handler = Arc::new(ProcessWebhookEventHandler::new(
            provider,
            events,
            subscriptions,
            ledger,
            tiers,
            analytics,
            GrantDefaults::default(),
        ));

        BillingHandlers::new(handler, vec!["Stripe-Signature".to_string()])
    }

    #[tokio::test]
    async fn webhook_route_mounts_and_rejects_unsigned_requests() {
        let app = billing_routes(test_handlers());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/webhooks/payment")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_route_only_accepts_post() {
        let app = billing_routes(test_handlers());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/webhooks/payment")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            axum::http::StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
