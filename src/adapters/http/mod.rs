//! HTTP adapters - REST API implementations.
//!
//! Each domain module has its own HTTP adapter for endpoint exposure.
//! [`api_router`] assembles the route families plus the liveness probe;
//! cross-cutting tower layers (tracing, CORS, timeouts) are applied by
//! the binary, where the configuration lives.

pub mod billing;
pub mod credits;
pub mod error;
pub mod middleware;

use axum::{routing::get, Json, Router};
use serde::Serialize;

// Re-export key types for convenience
pub use billing::{billing_routes, BillingHandlers};
pub use credits::{credits_routes, CreditsHandlers};
pub use error::ApiError;

/// Assembles the full API router from the per-family handler states.
pub fn api_router(billing: BillingHandlers, credits: CreditsHandlers) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(billing_routes(billing))
        .merge(credits_routes(credits))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// GET /health - liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "tallygate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(response) = health().await;

        assert_eq!(response.status, "ok");
        assert_eq!(response.service, "tallygate");
        assert!(!response.version.is_empty());
    }
}
