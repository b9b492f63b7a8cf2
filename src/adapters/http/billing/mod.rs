//! HTTP adapter for billing endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::WebhookAckResponse;
pub use handlers::BillingHandlers;
pub use routes::billing_routes;
