//! Billing handlers.
//!
//! Webhook event processing and the periodic expiry sweep.

mod expire_lapsed_subscriptions;
mod process_webhook_event;

pub use expire_lapsed_subscriptions::{
    ExpireLapsedSubscriptionsCommand, ExpireLapsedSubscriptionsHandler,
    ExpireLapsedSubscriptionsResult,
};
pub use process_webhook_event::{
    GrantDefaults, ProcessWebhookEventCommand, ProcessWebhookEventHandler,
    ProcessWebhookEventResult,
};
