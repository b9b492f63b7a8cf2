//! ProcessWebhookEventHandler - Command handler for payment provider webhooks.
//!
//! The single entry point for billing events: verifies the delivery,
//! deduplicates it, and applies exactly one of the subscription or
//! credit side effects.

use std::sync::Arc;

use crate::domain::billing::{
    BillingCycle, BillingEvent, BillingEventType, Subscription, SubscriptionStatus,
    SubscriptionTier, WebhookError,
};
use crate::domain::credits::CreditTransactionType;
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::ports::{
    AddCreditsRequest, CreateOutcome, CreditsLedger, MarkOutcome, PaymentProvider,
    ProcessedEventStore, SubscriptionGrant, SubscriptionStore, TierCache, UsageAnalytics,
    UsageEvent,
};

/// Events older than this are rejected outright; the provider will not
/// retry a 400.
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Command to process one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookEventCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header value.
    pub signature: String,
}

/// Grant sizes applied when an event carries no explicit amount.
#[derive(Debug, Clone, Copy)]
pub struct GrantDefaults {
    /// Monthly allowance granted with a new subscription.
    pub monthly_credits: i64,
    /// Pack size for a purchase event without a `credits` field.
    pub purchase_credits: i64,
}

impl Default for GrantDefaults {
    fn default() -> Self {
        Self {
            monthly_credits: 100,
            purchase_credits: 50,
        }
    }
}

/// Result of webhook processing.
///
/// Every variant is a success from the provider's point of view; real
/// failures surface as [`WebhookError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessWebhookEventResult {
    /// Subscription, initial grant, and cached tier all committed.
    SubscriptionCreated {
        user_id: String,
        credits_granted: i64,
    },
    /// An existing subscription's state was updated and its tier
    /// recomputed.
    SubscriptionUpdated {
        user_id: String,
        status: SubscriptionStatus,
        tier: SubscriptionTier,
    },
    /// A one-time credit pack was applied to the ledger.
    CreditsPurchased {
        user_id: String,
        credits: i64,
        balance: i64,
    },
    /// The event id was already processed; side effects skipped.
    Duplicate,
    /// The event referenced a subscription this service does not track.
    Dropped,
    /// Unrecognized event type, acknowledged without action.
    Ignored,
}

impl ProcessWebhookEventResult {
    /// True when the event id had already been processed.
    pub fn is_deduplicated(&self) -> bool {
        matches!(self, ProcessWebhookEventResult::Duplicate)
    }
}

/// Handler for processing payment provider webhooks.
///
/// Pipeline: verify signature, reject stale timestamps, mark the event
/// id processed, then dispatch on the event type. The mark happens
/// *before* the side effects: of two concurrent deliveries of the same
/// event id, exactly one passes the mark and executes. The trade-off is
/// that a failure after the mark leaves the provider's retry looking
/// like a duplicate; the absolute-state tier recomputation makes the
/// next event for the same subscription self-healing.
pub struct ProcessWebhookEventHandler {
    provider: Arc<dyn PaymentProvider>,
    events: Arc<dyn ProcessedEventStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    ledger: Arc<dyn CreditsLedger>,
    tiers: Arc<dyn TierCache>,
    analytics: Arc<dyn UsageAnalytics>,
    grants: GrantDefaults,
}

impl ProcessWebhookEventHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        events: Arc<dyn ProcessedEventStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        ledger: Arc<dyn CreditsLedger>,
        tiers: Arc<dyn TierCache>,
        analytics: Arc<dyn UsageAnalytics>,
        grants: GrantDefaults,
    ) -> Self {
        Self {
            provider,
            events,
            subscriptions,
            ledger,
            tiers,
            analytics,
            grants,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessWebhookEventCommand,
    ) -> Result<ProcessWebhookEventResult, WebhookError> {
        let event = match self
            .provider
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await?
        {
            Some(event) => event,
            None => {
                tracing::warn!("webhook rejected: signature verification failed");
                return Err(WebhookError::InvalidSignature);
            }
        };

        let now = Timestamp::now();
        let age_secs = event.age_secs(now);
        if age_secs > MAX_EVENT_AGE_SECS {
            tracing::warn!(
                event_id = %event.event_id,
                age_secs,
                "webhook rejected: stale event timestamp"
            );
            return Err(WebhookError::StaleTimestamp { age_secs });
        }

        // Mark before side effects: of two concurrent deliveries of the
        // same event id, exactly one passes this gate.
        match self
            .events
            .mark_processed(&event.event_id, &event.event_type)
            .await?
        {
            MarkOutcome::FirstDelivery => {}
            MarkOutcome::AlreadyProcessed => {
                tracing::info!(
                    event_id = %event.event_id,
                    "duplicate webhook delivery; side effects skipped"
                );
                return Ok(ProcessWebhookEventResult::Duplicate);
            }
        }

        match event.parsed_type() {
            BillingEventType::SubscriptionCreated => {
                self.handle_subscription_created(&event, now).await
            }
            BillingEventType::SubscriptionUpdated => {
                self.apply_subscription_change(&event, now, |subscription| {
                    let status = event.status.unwrap_or(subscription.status);
                    subscription.apply_update(
                        status,
                        event.current_period_start,
                        event.current_period_end,
                        event.cancel_at_period_end,
                    );
                })
                .await
            }
            BillingEventType::SubscriptionCancelled => {
                self.apply_subscription_change(&event, now, |subscription| {
                    subscription.mark_cancelled();
                })
                .await
            }
            BillingEventType::PaymentSucceeded => {
                self.apply_subscription_change(&event, now, |subscription| {
                    subscription
                        .record_payment(event.current_period_start, event.current_period_end);
                })
                .await
            }
            BillingEventType::PaymentFailed => {
                self.apply_subscription_change(&event, now, |subscription| {
                    subscription.mark_payment_failed();
                })
                .await
            }
            BillingEventType::CreditPurchase => self.handle_credit_purchase(&event).await,
            BillingEventType::Unknown => {
                tracing::debug!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "ignoring unrecognized webhook event type"
                );
                Ok(ProcessWebhookEventResult::Ignored)
            }
        }
    }

    /// Creates the subscription, its initial grant, and the cached tier
    /// as one unit.
    async fn handle_subscription_created(
        &self,
        event: &BillingEvent,
        now: Timestamp,
    ) -> Result<ProcessWebhookEventResult, WebhookError> {
        let provider_subscription_id = event
            .provider_subscription_id
            .clone()
            .ok_or(WebhookError::MissingMetadata("provider_subscription_id"))?;
        let user_id = resolve_user_id(event)?;

        let status = event.status.unwrap_or(SubscriptionStatus::Active);
        let billing_cycle = event.billing_cycle.unwrap_or(BillingCycle::Monthly);
        let period_start = event.current_period_start.unwrap_or(event.occurred_at);
        let period_end = event
            .current_period_end
            .unwrap_or_else(|| period_start.add_months(1));

        let subscription = Subscription::create(
            SubscriptionId::new(),
            user_id.clone(),
            event.provider.clone(),
            provider_subscription_id,
            event.provider_customer_id.clone(),
            status,
            billing_cycle,
            period_start,
            period_end,
        );

        let credits = event
            .custom_i64("credits")
            .unwrap_or(self.grants.monthly_credits);
        if credits < 0 {
            return Err(WebhookError::ParseError(format!(
                "created event with negative credit allowance: {}",
                credits
            )));
        }

        let tier = subscription.effective_tier(now);
        let grant = SubscriptionGrant::new(credits, tier)
            .with_description("Initial subscription credit grant")
            .with_external_ref(event.event_id.clone());

        match self
            .subscriptions
            .create_with_grant(&subscription, grant)
            .await?
        {
            CreateOutcome::Created => {}
            CreateOutcome::AlreadyExists => {
                tracing::info!(
                    event_id = %event.event_id,
                    provider_subscription_id = %subscription.provider_subscription_id,
                    "subscription already exists; created event treated as duplicate"
                );
                return Ok(ProcessWebhookEventResult::Duplicate);
            }
        }

        if credits > 0 {
            self.analytics
                .record(UsageEvent::CreditsGranted {
                    user_id: user_id.clone(),
                    credit_type: CreditTransactionType::SubscriptionGrant,
                    amount: credits,
                })
                .await;
        }

        tracing::info!(
            event_id = %event.event_id,
            user_id = %user_id,
            credits_granted = credits,
            "subscription created with initial credit grant"
        );

        Ok(ProcessWebhookEventResult::SubscriptionCreated {
            user_id: user_id.to_string(),
            credits_granted: credits,
        })
    }

    /// Locates the subscription an event refers to, applies the change,
    /// and recomputes the cached tier from the resulting absolute state.
    async fn apply_subscription_change(
        &self,
        event: &BillingEvent,
        now: Timestamp,
        apply: impl FnOnce(&mut Subscription),
    ) -> Result<ProcessWebhookEventResult, WebhookError> {
        let provider_subscription_id = event
            .provider_subscription_id
            .as_deref()
            .ok_or(WebhookError::MissingMetadata("provider_subscription_id"))?;

        let found = self
            .subscriptions
            .find_by_provider_subscription_id(provider_subscription_id)
            .await?;
        let mut subscription = match found {
            Some(subscription) => subscription,
            None => {
                // Out-of-order delivery: an update can arrive before the
                // created event it refers to. Non-fatal; dropped.
                tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    provider_subscription_id,
                    "webhook references unknown subscription; event dropped"
                );
                return Ok(ProcessWebhookEventResult::Dropped);
            }
        };

        apply(&mut subscription);
        self.subscriptions.update(&subscription).await?;

        let tier = subscription.effective_tier(now);
        self.tiers.set_tier(&subscription.user_id, tier).await?;

        tracing::info!(
            event_id = %event.event_id,
            user_id = %subscription.user_id,
            status = ?subscription.status,
            tier = tier.display_name(),
            "subscription updated from webhook"
        );

        Ok(ProcessWebhookEventResult::SubscriptionUpdated {
            user_id: subscription.user_id.to_string(),
            status: subscription.status,
            tier,
        })
    }

    /// Applies a one-time credit pack purchase to the ledger.
    async fn handle_credit_purchase(
        &self,
        event: &BillingEvent,
    ) -> Result<ProcessWebhookEventResult, WebhookError> {
        let user_id = resolve_user_id(event)?;

        let credits = event
            .custom_i64("credits")
            .unwrap_or(self.grants.purchase_credits);
        if credits <= 0 {
            return Err(WebhookError::ParseError(format!(
                "credit purchase with non-positive amount: {}",
                credits
            )));
        }

        let request =
            AddCreditsRequest::new(user_id.clone(), credits, CreditTransactionType::Purchase)
                .with_description("Credit pack purchase")
                .with_external_ref(event.event_id.clone());
        let account = self.ledger.add_credits(request).await?;

        self.analytics
            .record(UsageEvent::CreditsGranted {
                user_id: user_id.clone(),
                credit_type: CreditTransactionType::Purchase,
                amount: credits,
            })
            .await;

        tracing::info!(
            event_id = %event.event_id,
            user_id = %user_id,
            credits,
            balance = account.balance,
            "credit pack purchase applied"
        );

        Ok(ProcessWebhookEventResult::CreditsPurchased {
            user_id: user_id.to_string(),
            credits,
            balance: account.balance,
        })
    }
}

/// Pulls the target user out of the event's custom data.
fn resolve_user_id(event: &BillingEvent) -> Result<UserId, WebhookError> {
    event
        .custom_str("user_id")
        .ok_or(WebhookError::MissingMetadata("user_id"))
        .and_then(|raw| UserId::new(raw).map_err(|_| WebhookError::MissingMetadata("user_id")))
}
