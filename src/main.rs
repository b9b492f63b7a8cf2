//! Tallygate service binary.
//!
//! Wires the Postgres-backed adapters into the application handlers,
//! serves the HTTP API, and runs the background maintenance loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tallygate::adapters::analytics::TracingAnalytics;
use tallygate::adapters::http::{api_router, BillingHandlers, CreditsHandlers};
use tallygate::adapters::jobs::{MaintenanceSweeper, MaintenanceSweeperConfig};
use tallygate::adapters::postgres::{
    PostgresCreditsLedger, PostgresProcessedEventStore, PostgresSubscriptionStore,
    PostgresTierCache,
};
use tallygate::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use tallygate::application::handlers::billing::{
    ExpireLapsedSubscriptionsHandler, GrantDefaults, ProcessWebhookEventHandler,
};
use tallygate::application::handlers::credits::{
    CheckAccessHandler, GetBalanceHandler, ListTransactionsHandler, RefreshCreditGrantsHandler,
};
use tallygate::config::AppConfig;
use tallygate::domain::credits::FeatureCatalog;
use tallygate::ports::{
    CreditsLedger, ProcessedEventStore, SubscriptionStore, TierCache, UsageAnalytics,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(
        environment = %config.server.environment,
        port = config.server.port,
        sweeper_enabled = config.sweeper.enabled,
        "Starting tallygate"
    );

    // Database pool
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    // Ports
    let ledger: Arc<dyn CreditsLedger> = Arc::new(PostgresCreditsLedger::new(pool.clone()));
    let events: Arc<dyn ProcessedEventStore> =
        Arc::new(PostgresProcessedEventStore::new(pool.clone()));
    let subscriptions: Arc<dyn SubscriptionStore> =
        Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let tiers: Arc<dyn TierCache> = Arc::new(PostgresTierCache::new(pool.clone()));
    let analytics: Arc<dyn UsageAnalytics> = Arc::new(TracingAnalytics::new());

    let provider = Arc::new(StripePaymentAdapter::new(
        StripeConfig::new(config.billing.webhook_secret.clone())
            .with_require_livemode(config.billing.require_livemode),
    ));

    let catalog = load_feature_catalog(&config)?;

    // Application handlers
    let webhook_handler = Arc::new(ProcessWebhookEventHandler::new(
        provider,
        events.clone(),
        subscriptions.clone(),
        ledger.clone(),
        tiers.clone(),
        analytics.clone(),
        GrantDefaults {
            monthly_credits: config.billing.monthly_credits,
            purchase_credits: config.billing.purchase_credits,
        },
    ));

    let billing_handlers = BillingHandlers::new(
        webhook_handler,
        config.billing.signature_header_list(),
    );

    let credits_handlers = CreditsHandlers::new(
        Arc::new(GetBalanceHandler::new(ledger.clone())),
        Arc::new(ListTransactionsHandler::new(ledger.clone())),
        Arc::new(CheckAccessHandler::new(
            catalog,
            ledger.clone(),
            subscriptions.clone(),
            tiers.clone(),
            analytics.clone(),
        )),
    );

    // Background maintenance loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = if config.sweeper.enabled {
        let sweeper = MaintenanceSweeper::with_config(
            ExpireLapsedSubscriptionsHandler::new(subscriptions.clone(), tiers.clone()),
            RefreshCreditGrantsHandler::new(ledger.clone(), analytics.clone()),
            events.clone(),
            MaintenanceSweeperConfig::default()
                .with_sweep_interval(config.sweeper.sweep_interval())
                .with_batch_size(config.sweeper.batch_size)
                .with_retention_days(config.sweeper.retention_days),
        );
        let shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move { sweeper.run(shutdown).await }))
    } else {
        None
    };

    // Router with the cross-cutting tower layers
    let cors = build_cors_layer(&config.server.cors_origins_list());
    let app = api_router(billing_handlers, credits_handlers)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Server has drained; stop the maintenance loop.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber from the configured log filter.
///
/// `RUST_LOG` takes precedence when set. Production emits JSON lines,
/// everything else stays human-readable.
fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.server.log_level.clone().into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Build the gated-feature catalog: built-in defaults, optionally
/// overlaid with a deployment catalog file.
fn load_feature_catalog(config: &AppConfig) -> Result<FeatureCatalog, Box<dyn std::error::Error>> {
    let mut catalog = FeatureCatalog::defaults();

    if let Some(path) = &config.features.catalog_path {
        let yaml = std::fs::read_to_string(path)?;
        let overlay = FeatureCatalog::from_yaml_str(&yaml)?;
        catalog = catalog.merged_with(overlay);
        tracing::info!(%path, "Loaded feature catalog overlay");
    }

    Ok(catalog)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
