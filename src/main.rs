//! Gateway Reconciler service binary.
//!
//! Serves the provider-facing notification endpoint and the read-side
//! reference snapshot. The synchronous reconciler handlers are library
//! API, invoked inline by the surrounding checkout flow; this binary
//! only hosts the pieces with an HTTP surface.

use std::sync::Arc;

use secrecy::SecretString;

use gateway_reconciler::adapters::http::{router, ReconcilerAppState};
use gateway_reconciler::adapters::ipn::{HmacNotificationVerifier, InMemorySeenMessages};
use gateway_reconciler::adapters::logging::AuditLogger;
use gateway_reconciler::adapters::memory::InMemoryOrderStore;
use gateway_reconciler::adapters::observers::OrderStatusObserver;
use gateway_reconciler::application::handlers::reconciliation::HandleNotificationHandler;
use gateway_reconciler::config::AppConfig;
use gateway_reconciler::domain::reconciliation::{
    ObserverSet, OrderLockRegistry, ReferenceStateStore,
};
use gateway_reconciler::ports::{
    NotificationVerifier, OrderStore, SeenMessageStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!(
        environment = ?config.server.environment,
        sandbox = config.gateway.is_sandbox(),
        debug_logging = config.features.debug_logging,
        "Starting gateway reconciler"
    );

    // The order subsystem is external; the in-memory store stands in
    // until its adapter is wired here.
    let orders: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
    let store = Arc::new(ReferenceStateStore::new(Arc::clone(&orders)));
    let locks = Arc::new(OrderLockRegistry::new());
    let observers =
        ObserverSet::new().with(Arc::new(OrderStatusObserver::new(Arc::clone(&orders))));

    let audit = AuditLogger::new(config.features.debug_logging);
    let verifier: Arc<dyn NotificationVerifier> = Arc::new(HmacNotificationVerifier::new(
        SecretString::new(config.gateway.notification_secret.clone()),
    ));
    let seen: Arc<dyn SeenMessageStore> = Arc::new(InMemorySeenMessages::new());

    let notification_handler = Arc::new(HandleNotificationHandler::new(
        verifier,
        seen,
        Arc::clone(&store),
        locks,
        observers,
        audit,
    ));

    let app = router(ReconcilerAppState { notification_handler, store });

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}
