use anyhow::Context;
use skyseat_api::{app, AppState};
use skyseat_booking::{
    BookingOrchestrator, HttpPaymentGateway, MockPaymentGateway, OrchestratorConfig, PaymentClient,
    PaymentClientConfig, StaleSeatReaper,
};
use skyseat_catalog::{seat_provisioning_queue, FlightCatalog, SeatProvisioner};
use skyseat_core::{InventoryStore, PaymentGateway, SeatLockService};
use skyseat_store::app_config::Config;
use skyseat_store::{DbClient, InMemoryLockService, InMemoryStore, PgInventoryStore, RedisLockService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyseat_api=debug,skyseat_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    info!("Starting SkySeat API on port {}", config.server.port);

    let store: Arc<dyn InventoryStore> = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PgInventoryStore::new(&db))
        }
        None => {
            warn!("No database configured, inventory lives in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let lock_ttl = Duration::from_millis(config.locks.seat_lock_ttl_ms);
    let locks: Arc<dyn SeatLockService> = match &config.redis.url {
        Some(url) => Arc::new(
            RedisLockService::new(url, &config.locks.key_prefix, lock_ttl).context("Invalid Redis URL")?,
        ),
        None => {
            warn!("No Redis configured, seat locks are local to this instance");
            Arc::new(InMemoryLockService::new(lock_ttl))
        }
    };

    let gateway: Arc<dyn PaymentGateway> = match &config.payment.gateway_url {
        Some(url) => Arc::new(HttpPaymentGateway::new(url.as_str())),
        None => {
            warn!("No payment gateway configured, every payment is approved");
            Arc::new(MockPaymentGateway::approving())
        }
    };
    let payments = PaymentClient::new(
        gateway,
        PaymentClientConfig {
            timeout: Duration::from_millis(config.payment.timeout_ms),
            retry_attempts: config.payment.retry_attempts,
            retry_backoff: Duration::from_millis(config.payment.retry_backoff_ms),
        },
    );

    // Seat provisioning worker
    let (provisioning, provisioning_rx) = seat_provisioning_queue(config.booking.provisioning_queue_capacity);
    tokio::spawn(SeatProvisioner::new(store.clone(), config.booking.seats_per_row).run(provisioning_rx));

    if config.booking.reaper_interval_secs > 0 {
        let reaper = StaleSeatReaper::new(
            store.clone(),
            locks.clone(),
            Duration::from_secs(config.booking.reaper_interval_secs),
        );
        tokio::spawn(reaper.run());
    }

    let catalog = FlightCatalog::new(store.clone(), provisioning);
    let orchestrator = BookingOrchestrator::new(
        store,
        locks,
        payments,
        OrchestratorConfig {
            max_passengers_per_booking: config.booking.max_passengers_per_booking,
            ..OrchestratorConfig::default()
        },
    );

    let app = app(AppState::new(catalog, orchestrator));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
