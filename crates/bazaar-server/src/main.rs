//! # Bazaar node
//!
//! Main binary that wires the channel messaging engine:
//! - channel store (SQLite through sqlx)
//! - local wallet keys, the relay and the business-object directory
//! - outbound send and the inbound processor behind the HTTP routes
//! - retry and cleanup pollers
//!
//! Notification events are only logged here; a notification transport
//! subscribes to the same broadcast channel when embedded.

mod routes;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bazaar_common::notification::NotificationEvent;
use bazaar_db::Database;
use bazaar_delivery::{
    directory::HttpDirectory, transport::HttpTransport, ChannelCleanup, ChannelService, Clock,
    Fanout, InboundPipeline, InboundProcessor, KeyManager, LocalWallet, OutboundPipeline, Poller,
    SizeLimits, SystemClock, WaitingRetry,
};
use clap::Parser;
use tokio::sync::broadcast;

use routes::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "bazaar", version, about = "Bazaar channel messaging node")]
struct Args {
    /// Apply database migrations and exit.
    #[arg(long, env = "BAZAAR_MIGRATE_ONLY")]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = bazaar_common::config::init()?;

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("Starting Bazaar node v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;
    if args.migrate_only {
        tracing::info!("Migrations applied, exiting");
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // === Wallet keys ===
    // Load the wallet's identities from the store, or provision one on first run.
    let wallet = Arc::new(LocalWallet::new());
    let identities = KeyManager::new(db.clone())
        .load_into(&wallet, &config.wallet.name, clock.now_ms())
        .await?;
    for identity in &identities {
        tracing::info!(id = identity.id, address = %identity.address, "Identity ready");
    }

    // === Collaborators ===
    let directory = Arc::new(HttpDirectory::new(&config.directory)?);
    tracing::info!(directory = %config.directory.url, "Business-object directory configured");
    let relay = Arc::new(HttpTransport::new(&config.transport)?);
    tracing::info!(relay = %config.transport.relay_url, "Relay configured");

    // === Notification fan-out ===
    let (notify_tx, _) = broadcast::channel::<NotificationEvent>(1_024);
    let fanout = Fanout::new(db.clone(), notify_tx);
    let notify_task = tokio::spawn(log_notifications(fanout.subscribe()));

    // === Delivery pipelines ===
    let outbound = Arc::new(OutboundPipeline::new(
        db.clone(),
        wallet.clone(),
        relay,
        clock.clone(),
        SizeLimits::from_config(&config.transport),
        config.limits.max_message_length,
    ));
    let pipeline = InboundPipeline::new(db.clone(), wallet.clone(), directory.clone(), fanout, clock.clone());
    let processor = Arc::new(InboundProcessor::new(pipeline, db.clone(), clock.clone()));
    let service = Arc::new(ChannelService::new(db.clone(), directory));

    // === Pollers ===
    let retry = Poller::new(
        WaitingRetry::new(
            db.clone(),
            processor.clone(),
            clock.clone(),
            config.retry.batch_size,
            Duration::from_secs(config.retry.min_age_secs),
        ),
        Duration::from_secs(config.retry.interval_secs),
        clock.clone(),
    );
    let cleanup = Poller::new(
        ChannelCleanup::new(service),
        Duration::from_secs(config.cleanup.interval_secs),
        clock.clone(),
    );
    let (retry_handle, retry_task) = retry.spawn();
    let (cleanup_handle, cleanup_task) = cleanup.spawn();

    // === HTTP routes ===
    let router = build_router(AppState { db, outbound, processor });
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    // Pollers stop after their in-flight tick and sleep; don't wait out a long interval.
    retry_handle.stop();
    cleanup_handle.stop();
    if tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(retry_task, cleanup_task) })
        .await
        .is_err()
    {
        tracing::info!("Pollers still sleeping at exit");
    }
    notify_task.abort();

    Ok(())
}

/// Log every fan-out event until the broadcast channel closes.
async fn log_notifications(mut events: broadcast::Receiver<NotificationEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::info!(
                channel = %event.channel,
                channel_type = %event.channel_type,
                sender = %event.sender,
                identities = ?event.identities,
                "Channel notification"
            ),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Notification log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
