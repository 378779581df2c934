//! Vehicle Event Pipeline - Binary Entry Point
//!
//! Wires the event store, handler registry, channel and consumer together and
//! serves the ingestion API until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vehicle_events::api::{create_router, AppState};
use vehicle_events::channel::EventChannel;
use vehicle_events::config::AppConfig;
use vehicle_events::consumer::{EventConsumer, LoggingErrorSink};
use vehicle_events::handlers::register_all_handlers;
use vehicle_events::registry::HandlerRegistry;
use vehicle_events::store::EventLogStore;
use vehicle_events::telemetry::init_tracing;

/// How long the consumer may keep draining after the server stops
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level, &config.log_format);
    info!(version = vehicle_events::VERSION, "Starting vehicle event server");
    info!("Configuration: {:?}", config);

    if let Err(e) = run(config).await {
        error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(EventLogStore::open(config.store_path())?);
    let lines = store.compact()?;
    info!(records = lines, "Event store ready");
    let registry = register_all_handlers(HandlerRegistry::builder(), store.clone())?.build();
    info!(handlers = registry.handler_count(), "Handler registry ready");

    let (publisher, subscriptions) = EventChannel::open(&config.channel_config())?;

    let consumer = EventConsumer::new(
        Arc::new(registry),
        Arc::new(LoggingErrorSink),
        config.consumer_config(),
    );
    let token = CancellationToken::new();
    let mut consumer_task = tokio::spawn({
        let token = token.clone();
        async move { consumer.run(subscriptions, token).await }
    });

    let state = Arc::new(AppState::new(publisher, store));
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last publisher, so the consumer drains and returns
    info!("HTTP server stopped, draining event channel");
    let report = match tokio::time::timeout(DRAIN_TIMEOUT, &mut consumer_task).await {
        Ok(joined) => joined?,
        Err(_) => {
            warn!("Drain timed out, leaving remaining events for redelivery");
            token.cancel();
            consumer_task.await?
        }
    };

    info!(
        handled = report.handled,
        failed = report.failed,
        "Shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
