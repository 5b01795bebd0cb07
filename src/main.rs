//! txgate - Transaction preparation and gas estimation service
//!
//! Validates proposed transactions against account balances, normalizes
//! parameters into a canonical encodable form, and derives safe gas limits
//! by buffering naive estimates against the block gas limit.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{info, warn};

mod api;
mod chain;
mod config;
mod error;
mod metrics;
mod status;
mod tx;
mod units;

use chain::ChainRegistry;
use config::Settings;
use metrics::MetricsServer;
use status::StatusMonitor;
use tx::TransactionPreparer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting txgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} chains (instance {})",
        settings.enabled_chains().len(),
        settings.service.instance_id
    );

    // Build the chain registry
    let registry = Arc::new(ChainRegistry::from_settings(&settings)?);

    // Build the preparation pipeline
    let preparer = Arc::new(TransactionPreparer::new(
        settings.service.gas_buffer_multiplier,
    )?);

    // Start the status monitor
    let (monitor, status_rx) = StatusMonitor::new(&settings.status)?;
    let monitor_handle = tokio::spawn(monitor.run());
    info!("Status monitor polling {}", settings.status.url);

    // Initialize metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                tracing::error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start API server
    let api_handle = tokio::spawn({
        let state = api::AppState {
            registry: registry.clone(),
            preparer: preparer.clone(),
            status: status_rx.clone(),
            started_at: Instant::now(),
        };
        let api_config = settings.api.clone();
        async move {
            if let Err(e) = api::run_server(api_config, state).await {
                tracing::error!("API server error: {}", e);
            }
        }
    });

    // Health log loop
    let health_handle = tokio::spawn({
        let status_rx = status_rx.clone();
        let interval = settings.service.health_log_interval_secs;
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;

                let observed = status_rx.borrow().clone();
                match observed.health {
                    Some(status::NetworkHealth::Ok) => {}
                    Some(health) => warn!(?health, "network is not healthy"),
                    None => warn!("no network status observation yet"),
                }
                if observed.consecutive_failures > 0 {
                    warn!(
                        failures = observed.consecutive_failures,
                        "status polls are failing"
                    );
                }
            }
        }
    });

    info!("txgate is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Abort background tasks
    api_handle.abort();
    monitor_handle.abort();
    health_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("txgate stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,txgate=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
