//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transaction preparation outcomes
//! - Gas buffering decisions
//! - Status endpoint polling

use crate::error::PrepResult;
use crate::status::NetworkHealth;
use crate::tx::BufferedGas;

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Preparation metrics
    pub static ref TX_PREPARED: CounterVec = register_counter_vec!(
        "txgate_transactions_prepared_total",
        "Total transactions prepared",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_REJECTED: CounterVec = register_counter_vec!(
        "txgate_transactions_rejected_total",
        "Total transactions rejected by reason",
        &["reason"]
    ).unwrap();

    // Gas buffering metrics
    pub static ref GAS_BUFFER_OUTCOME: CounterVec = register_counter_vec!(
        "txgate_gas_buffer_outcomes_total",
        "Gas buffer outcomes (buffered, capped, oversized)",
        &["outcome"]
    ).unwrap();

    // Balance check metrics
    pub static ref BALANCE_CHECKS: CounterVec = register_counter_vec!(
        "txgate_balance_checks_total",
        "Balance checks by outcome",
        &["outcome"]
    ).unwrap();

    // Status polling metrics
    pub static ref STATUS_POLL_SUCCESS: CounterVec = register_counter_vec!(
        "txgate_status_polls_success_total",
        "Total successful status polls",
        &[]
    ).unwrap();

    pub static ref STATUS_POLL_FAILURE: CounterVec = register_counter_vec!(
        "txgate_status_polls_failure_total",
        "Total failed status polls",
        &[]
    ).unwrap();

    pub static ref NETWORK_STATUS: GaugeVec = register_gauge_vec!(
        "txgate_network_status",
        "Last observed network status (1 = current)",
        &["status"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> PrepResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

// Helper functions to record metrics

pub fn record_tx_prepared(chain_id: Option<u64>) {
    let label = chain_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unscoped".to_string());
    TX_PREPARED.with_label_values(&[&label]).inc();
}

pub fn record_tx_rejected(reason: &str) {
    TX_REJECTED.with_label_values(&[reason]).inc();
}

pub fn record_buffer_outcome(buffered: &BufferedGas) {
    let outcome = match buffered {
        BufferedGas::Buffered(_) => "buffered",
        BufferedGas::Capped(_) => "capped",
        BufferedGas::Oversized(_) => "oversized",
    };
    GAS_BUFFER_OUTCOME.with_label_values(&[outcome]).inc();
}

pub fn record_balance_check(sufficient: bool) {
    let outcome = if sufficient { "sufficient" } else { "insufficient" };
    BALANCE_CHECKS.with_label_values(&[outcome]).inc();
}

pub fn record_status_poll(success: bool) {
    if success {
        STATUS_POLL_SUCCESS.with_label_values(&[]).inc();
    } else {
        STATUS_POLL_FAILURE.with_label_values(&[]).inc();
    }
}

pub fn record_network_status(health: NetworkHealth) {
    for (label, current) in [
        ("ok", health == NetworkHealth::Ok),
        ("degraded", health == NetworkHealth::Degraded),
        ("down", health == NetworkHealth::Down),
    ] {
        NETWORK_STATUS
            .with_label_values(&[label])
            .set(if current { 1.0 } else { 0.0 });
    }
}
