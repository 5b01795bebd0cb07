//! HTTP API for transaction preparation, health checks and status

use crate::chain::{ChainContext, ChainRegistry, StaticChainContext};
use crate::config::ApiConfig;
use crate::error::{PrepError, PrepResult};
use crate::status::{NetworkHealth, NetworkStatus};
use crate::tx::{
    sufficient_balance, BufferedGas, CanonicalTransaction, GasBufferer, TransactionParams,
    TransactionPreparer,
};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ChainRegistry>,
    pub preparer: Arc<TransactionPreparer>,
    pub status: watch::Receiver<NetworkStatus>,
    pub started_at: Instant,
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, state: AppState) -> PrepResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PrepError::Config(format!("cannot bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| PrepError::Internal(e.to_string()))?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/status", get(get_status))
        .route("/chains", get(get_chains))
        .route("/v1/transactions/prepare", post(prepare_transaction))
        .route("/v1/gas/buffer", post(buffer_gas))
        .route("/v1/balance/check", post(check_balance))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - a status observation exists and the network is up
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let network = state.status.borrow().health;
    let ready = !state.registry.is_empty() && matches!(network, Some(h) if h != NetworkHealth::Down);

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(ReadinessResponse {
            ready,
            network,
            chains: state.registry.chain_ids().len(),
        }),
    )
}

/// Current network status and service uptime
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let network = state.status.borrow().clone();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        network,
        chains: state.registry.chain_ids(),
    })
}

/// Configured chains
async fn get_chains(State(state): State<AppState>) -> impl IntoResponse {
    let chains = state
        .registry
        .chain_ids()
        .into_iter()
        .filter_map(|id| state.registry.get(id).ok())
        .map(|entry| ChainInfo {
            chain_id: entry.chain_id().unwrap_or_default(),
            name: entry.name().to_string(),
            block_gas_limit: entry.block_gas_limit(),
        })
        .collect();
    Json(ChainsResponse { chains })
}

/// Prepare a transaction: buffer the gas estimate, verify the balance and
/// return the canonical form
async fn prepare_transaction(
    State(state): State<AppState>,
    Json(request): Json<PrepareRequest>,
) -> Result<Json<PrepareResponse>, ApiError> {
    let ctx = resolve_context(
        &state,
        request.chain_id,
        request.block_gas_limit,
        request.transaction.chain_id,
    )?;

    let prepared = state.preparer.prepare(
        ctx.as_ref(),
        &request.transaction,
        &request.balance,
        &request.estimated_gas,
    )?;

    crate::metrics::record_tx_prepared(prepared.transaction.chain_id());
    Ok(Json(PrepareResponse {
        transaction: prepared.transaction,
        gas_limit: prepared.gas_limit,
        max_cost: prepared.max_cost,
        capped: prepared.capped,
    }))
}

/// Buffer a gas estimate against a block gas limit
async fn buffer_gas(
    State(state): State<AppState>,
    Json(request): Json<BufferRequest>,
) -> Result<Json<BufferResponse>, ApiError> {
    let block_gas_limit = match request.block_gas_limit {
        Some(limit) => limit,
        None => {
            let chain_id = request.chain_id.ok_or_else(|| {
                PrepError::InvalidParameter(
                    "either chainId or blockGasLimit is required".to_string(),
                )
            })?;
            state.registry.get(chain_id)?.block_gas_limit()
        }
    };

    let buffered = match request.multiplier {
        Some(multiplier) => {
            GasBufferer::new(multiplier)?.add_gas_buffer(&request.estimated_gas, &block_gas_limit)?
        }
        None => state
            .preparer
            .bufferer()
            .add_gas_buffer(&request.estimated_gas, &block_gas_limit)?,
    };

    crate::metrics::record_buffer_outcome(&buffered);
    Ok(Json(BufferResponse {
        gas_limit: buffered.to_hex(),
        outcome: match buffered {
            BufferedGas::Buffered(_) => "buffered",
            BufferedGas::Capped(_) => "capped",
            BufferedGas::Oversized(_) => "oversized",
        },
    }))
}

/// Check whether a balance covers a transaction's maximum cost
async fn check_balance(
    State(_state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let sufficient = sufficient_balance(&request.transaction, &request.balance)?;
    let max_cost = crate::tx::max_transaction_cost(&request.transaction)?;

    crate::metrics::record_balance_check(sufficient);
    Ok(Json(CheckResponse {
        sufficient,
        max_cost: format!("{:#x}", max_cost),
    }))
}

/// Pick the chain context for a request: an explicit block gas limit wins,
/// otherwise the registry entry for the selected chain.
fn resolve_context(
    state: &AppState,
    chain_id: Option<u64>,
    block_gas_limit: Option<String>,
    tx_chain_id: Option<u64>,
) -> Result<Arc<dyn ChainContext>, ApiError> {
    let selected = chain_id.or(tx_chain_id);
    if let Some(limit) = block_gas_limit {
        return Ok(Arc::new(StaticChainContext {
            chain_id: selected,
            block_gas_limit: limit,
        }));
    }
    let chain_id = selected.ok_or_else(|| {
        PrepError::InvalidParameter("either chainId or blockGasLimit is required".to_string())
    })?;
    Ok(state.registry.get(chain_id)?)
}

// Error mapping

#[derive(Debug)]
struct ApiError(PrepError);

impl From<PrepError> for ApiError {
    fn from(err: PrepError) -> Self {
        Self(err)
    }
}

fn classify(err: &PrepError) -> (StatusCode, &'static str) {
    match err {
        PrepError::Parse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
        PrepError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "invalid_parameter"),
        PrepError::Overflow(_) => (StatusCode::BAD_REQUEST, "overflow"),
        PrepError::InsufficientBalance { .. } => {
            (StatusCode::PAYMENT_REQUIRED, "insufficient_balance")
        }
        PrepError::OversizedEstimate { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "oversized_estimate")
        }
        PrepError::ChainNotFound { .. } => (StatusCode::NOT_FOUND, "chain_not_found"),
        PrepError::Status(_) => (StatusCode::BAD_GATEWAY, "status_unavailable"),
        PrepError::Config(_) | PrepError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, kind) = classify(&self.0);
        if self.0.is_rejection() {
            crate::metrics::record_tx_rejected(kind);
        }
        (
            code,
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

// Request and response types

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrepareRequest {
    transaction: TransactionParams,
    balance: String,
    estimated_gas: String,
    #[serde(default)]
    chain_id: Option<u64>,
    #[serde(default)]
    block_gas_limit: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrepareResponse {
    transaction: CanonicalTransaction,
    gas_limit: String,
    max_cost: String,
    capped: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferRequest {
    estimated_gas: String,
    #[serde(default)]
    chain_id: Option<u64>,
    #[serde(default)]
    block_gas_limit: Option<String>,
    #[serde(default)]
    multiplier: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferResponse {
    gas_limit: String,
    outcome: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest {
    transaction: TransactionParams,
    balance: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    sufficient: bool,
    max_cost: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    network: Option<NetworkHealth>,
    chains: usize,
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_seconds: u64,
    network: NetworkStatus,
    chains: Vec<u64>,
}

#[derive(Serialize)]
struct ChainInfo {
    chain_id: u64,
    name: String,
    block_gas_limit: String,
}

#[derive(Serialize)]
struct ChainsResponse {
    chains: Vec<ChainInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    const SAMPLE: &str = r#"
        [service]
        instance_id = "txgate-test"

        [api]
        host = "127.0.0.1"
        port = 0

        [metrics]
        enabled = false
        port = 0

        [status]
        url = "https://status.example.com/v1/status"

        [chains.kovan]
        chain_id = 42
        name = "kovan"
        block_gas_limit = "0x3d4c52"
        enabled = true
    "#;

    fn app_state() -> AppState {
        let settings = Settings::from_toml_str(SAMPLE).unwrap();
        let registry = Arc::new(ChainRegistry::from_settings(&settings).unwrap());
        let preparer = Arc::new(
            TransactionPreparer::new(settings.service.gas_buffer_multiplier).unwrap(),
        );
        let (_sender, receiver) = watch::channel(NetworkStatus {
            health: Some(NetworkHealth::Ok),
            message: None,
            checked_at: None,
            consecutive_failures: 0,
        });
        AppState {
            registry,
            preparer,
            status: receiver,
            started_at: Instant::now(),
        }
    }

    fn tx_params() -> TransactionParams {
        TransactionParams {
            from: "0x69ad465e0bab6504002ad58c744ed89c7da38525".to_string(),
            to: Some("0x70ad465e0bab6504002ad58c744ed89c7da38524".to_string()),
            value: Some("0x1".to_string()),
            gas: None,
            gas_price: Some("0x2".to_string()),
            data: None,
            nonce: Some("0x3".to_string()),
            chain_id: None,
        }
    }

    #[tokio::test]
    async fn prepare_resolves_chain_from_registry() {
        let request = PrepareRequest {
            transaction: tx_params(),
            balance: "0x500000".to_string(),
            estimated_gas: "0x16e360".to_string(),
            chain_id: Some(42),
            block_gas_limit: None,
        };
        let Json(response) = prepare_transaction(State(app_state()), Json(request))
            .await
            .unwrap();
        assert_eq!(response.gas_limit, "0x225510");
        assert_eq!(response.transaction.chain_id(), Some(42));
    }

    #[tokio::test]
    async fn prepare_rejects_unknown_chain() {
        let request = PrepareRequest {
            transaction: tx_params(),
            balance: "0x500000".to_string(),
            estimated_gas: "0x16e360".to_string(),
            chain_id: Some(1),
            block_gas_limit: None,
        };
        let err = prepare_transaction(State(app_state()), Json(request))
            .await
            .err()
            .unwrap();
        assert_eq!(classify(&err.0).0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn buffer_reports_oversized_estimates() {
        let request = BufferRequest {
            estimated_gas: "0x16e360".to_string(),
            chain_id: None,
            block_gas_limit: Some("0x0f4240".to_string()),
            multiplier: None,
        };
        let Json(response) = buffer_gas(State(app_state()), Json(request))
            .await
            .unwrap();
        assert_eq!(response.outcome, "oversized");
        assert_eq!(response.gas_limit, "0x16e360");
    }

    #[tokio::test]
    async fn balance_check_returns_the_boolean() {
        let mut params = tx_params();
        params.gas = Some("0x2".to_string());
        params.gas_price = Some("0x3".to_string());
        let request = CheckRequest {
            transaction: params,
            balance: "0x7".to_string(),
        };
        let Json(response) = check_balance(State(app_state()), Json(request))
            .await
            .unwrap();
        assert!(response.sufficient);
        assert_eq!(response.max_cost, "0x7");
    }

    #[test]
    fn error_kinds_map_to_distinct_codes() {
        let insufficient = PrepError::InsufficientBalance {
            have: "0x1".to_string(),
            need: "0x2".to_string(),
        };
        assert_eq!(classify(&insufficient).0, StatusCode::PAYMENT_REQUIRED);

        let oversized = PrepError::OversizedEstimate {
            estimated: "0x2".to_string(),
            block_limit: "0x1".to_string(),
        };
        assert_eq!(classify(&oversized).0, StatusCode::UNPROCESSABLE_ENTITY);

        let parse = PrepError::Parse {
            field: "gas",
            value: "nope".to_string(),
        };
        assert_eq!(classify(&parse).0, StatusCode::BAD_REQUEST);
    }
}
