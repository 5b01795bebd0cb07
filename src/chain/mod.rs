//! Chain configuration registry
//!
//! The preparation core never talks to a network client; it consumes a
//! [`ChainContext`] capability supplying the two live values it needs, a
//! chain id and a block gas limit. The registry holds one config-backed
//! entry per enabled chain, with the block gas limit updatable as fresher
//! values are observed.

use crate::config::{ChainConfig, Settings};
use crate::error::{PrepError, PrepResult};
use crate::units;

use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// The chain facts the preparation core depends on.
pub trait ChainContext: Send + Sync {
    /// Chain id to scope signatures to, if the context is network-bound.
    fn chain_id(&self) -> Option<u64>;
    /// Current block gas limit as a hex quantity.
    fn block_gas_limit(&self) -> String;
}

/// Fixed-value context for tests and embedding callers.
#[derive(Debug, Clone)]
pub struct StaticChainContext {
    pub chain_id: Option<u64>,
    pub block_gas_limit: String,
}

impl ChainContext for StaticChainContext {
    fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    fn block_gas_limit(&self) -> String {
        self.block_gas_limit.clone()
    }
}

/// A configured chain with its last observed block gas limit.
pub struct ChainEntry {
    config: ChainConfig,
    block_gas_limit: RwLock<String>,
}

impl ChainEntry {
    fn new(config: ChainConfig) -> PrepResult<Self> {
        units::parse_quantity("blockGasLimit", &config.block_gas_limit)?;
        let block_gas_limit = RwLock::new(config.block_gas_limit.clone());
        Ok(Self {
            config,
            block_gas_limit,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Replace the stored block gas limit with a fresher observation.
    pub fn set_block_gas_limit(&self, limit: &str) -> PrepResult<()> {
        units::parse_quantity("blockGasLimit", limit)?;
        *self
            .block_gas_limit
            .write()
            .unwrap_or_else(|e| e.into_inner()) = limit.to_string();
        debug!(
            chain_id = self.config.chain_id,
            block_gas_limit = limit,
            "block gas limit updated"
        );
        Ok(())
    }
}

impl ChainContext for ChainEntry {
    fn chain_id(&self) -> Option<u64> {
        Some(self.config.chain_id)
    }

    fn block_gas_limit(&self) -> String {
        self.block_gas_limit
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// All enabled chains, indexed by chain id.
pub struct ChainRegistry {
    chains: DashMap<u64, Arc<ChainEntry>>,
}

impl ChainRegistry {
    /// Build the registry from validated settings.
    pub fn from_settings(settings: &Settings) -> PrepResult<Self> {
        let chains = DashMap::new();
        for (name, chain_config) in settings.enabled_chains() {
            info!(
                "Registering chain {} (ID: {})",
                chain_config.name, chain_config.chain_id
            );
            let entry = ChainEntry::new(chain_config.clone()).map_err(|e| {
                PrepError::Config(format!("chain {}: {}", name, e))
            })?;
            chains.insert(chain_config.chain_id, Arc::new(entry));
        }
        Ok(Self { chains })
    }

    /// Get the entry for a specific chain.
    pub fn get(&self, chain_id: u64) -> PrepResult<Arc<ChainEntry>> {
        self.chains
            .get(&chain_id)
            .map(|e| e.clone())
            .ok_or(PrepError::ChainNotFound { chain_id })
    }

    /// All registered chain ids.
    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
