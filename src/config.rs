//! Configuration management for txgate
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub status: StatusConfig,
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub instance_id: String,
    #[serde(default = "default_gas_buffer_multiplier")]
    pub gas_buffer_multiplier: f64,
    #[serde(default = "default_health_log_interval")]
    pub health_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Remote status document endpoint.
    pub url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    /// Block gas limit as a hex quantity, refreshed at runtime when a
    /// fresher observation arrives.
    pub block_gas_limit: String,
    pub enabled: bool,
}

fn default_gas_buffer_multiplier() -> f64 {
    crate::tx::DEFAULT_GAS_BUFFER_MULTIPLIER
}

fn default_health_log_interval() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    10
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("TXGATE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));
        Self::load_from(&config_path)
    }

    /// Load settings from a specific path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        Self::from_toml_str(&config_str)
    }

    /// Parse settings from a TOML document
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings = toml::from_str(&config_str)
            .with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        // At least one chain must be enabled
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        // A multiplier that cannot grow an estimate is a misconfiguration
        if !self.service.gas_buffer_multiplier.is_finite()
            || self.service.gas_buffer_multiplier <= 0.0
        {
            anyhow::bail!(
                "gas_buffer_multiplier must be positive, got {}",
                self.service.gas_buffer_multiplier
            );
        }

        if self.status.url.is_empty() {
            anyhow::bail!("Status endpoint URL must be configured");
        }
        if self.status.poll_interval_secs == 0 {
            anyhow::bail!("Status poll interval must be non-zero");
        }

        // Validate chain configurations
        for (name, chain) in &self.chains {
            if chain.enabled {
                crate::units::parse_quantity("blockGasLimit", &chain.block_gas_limit)
                    .map_err(|e| anyhow::anyhow!("Chain {}: {}", name, e))?;
            }
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains
            .iter()
            .filter(|(_, c)| c.enabled)
            .collect()
    }

    /// Get chain config by chain ID
    pub fn get_chain_by_id(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [service]
        instance_id = "txgate-test"

        [api]
        host = "127.0.0.1"
        port = 8080

        [metrics]
        enabled = false
        port = 9090

        [status]
        url = "https://status.example.com/v1/status"

        [chains.mainnet]
        chain_id = 1
        name = "mainnet"
        block_gas_limit = "0x1c9c380"
        enabled = true

        [chains.kovan]
        chain_id = 42
        name = "kovan"
        block_gas_limit = "0x3d4c52"
        enabled = false
    "#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn parses_sample_settings_with_defaults() {
        let settings = Settings::from_toml_str(SAMPLE).unwrap();
        assert_eq!(settings.service.instance_id, "txgate-test");
        assert_eq!(settings.service.gas_buffer_multiplier, 1.5);
        assert_eq!(settings.status.poll_interval_secs, 300);
        assert_eq!(settings.enabled_chains().len(), 1);
        assert_eq!(settings.get_chain_by_id(42).map(|c| c.enabled), Some(false));
    }

    #[test]
    fn rejects_settings_with_no_enabled_chain() {
        let disabled = SAMPLE.replace("enabled = true", "enabled = false");
        assert!(Settings::from_toml_str(&disabled).is_err());
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        let bad = SAMPLE.replace(
            "instance_id = \"txgate-test\"",
            "instance_id = \"txgate-test\"\n        gas_buffer_multiplier = 0.0",
        );
        assert!(Settings::from_toml_str(&bad).is_err());
    }

    #[test]
    fn rejects_malformed_block_gas_limit() {
        let bad = SAMPLE.replace("\"0x1c9c380\"", "\"4000000\"");
        assert!(Settings::from_toml_str(&bad).is_err());
    }

    #[test]
    fn loads_from_a_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.api.port, 8080);
    }
}
