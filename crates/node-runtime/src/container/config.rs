//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. TOML file named by `CC_CONFIG`
//! 3. Environment: `CC_SECRET_KEY`, `CC_PUBLIC_IP`, `CC_P2P_PORT`,
//!    `CC_RPC_PORT`, plus the telemetry variables
//!
//! [`NodeConfig::validate`] runs before anything starts; a bad value stops
//! the node.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use cc_01_validator_registry::{AuthPenaltyConfig, FieldLimits, RegistryConfig};
use cc_06_mempool::MempoolConfig;
use cc_08_consensus::{ConsensusConfig, ConsensusError};
use cc_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use shared_types::PayloadLimits;

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node identity.
    pub node: IdentityConfig,
    /// Listening ports.
    pub network: NetworkConfig,
    pub consensus: ConsensusConfig,
    pub mempool: MempoolConfig,
    pub registry: RegistryConfig,
    /// Per-IP authentication penalties.
    pub auth: AuthPenaltyConfig,
    /// Advertisement field length caps.
    pub field_limits: FieldLimits,
    /// Inbound payload caps.
    pub limits: PayloadLimits,
    pub telemetry: TelemetryConfig,
}

/// Node identity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Hex secp256k1 secret. A fresh key is generated when absent.
    pub secret_key: Option<String>,
    /// Address peers reach this node on.
    pub public_ip: IpAddr,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            public_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// P2P listening port.
    pub p2p_port: u16,
    /// RPC listening port.
    pub rpc_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            p2p_port: 5001,
            rpc_port: 5002,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {var} has invalid value {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Defaults, then the `CC_CONFIG` file if set, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var("CC_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.with_env_overrides()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let mut config = self.with_overrides(|var| std::env::var(var).ok())?;
        config.telemetry = config.telemetry.with_env_overrides();
        Ok(config)
    }

    /// Apply identity and port overrides from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(secret) = lookup("CC_SECRET_KEY") {
            self.node.secret_key = Some(secret);
        }
        if let Some(value) = lookup("CC_PUBLIC_IP") {
            self.node.public_ip = parse_env("CC_PUBLIC_IP", value)?;
        }
        if let Some(value) = lookup("CC_P2P_PORT") {
            self.network.p2p_port = parse_env("CC_P2P_PORT", value)?;
        }
        if let Some(value) = lookup("CC_RPC_PORT") {
            self.network.rpc_port = parse_env("CC_RPC_PORT", value)?;
        }
        Ok(self)
    }

    /// Fail fast on values no subsystem can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.consensus.validate()?;

        let mempool = &self.mempool;
        if mempool.max_entries == 0 || mempool.max_size_bytes == 0 || mempool.max_per_sender == 0 {
            return Err(ConfigError::Invalid("mempool caps must be positive".into()));
        }
        if mempool.max_tx_age_secs <= 0 || mempool.max_future_skew_secs < 0 {
            return Err(ConfigError::Invalid("mempool staleness window must be positive".into()));
        }
        if !(mempool.eviction_target_ratio > 0.0 && mempool.eviction_target_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "mempool.eviction_target_ratio {} outside (0, 1]",
                mempool.eviction_target_ratio
            )));
        }
        if mempool.eviction_interval_secs == 0 {
            return Err(ConfigError::Invalid("mempool.eviction_interval_secs must be positive".into()));
        }

        let registry = &self.registry;
        if registry.fail_threshold == 0 || registry.fork_choice_fail_threshold < registry.fail_threshold {
            return Err(ConfigError::Invalid(format!(
                "registry fail thresholds invalid: standard {}, fork choice {}",
                registry.fail_threshold, registry.fork_choice_fail_threshold
            )));
        }
        if registry.max_broadcast_list == 0
            || registry.max_validators == 0
            || registry.cleanup_interval_secs == 0
            || registry.gossip_interval_secs == 0
        {
            return Err(ConfigError::Invalid(
                "registry caps, cleanup and gossip intervals must be positive".into(),
            ));
        }

        let auth = &self.auth;
        if auth.ban_after == 0 || auth.rate_limit_after == 0 || auth.ban_duration_secs <= 0 {
            return Err(ConfigError::Invalid("auth penalty thresholds must be positive".into()));
        }

        let limits = &self.limits;
        if [
            limits.max_block_bytes,
            limits.max_transaction_bytes,
            limits.max_json_bytes,
            limits.max_depth,
            limits.max_collection_elements,
        ]
        .contains(&0)
        {
            return Err(ConfigError::Invalid("payload limits must be positive".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.consensus.approval_quorum, 0.51);
        assert_eq!(config.registry.max_broadcast_list, 2000);
        assert_eq!(config.node.public_ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            [consensus]
            approval_window_ms = 5000

            [mempool]
            max_entries = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.consensus.approval_window_ms, 5000);
        assert_eq!(config.consensus.proof_collection_time_ms, 7000);
        assert_eq!(config.mempool.max_entries, 50);
        assert_eq!(config.registry, RegistryConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[node]\npublic_ip = \"10.1.2.3\"").unwrap();
        let config = NodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.node.public_ip, "10.1.2.3".parse::<IpAddr>().unwrap());

        assert!(matches!(
            NodeConfig::from_file("/nonexistent/castchain.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [("CC_PUBLIC_IP", "192.168.1.9"), ("CC_P2P_PORT", "7000")]
            .into_iter()
            .collect();
        let config = NodeConfig::default()
            .with_overrides(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.node.public_ip, "192.168.1.9".parse::<IpAddr>().unwrap());
        assert_eq!(config.network.p2p_port, 7000);
        assert_eq!(config.network.rpc_port, 5002);
    }

    #[test]
    fn test_bad_override_rejected() {
        let err = NodeConfig::default()
            .with_overrides(|var| (var == "CC_RPC_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "CC_RPC_PORT", .. }));
    }

    #[test]
    fn test_validate_fails_fast() {
        let mut config = NodeConfig::default();
        config.consensus.block_time_min_secs = 100;
        assert!(matches!(config.validate(), Err(ConfigError::Consensus(_))));

        let mut config = NodeConfig::default();
        config.mempool.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.limits.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.registry.fork_choice_fail_threshold = 1;
        assert!(config.validate().is_err());
    }
}
