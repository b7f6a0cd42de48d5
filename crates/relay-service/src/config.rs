//! Configuration for relayd

use relay_core::{RelayWriterConfig, DEFAULT_GAS_LIMIT};
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `RELAY_DESTINATION__GAS_LIMIT`.
pub const ENV_PREFIX: &str = "RELAY";

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayServiceConfig {
    /// Destination chain and bridge contract
    #[serde(default)]
    pub destination: DestinationConfig,

    /// Relay channel sizing
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Submission signing key
    #[serde(default)]
    pub signer: SignerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Light-client bridge contract address, hex encoded
    #[serde(default = "default_bridge")]
    pub light_client_bridge: String,

    /// Gas ceiling per submission
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            light_client_bridge: default_bridge(),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

/// Bounded channel capacities between the observer, the writer and the feedback sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_capacity")]
    pub inbound_capacity: usize,

    #[serde(default = "default_capacity")]
    pub outbound_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: default_capacity(),
            outbound_capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerConfig {
    /// 32-byte Ed25519 secret, hex encoded. Empty means an ephemeral key.
    #[serde(default)]
    pub secret_key_hex: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_bridge() -> String {
    "0x0000000000000000000000000000000000000000".to_string()
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

fn default_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelayServiceConfig {
    /// Load configuration: defaults, then the optional file, then `RELAY_*` variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        Self::load_from(path, None)
    }

    /// Like [`load`](Self::load) but reads variables from `env` instead of the process
    /// environment when given.
    pub fn load_from(
        path: Option<&str>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&RelayServiceConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        builder.build()?.try_deserialize()
    }

    pub fn writer(&self) -> RelayWriterConfig {
        RelayWriterConfig {
            light_client_bridge: self.destination.light_client_bridge.clone(),
            gas_limit: self.destination.gas_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = RelayServiceConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(config, RelayServiceConfig::default());
        assert_eq!(config.destination.gas_limit, 5_000_000);
        assert_eq!(config.channels.inbound_capacity, 64);
        assert!(config.signer.secret_key_hex.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let config = RelayServiceConfig::load_from(
            None,
            env(&[
                (
                    "RELAY_DESTINATION__LIGHT_CLIENT_BRIDGE",
                    "0x00000000000000000000000000000000000000bb",
                ),
                ("RELAY_DESTINATION__GAS_LIMIT", "750000"),
                ("RELAY_CHANNELS__OUTBOUND_CAPACITY", "4"),
                ("RELAY_LOGGING__JSON", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config.destination.light_client_bridge,
            "0x00000000000000000000000000000000000000bb"
        );
        assert_eq!(config.destination.gas_limit, 750_000);
        assert_eq!(config.channels.outbound_capacity, 4);
        assert_eq!(config.channels.inbound_capacity, 64);
        assert!(config.logging.json);

        let writer = config.writer();
        assert_eq!(writer.gas_limit, 750_000);
        assert_eq!(writer.light_client_bridge_address().unwrap().0[19], 0xbb);
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let config =
            RelayServiceConfig::load_from(Some("/nonexistent/relayd"), env(&[])).unwrap();
        assert_eq!(config.destination, DestinationConfig::default());
    }
}
