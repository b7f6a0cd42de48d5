use crate::error::RelayResult;
use crate::types::Address;
use serde::{Deserialize, Serialize};

/// Gas ceiling applied to every light-client bridge submission.
pub const DEFAULT_GAS_LIMIT: u64 = 5_000_000;

/// Relay writer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayWriterConfig {
    /// Deployed light-client bridge contract, hex encoded.
    pub light_client_bridge: String,

    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

impl RelayWriterConfig {
    pub fn new(light_client_bridge: impl Into<String>) -> Self {
        Self {
            light_client_bridge: light_client_bridge.into(),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    pub fn light_client_bridge_address(&self) -> RelayResult<Address> {
        Address::from_hex(&self.light_client_bridge)
    }
}

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}
