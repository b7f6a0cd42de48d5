use crate::binding::{BindingFactory, ContractBinding};
use crate::config::RelayWriterConfig;
use crate::connection::ChainConnection;
use crate::error::{RelayError, RelayResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry key of the light-client bridge contract.
pub const LIGHT_CLIENT_BRIDGE_CONTRACT_ID: &str = "lightclientbridge";

/// Contract bindings keyed by logical contract identifier.
///
/// Populated once before the write loop starts and shared read-only afterwards.
#[derive(Default)]
pub struct ContractRegistry {
    contracts: HashMap<String, Arc<dyn ContractBinding>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self {
            contracts: HashMap::new(),
        }
    }

    /// Binds the configured light-client bridge through `factory` and registers it.
    ///
    /// A malformed address or a failing factory aborts startup.
    pub fn bootstrap(
        config: &RelayWriterConfig,
        connection: &dyn ChainConnection,
        factory: &dyn BindingFactory,
    ) -> RelayResult<Self> {
        let address = config.light_client_bridge_address()?;
        let contract = factory.bind(address, connection.client())?;

        let mut registry = Self::new();
        registry.register(LIGHT_CLIENT_BRIDGE_CONTRACT_ID, contract);
        tracing::info!(
            contract = LIGHT_CLIENT_BRIDGE_CONTRACT_ID,
            address = %address,
            "Registered contract binding"
        );
        Ok(registry)
    }

    pub fn register(&mut self, id: impl Into<String>, contract: Arc<dyn ContractBinding>) {
        self.contracts.insert(id.into(), contract);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ContractBinding>> {
        self.contracts.get(id).cloned()
    }

    pub fn resolve(&self, id: &str) -> RelayResult<Arc<dyn ContractBinding>> {
        self.get(id)
            .ok_or_else(|| RelayError::UnknownContract(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::TransactOpts;
    use crate::connection::ChainClient;
    use crate::error::SigningError;
    use crate::types::{
        Address, CompleteCommitmentMessage, InitialCommitmentMessage, SignedTransaction,
        TxHandle, UnsignedTransaction,
    };
    use async_trait::async_trait;

    struct NullClient;

    #[async_trait]
    impl ChainClient for NullClient {
        async fn pending_nonce(&self, _account: &Address) -> RelayResult<u64> {
            Ok(0)
        }

        async fn send_transaction(&self, _tx: SignedTransaction) -> RelayResult<TxHandle> {
            Ok(TxHandle([1u8; 32]))
        }
    }

    struct NullConnection;

    impl ChainConnection for NullConnection {
        fn identity(&self) -> Address {
            Address([0xaa; 20])
        }

        fn sign(
            &self,
            account: &Address,
            _tx: UnsignedTransaction,
        ) -> Result<SignedTransaction, SigningError> {
            Err(SigningError::UnknownAccount(*account))
        }

        fn client(&self) -> Arc<dyn ChainClient> {
            Arc::new(NullClient)
        }
    }

    struct DummyBinding {
        address: Address,
    }

    #[async_trait]
    impl ContractBinding for DummyBinding {
        fn address(&self) -> Address {
            self.address
        }

        async fn submit_initial(
            &self,
            _opts: &TransactOpts,
            _message: &InitialCommitmentMessage,
        ) -> RelayResult<TxHandle> {
            Ok(TxHandle([2u8; 32]))
        }

        async fn submit_complete(
            &self,
            _opts: &TransactOpts,
            _message: &CompleteCommitmentMessage,
        ) -> RelayResult<TxHandle> {
            Ok(TxHandle([3u8; 32]))
        }
    }

    struct DummyFactory;

    impl BindingFactory for DummyFactory {
        fn bind(
            &self,
            address: Address,
            _client: Arc<dyn ChainClient>,
        ) -> RelayResult<Arc<dyn ContractBinding>> {
            if address.is_zero() {
                return Err(RelayError::Binding("zero address".to_string()));
            }
            Ok(Arc::new(DummyBinding { address }))
        }
    }

    #[test]
    fn bootstrap_registers_light_client_bridge() {
        let config = RelayWriterConfig::new("0x1111111111111111111111111111111111111111");
        let registry =
            ContractRegistry::bootstrap(&config, &NullConnection, &DummyFactory).unwrap();
        assert_eq!(registry.len(), 1);
        let contract = registry.resolve(LIGHT_CLIENT_BRIDGE_CONTRACT_ID).unwrap();
        assert_eq!(contract.address(), Address([0x11; 20]));
    }

    #[test]
    fn malformed_address_aborts_bootstrap() {
        let config = RelayWriterConfig::new("0xnothex");
        let err = ContractRegistry::bootstrap(&config, &NullConnection, &DummyFactory)
            .err()
            .unwrap();
        assert!(matches!(err, RelayError::InvalidAddress { .. }));
    }

    #[test]
    fn factory_failure_aborts_bootstrap() {
        let config = RelayWriterConfig::new(format!("0x{}", "00".repeat(20)));
        let err = ContractRegistry::bootstrap(&config, &NullConnection, &DummyFactory)
            .err()
            .unwrap();
        assert!(matches!(err, RelayError::Binding(_)));
    }

    #[test]
    fn empty_registry_reports_unknown_contract() {
        let registry = ContractRegistry::new();
        assert!(registry.is_empty());
        let err = registry.resolve(LIGHT_CLIENT_BRIDGE_CONTRACT_ID).err().unwrap();
        assert_eq!(err.to_string(), "Unknown contract 'lightclientbridge'");
    }
}
