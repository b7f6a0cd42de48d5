use crate::error::{RelayResult, SigningError};
use crate::types::{Address, SignedTransaction, TxHandle, UnsignedTransaction};
use async_trait::async_trait;
use std::sync::Arc;

/// Network session to the destination chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Next nonce to use for transactions sent by `account`.
    async fn pending_nonce(&self, account: &Address) -> RelayResult<u64>;

    /// Broadcasts a signed transaction. Returns as soon as the node accepts it.
    async fn send_transaction(&self, transaction: SignedTransaction) -> RelayResult<TxHandle>;
}

/// Signing identity plus network session for the destination chain.
///
/// The engine calls `sign` serially. Connections shared between several relay streams must
/// synchronize internally.
pub trait ChainConnection: Send + Sync {
    fn identity(&self) -> Address;

    fn sign(
        &self,
        account: &Address,
        transaction: UnsignedTransaction,
    ) -> Result<SignedTransaction, SigningError>;

    fn client(&self) -> Arc<dyn ChainClient>;
}
