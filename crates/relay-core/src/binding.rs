use crate::cancel::CancellationContext;
use crate::connection::ChainClient;
use crate::error::{RelayResult, SigningError};
use crate::types::{
    Address, CompleteCommitmentMessage, InitialCommitmentMessage, SignedTransaction, TxHandle,
    UnsignedTransaction,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Signing callback handed to a contract binding for one submission.
pub type Signer = Arc<
    dyn Fn(&Address, UnsignedTransaction) -> Result<SignedTransaction, SigningError>
        + Send
        + Sync,
>;

/// Per-submission transaction options. Built fresh for every call and never stored.
#[derive(Clone)]
pub struct TransactOpts {
    pub from: Address,
    pub signer: Signer,
    pub context: CancellationContext,
    pub gas_limit: u64,
}

impl TransactOpts {
    pub fn sign(&self, transaction: UnsignedTransaction) -> Result<SignedTransaction, SigningError> {
        (self.signer)(&self.from, transaction)
    }
}

impl fmt::Debug for TransactOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactOpts")
            .field("from", &self.from)
            .field("gas_limit", &self.gas_limit)
            .field("cancelled", &self.context.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Bound reference to the deployed light-client bridge contract.
#[async_trait]
pub trait ContractBinding: Send + Sync {
    fn address(&self) -> Address;

    async fn submit_initial(
        &self,
        opts: &TransactOpts,
        message: &InitialCommitmentMessage,
    ) -> RelayResult<TxHandle>;

    async fn submit_complete(
        &self,
        opts: &TransactOpts,
        message: &CompleteCommitmentMessage,
    ) -> RelayResult<TxHandle>;
}

/// Constructs contract bindings at startup.
pub trait BindingFactory: Send + Sync {
    fn bind(
        &self,
        address: Address,
        client: Arc<dyn ChainClient>,
    ) -> RelayResult<Arc<dyn ContractBinding>>;
}
