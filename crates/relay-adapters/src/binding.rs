use async_trait::async_trait;
use relay_core::{
    Address, BindingFactory, ChainClient, CompleteCommitmentMessage, ContractBinding,
    InitialCommitmentMessage, RelayError, RelayResult, TransactOpts, TxHandle,
    UnsignedTransaction, LIGHT_CLIENT_BRIDGE_CONTRACT_ID,
};
use serde::Serialize;
use std::sync::Arc;

pub const NEW_SIGNATURE_COMMITMENT: &str =
    "newSignatureCommitment(bytes,uint256[],bytes,address,bytes32[])";
pub const COMPLETE_SIGNATURE_COMMITMENT: &str =
    "completeSignatureCommitment(uint256,bytes,bytes[],uint256[],address[],bytes32[][])";

/// First four bytes of the blake3 digest of a call signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = blake3::hash(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest.as_bytes()[..4]);
    out
}

/// Selector followed by the JSON-encoded call arguments.
pub fn encode_call<T: Serialize>(signature: &str, args: &T) -> RelayResult<Vec<u8>> {
    let mut data = selector(signature).to_vec();
    serde_json::to_writer(&mut data, args)
        .map_err(|e| RelayError::Binding(format!("cannot encode {signature}: {e}")))?;
    Ok(data)
}

/// Binding for the light-client bridge contract on the destination chain.
pub struct LightClientBridgeBinding {
    address: Address,
    client: Arc<dyn ChainClient>,
}

impl LightClientBridgeBinding {
    pub fn new(address: Address, client: Arc<dyn ChainClient>) -> Self {
        Self { address, client }
    }

    async fn transact(&self, opts: &TransactOpts, data: Vec<u8>) -> RelayResult<TxHandle> {
        if opts.context.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        let nonce = self
            .client
            .pending_nonce(&opts.from)
            .await
            .map_err(|e| self.failed(e))?;
        let signed = opts
            .sign(UnsignedTransaction {
                nonce,
                to: self.address,
                gas_limit: opts.gas_limit,
                data,
            })?;

        tokio::select! {
            biased;
            _ = opts.context.cancelled() => Err(RelayError::Cancelled),
            sent = self.client.send_transaction(signed) => sent.map_err(|e| self.failed(e)),
        }
    }

    fn failed(&self, err: RelayError) -> RelayError {
        match err {
            err @ (RelayError::Cancelled | RelayError::Signing(_)) => err,
            other => RelayError::submission(LIGHT_CLIENT_BRIDGE_CONTRACT_ID, other.to_string()),
        }
    }
}

#[async_trait]
impl ContractBinding for LightClientBridgeBinding {
    fn address(&self) -> Address {
        self.address
    }

    async fn submit_initial(
        &self,
        opts: &TransactOpts,
        message: &InitialCommitmentMessage,
    ) -> RelayResult<TxHandle> {
        let args = (
            hex::encode(&message.payload),
            hex::encode(&message.validator_claims_bitfield),
            hex::encode(&message.validator_signature_commitment),
            hex::encode(&message.validator_public_key),
            message
                .validator_public_key_merkle_proof
                .iter()
                .map(hex::encode)
                .collect::<Vec<_>>(),
        );
        let data = encode_call(NEW_SIGNATURE_COMMITMENT, &args)?;
        self.transact(opts, data).await
    }

    async fn submit_complete(
        &self,
        opts: &TransactOpts,
        message: &CompleteCommitmentMessage,
    ) -> RelayResult<TxHandle> {
        let args = (
            message.id,
            hex::encode(&message.payload),
            message
                .random_signature_commitments
                .iter()
                .map(hex::encode)
                .collect::<Vec<_>>(),
            &message.random_signature_bitfield_positions,
            message
                .random_validator_public_keys
                .iter()
                .map(hex::encode)
                .collect::<Vec<_>>(),
            message
                .random_public_key_merkle_proofs
                .iter()
                .map(|proof| proof.iter().map(hex::encode).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        );
        let data = encode_call(COMPLETE_SIGNATURE_COMMITMENT, &args)?;
        self.transact(opts, data).await
    }
}

/// Binds the light-client bridge at a configured address.
#[derive(Debug, Clone, Default)]
pub struct LightClientBridgeFactory;

impl BindingFactory for LightClientBridgeFactory {
    fn bind(
        &self,
        address: Address,
        client: Arc<dyn ChainClient>,
    ) -> RelayResult<Arc<dyn ContractBinding>> {
        if address.is_zero() {
            return Err(RelayError::Binding(
                "light-client bridge address must not be zero".to_string(),
            ));
        }
        Ok(Arc::new(LightClientBridgeBinding::new(address, client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryChainClient;
    use crate::connection::LocalKeyConnection;
    use relay_core::{
        cancellation, CancellationContext, ChainConnection, CommitmentHash, SignedTransaction,
        SigningError,
    };
    use tokio::sync::Notify;

    fn opts_for(connection: Arc<LocalKeyConnection>, context: CancellationContext) -> TransactOpts {
        TransactOpts {
            from: connection.identity(),
            signer: Arc::new(move |account: &Address, transaction: UnsignedTransaction| {
                connection.sign(account, transaction)
            }),
            context,
            gas_limit: 5_000_000,
        }
    }

    fn initial() -> InitialCommitmentMessage {
        InitialCommitmentMessage {
            commitment_hash: CommitmentHash([4; 32]),
            payload: b"payload".to_vec(),
            validator_claims_bitfield: vec![0b11],
            validator_signature_commitment: vec![1; 65],
            validator_public_key: vec![2; 32],
            validator_public_key_merkle_proof: vec![[3; 32]],
        }
    }

    #[test]
    fn selectors_differ_per_call() {
        assert_ne!(
            selector(NEW_SIGNATURE_COMMITMENT),
            selector(COMPLETE_SIGNATURE_COMMITMENT)
        );
        let data = encode_call(NEW_SIGNATURE_COMMITMENT, &(1u8, "x")).unwrap();
        assert_eq!(&data[..4], &selector(NEW_SIGNATURE_COMMITMENT));
        assert_eq!(&data[4..], br#"[1,"x"]"#);
    }

    #[tokio::test]
    async fn submit_initial_sends_signed_call_to_bridge() {
        let client = Arc::new(InMemoryChainClient::new());
        let connection = Arc::new(LocalKeyConnection::generate(client.clone()));
        let bridge = LightClientBridgeBinding::new(Address([0xbb; 20]), client.clone());

        let opts = opts_for(connection.clone(), CancellationContext::never());
        let handle = bridge.submit_initial(&opts, &initial()).await.unwrap();

        let submitted = client.submitted();
        assert_eq!(submitted.len(), 1);
        let (recorded, tx) = &submitted[0];
        assert_eq!(*recorded, handle);
        assert_eq!(tx.transaction.to, Address([0xbb; 20]));
        assert_eq!(tx.transaction.gas_limit, 5_000_000);
        assert_eq!(&tx.transaction.data[..4], &selector(NEW_SIGNATURE_COMMITMENT));
    }

    #[tokio::test]
    async fn cancelled_context_submits_nothing() {
        let client = Arc::new(InMemoryChainClient::new());
        let connection = Arc::new(LocalKeyConnection::generate(client.clone()));
        let bridge = LightClientBridgeBinding::new(Address([0xbb; 20]), client.clone());

        let (handle, ctx) = cancellation();
        handle.cancel();
        let err = bridge
            .submit_initial(&opts_for(connection, ctx), &initial())
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(client.submitted_count(), 0);
    }

    #[tokio::test]
    async fn node_rejection_is_a_submission_error() {
        let client = Arc::new(InMemoryChainClient::rejecting());
        let connection = Arc::new(LocalKeyConnection::generate(client.clone()));
        let bridge = LightClientBridgeBinding::new(Address([0xbb; 20]), client);

        let err = bridge
            .submit_initial(&opts_for(connection, CancellationContext::never()), &initial())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Submission { ref contract, .. } if contract == LIGHT_CLIENT_BRIDGE_CONTRACT_ID));
    }

    fn initial_with_payload(payload: &[u8]) -> InitialCommitmentMessage {
        InitialCommitmentMessage {
            payload: payload.to_vec(),
            ..initial()
        }
    }

    #[tokio::test]
    async fn call_data_carries_the_commitment_payload() {
        let client = Arc::new(InMemoryChainClient::new());
        let connection = Arc::new(LocalKeyConnection::generate(client.clone()));
        let bridge = LightClientBridgeBinding::new(Address([0xbb; 20]), client.clone());
        let opts = opts_for(connection, CancellationContext::never());

        bridge
            .submit_initial(&opts, &initial_with_payload(b"AAAA"))
            .await
            .unwrap();
        bridge
            .submit_initial(&opts, &initial_with_payload(b"ZZZZ"))
            .await
            .unwrap();

        let submitted = client.submitted();
        let first = &submitted[0].1.transaction.data;
        let second = &submitted[1].1.transaction.data;
        assert_ne!(first, second);
        let args: serde_json::Value = serde_json::from_slice(&first[4..]).unwrap();
        assert_eq!(args[0], hex::encode(b"AAAA"));
    }

    /// Accepts the nonce query, then never answers the broadcast.
    #[derive(Default)]
    struct StalledClient {
        entered: Notify,
    }

    #[async_trait]
    impl ChainClient for StalledClient {
        async fn pending_nonce(&self, _account: &Address) -> RelayResult<u64> {
            Ok(0)
        }

        async fn send_transaction(&self, _tx: SignedTransaction) -> RelayResult<TxHandle> {
            self.entered.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_broadcast() {
        let client = Arc::new(StalledClient::default());
        let connection = Arc::new(LocalKeyConnection::generate(client.clone()));
        let bridge = LightClientBridgeBinding::new(Address([0xbb; 20]), client.clone());
        let (handle, ctx) = cancellation();
        let opts = opts_for(connection, ctx);
        let initial = initial();

        let (result, ()) = tokio::join!(bridge.submit_initial(&opts, &initial), async {
            client.entered.notified().await;
            handle.cancel();
        });
        assert!(matches!(result, Err(RelayError::Cancelled)));
    }

    #[tokio::test]
    async fn signing_failure_keeps_its_class() {
        let client = Arc::new(InMemoryChainClient::new());
        let connection = Arc::new(LocalKeyConnection::generate(client.clone()));
        let bridge = LightClientBridgeBinding::new(Address([0xbb; 20]), client.clone());
        let mut opts = opts_for(connection, CancellationContext::never());
        opts.from = Address([0x77; 20]);

        let err = bridge.submit_initial(&opts, &initial()).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::Signing(SigningError::UnknownAccount(account)) if account == Address([0x77; 20])
        ));
        assert_eq!(client.submitted_count(), 0);
    }

    #[test]
    fn factory_rejects_zero_address() {
        let client: Arc<dyn ChainClient> = Arc::new(InMemoryChainClient::new());
        assert!(LightClientBridgeFactory
            .bind(Address([0; 20]), client.clone())
            .is_err());
        let bound = LightClientBridgeFactory
            .bind(Address([0xbb; 20]), client)
            .ok()
            .unwrap();
        assert_eq!(bound.address(), Address([0xbb; 20]));
    }
}
