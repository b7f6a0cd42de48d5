use crate::connection::verify_transaction;
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{Address, ChainClient, RelayError, RelayResult, SignedTransaction, TxHandle};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct ChainState {
    nonces: HashMap<Address, u64>,
    submitted: Vec<(TxHandle, SignedTransaction)>,
}

/// Destination chain kept in process memory.
///
/// Accepts a transaction when its signature verifies and its nonce is the sender's next
/// one. Backs dry runs and end-to-end tests.
#[derive(Debug, Default)]
pub struct InMemoryChainClient {
    state: Mutex<ChainState>,
    rejecting: bool,
}

impl InMemoryChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain whose node refuses every broadcast.
    pub fn rejecting() -> Self {
        Self {
            rejecting: true,
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<(TxHandle, SignedTransaction)> {
        self.state.lock().submitted.clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.state.lock().submitted.len()
    }

    pub fn transaction_hash(signed: &SignedTransaction) -> TxHandle {
        TxHandle(*blake3::hash(&signed.encode()).as_bytes())
    }
}

#[async_trait]
impl ChainClient for InMemoryChainClient {
    async fn pending_nonce(&self, account: &Address) -> RelayResult<u64> {
        Ok(self.state.lock().nonces.get(account).copied().unwrap_or(0))
    }

    async fn send_transaction(&self, transaction: SignedTransaction) -> RelayResult<TxHandle> {
        if self.rejecting {
            return Err(RelayError::Client("node rejected transaction".to_string()));
        }
        verify_transaction(&transaction)?;

        let mut state = self.state.lock();
        let expected = state.nonces.get(&transaction.from).copied().unwrap_or(0);
        if transaction.transaction.nonce != expected {
            return Err(RelayError::Client(format!(
                "nonce {} for {} is stale, expected {expected}",
                transaction.transaction.nonce, transaction.from
            )));
        }
        state.nonces.insert(transaction.from, expected + 1);

        let handle = Self::transaction_hash(&transaction);
        tracing::trace!(tx = %handle, from = %transaction.from, nonce = expected, "Transaction accepted");
        state.submitted.push((handle, transaction));
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::LocalKeyConnection;
    use relay_core::{ChainConnection, UnsignedTransaction};
    use std::sync::Arc;

    fn unsigned(nonce: u64) -> UnsignedTransaction {
        UnsignedTransaction {
            nonce,
            to: Address([0x33; 20]),
            gas_limit: 21_000,
            data: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn accepts_sequential_nonces() {
        let client = Arc::new(InMemoryChainClient::new());
        let connection = LocalKeyConnection::generate(client.clone());
        let me = connection.identity();

        for _ in 0..3 {
            let nonce = client.pending_nonce(&me).await.unwrap();
            let signed = connection.sign(&me, unsigned(nonce)).unwrap();
            client.send_transaction(signed).await.unwrap();
        }
        assert_eq!(client.pending_nonce(&me).await.unwrap(), 3);
        assert_eq!(client.submitted_count(), 3);
    }

    #[tokio::test]
    async fn rejects_stale_nonce_and_bad_signature() {
        let client = Arc::new(InMemoryChainClient::new());
        let connection = LocalKeyConnection::generate(client.clone());
        let me = connection.identity();

        let stale = connection.sign(&me, unsigned(5)).unwrap();
        assert!(matches!(
            client.send_transaction(stale).await,
            Err(RelayError::Client(_))
        ));

        let mut forged = connection.sign(&me, unsigned(0)).unwrap();
        forged.signature[0] ^= 0xff;
        assert!(matches!(
            client.send_transaction(forged).await,
            Err(RelayError::Signing(_))
        ));
        assert_eq!(client.submitted_count(), 0);
    }

    #[tokio::test]
    async fn rejecting_node_refuses_everything() {
        let client = Arc::new(InMemoryChainClient::rejecting());
        let connection = LocalKeyConnection::generate(client.clone());
        let signed = connection.sign(&connection.identity(), unsigned(0)).unwrap();
        assert!(client.send_transaction(signed).await.is_err());
    }
}
