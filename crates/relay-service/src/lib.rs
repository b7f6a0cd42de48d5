#![deny(unsafe_code)]

pub mod config;
pub mod pipe;
pub mod supervisor;

use crate::config::RelayServiceConfig;
use crate::supervisor::RelaySupervisor;
use relay_adapters::{
    InMemoryChainClient, JsonCommitmentBuilder, LightClientBridgeFactory, LocalKeyConnection,
};
use relay_core::{
    Address, ChainClient, ChainConnection, ContractRegistry, RelayError, RelayWriter,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("Relay task aborted: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Counters for one relay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_read: u64,
    pub records_reported: u64,
    pub transactions_submitted: usize,
}

/// A bootstrapped relay stream: signer, destination chain and bound bridge contract.
pub struct RelayService {
    config: RelayServiceConfig,
    chain: Arc<InMemoryChainClient>,
    connection: Arc<LocalKeyConnection>,
    contracts: Arc<ContractRegistry>,
}

impl RelayService {
    pub fn bootstrap(config: RelayServiceConfig) -> Result<Self, ServiceError> {
        Self::bootstrap_with(config, InMemoryChainClient::new())
    }

    /// Bootstraps against a specific destination chain.
    pub fn bootstrap_with(
        config: RelayServiceConfig,
        chain: InMemoryChainClient,
    ) -> Result<Self, ServiceError> {
        let chain = Arc::new(chain);
        let client: Arc<dyn ChainClient> = chain.clone();

        let connection = if config.signer.secret_key_hex.is_empty() {
            warn!("No signer secret configured, using an ephemeral key");
            LocalKeyConnection::generate(client)
        } else {
            LocalKeyConnection::from_secret_hex(&config.signer.secret_key_hex, client)?
        };
        let connection = Arc::new(connection);

        let contracts = ContractRegistry::bootstrap(
            &config.writer(),
            connection.as_ref(),
            &LightClientBridgeFactory,
        )?;

        Ok(Self {
            config,
            chain,
            connection,
            contracts: Arc::new(contracts),
        })
    }

    pub fn identity(&self) -> Address {
        self.connection.identity()
    }

    pub fn chain(&self) -> Arc<InMemoryChainClient> {
        Arc::clone(&self.chain)
    }

    /// Relays batches from `input` and writes reported records to `output`.
    ///
    /// Stops when the input is exhausted, when `shutdown` resolves, or when the writer fails.
    pub async fn run<R, W, S>(
        &self,
        input: R,
        output: W,
        shutdown: S,
    ) -> Result<RunSummary, ServiceError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let (messages_tx, messages_rx) = mpsc::channel(self.config.channels.inbound_capacity);
        let (feedback_tx, feedback_rx) = mpsc::channel(self.config.channels.outbound_capacity);

        let mut group = RelaySupervisor::new();
        let writer = RelayWriter::new(
            self.config.writer(),
            self.connection.clone(),
            Arc::new(JsonCommitmentBuilder),
            Arc::clone(&self.contracts),
            messages_rx,
            feedback_tx,
        );
        writer.start(group.context(), group.tasks());

        let reader = tokio::spawn(pipe::read_batches(input, messages_tx, group.context()));
        let printer = tokio::spawn(pipe::write_feedback(feedback_rx, output));
        info!(identity = %self.identity(), "Relay stream started");

        let outcome = group.run_until(shutdown).await;
        let batches_read = reader
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;
        let records_reported = printer
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;
        outcome?;

        let summary = RunSummary {
            batches_read,
            records_reported,
            transactions_submitted: self.chain.submitted_count(),
        };
        info!(
            batches = summary.batches_read,
            reported = summary.records_reported,
            submitted = summary.transactions_submitted,
            "Relay stream finished"
        );
        Ok(summary)
    }
}
