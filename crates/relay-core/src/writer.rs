use crate::binding::{ContractBinding, TransactOpts};
use crate::builder::MessageBuilder;
use crate::cancel::CancellationContext;
use crate::config::RelayWriterConfig;
use crate::connection::ChainConnection;
use crate::error::{RelayError, RelayResult};
use crate::flow::{dispatch_action, DispatchAction};
use crate::registry::{ContractRegistry, LIGHT_CLIENT_BRIDGE_CONTRACT_ID};
use crate::types::{
    Address, CommitmentStatus, LifecycleRecord, RelayMessage, TxHandle, UnsignedTransaction,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Single-writer relay engine for one commitment stream.
///
/// Pulls batches from the inbound channel, dispatches every record on its lifecycle status,
/// and reports records it advanced on the feedback channel. Records are handled strictly in
/// arrival order, one submission at a time.
pub struct RelayWriter {
    config: RelayWriterConfig,
    connection: Arc<dyn ChainConnection>,
    builder: Arc<dyn MessageBuilder>,
    contracts: Arc<ContractRegistry>,
    messages: mpsc::Receiver<Vec<RelayMessage>>,
    feedback: mpsc::Sender<LifecycleRecord>,
}

impl RelayWriter {
    pub fn new(
        config: RelayWriterConfig,
        connection: Arc<dyn ChainConnection>,
        builder: Arc<dyn MessageBuilder>,
        contracts: Arc<ContractRegistry>,
        messages: mpsc::Receiver<Vec<RelayMessage>>,
        feedback: mpsc::Sender<LifecycleRecord>,
    ) -> Self {
        Self {
            config,
            connection,
            builder,
            contracts,
            messages,
            feedback,
        }
    }

    /// Spawns the write loop into the supervising task group.
    pub fn start(self, ctx: CancellationContext, tasks: &mut JoinSet<RelayResult<()>>) {
        tasks.spawn(self.write_loop(ctx));
    }

    /// Runs until `ctx` is cancelled or the inbound channel closes.
    ///
    /// Returns `Ok(())` when the producer closes the channel, `RelayError::Cancelled` after a
    /// cancellation drain, and `RelayError::InvalidMessage` when a non-commitment message
    /// arrives.
    pub async fn write_loop(mut self, ctx: CancellationContext) -> RelayResult<()> {
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return self.on_done().await,
                batch = self.messages.recv() => match batch {
                    Some(batch) => self.process_batch(&ctx, batch).await?,
                    None => {
                        info!("Relay message channel closed, writer exiting");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn on_done(&mut self) -> RelayResult<()> {
        info!("Shutting down relay writer...");
        // Producers may be blocked mid-send; keep receiving until they close the channel.
        while let Some(batch) = self.messages.recv().await {
            debug!(messages = batch.len(), "Discarded message batch");
        }
        Err(RelayError::Cancelled)
    }

    async fn process_batch(
        &self,
        ctx: &CancellationContext,
        batch: Vec<RelayMessage>,
    ) -> RelayResult<()> {
        let total = batch.len();
        for (index, message) in batch.into_iter().enumerate() {
            if ctx.is_cancelled() {
                debug!(
                    discarded = total - index,
                    "Cancelled mid-batch, discarding remaining messages"
                );
                return Ok(());
            }

            let kind = message.kind();
            let record = match message {
                RelayMessage::Commitment(record) => record,
                RelayMessage::ParachainCall(call) => {
                    error!(kind, call = %call.call, "Invalid message on relay channel");
                    return Err(RelayError::InvalidMessage {
                        kind: kind.to_string(),
                    });
                }
            };

            self.dispatch(ctx, record).await;
        }
        Ok(())
    }

    async fn dispatch(&self, ctx: &CancellationContext, mut record: LifecycleRecord) {
        let action = dispatch_action(record.status);
        match action {
            DispatchAction::SubmitInitial => {
                match self.write_new_signature_commitment(ctx, &mut record).await {
                    Ok(_) => self.report(record).await,
                    Err(err) => log_submission_failure(&record, action, &err),
                }
            }
            DispatchAction::AwaitConfirmation => {
                debug!(
                    commitment = %record.commitment_hash,
                    status = %record.status,
                    "Confirmation tracked by destination watcher, skipping"
                );
            }
            DispatchAction::SubmitComplete => {
                if let Err(err) = self.write_complete_signature_commitment(ctx, &record).await {
                    log_submission_failure(&record, action, &err);
                }
            }
            DispatchAction::Finished => {
                debug!(
                    commitment = %record.commitment_hash,
                    "Commitment already completed, nothing to submit"
                );
            }
            DispatchAction::Invalid => {
                warn!(
                    commitment = %record.commitment_hash,
                    status = %record.status,
                    "Invalid commitment status"
                );
            }
        }
    }

    /// Submits the initial signature commitment for a `Witnessed` record.
    ///
    /// On success the record is advanced to `InitialTxSent` and carries the transaction
    /// handle. On failure the record is left untouched.
    pub async fn write_new_signature_commitment(
        &self,
        ctx: &CancellationContext,
        record: &mut LifecycleRecord,
    ) -> RelayResult<TxHandle> {
        info!(
            commitment = %record.commitment_hash,
            block = record.block_number,
            "Relay writer received witnessed commitment"
        );

        let message = self.builder.build_initial(record)?;
        let contract = self.contract(LIGHT_CLIENT_BRIDGE_CONTRACT_ID)?;
        let options = self.transact_opts(ctx);

        let tx = contract.submit_initial(&options, &message).await?;
        info!(
            tx_hash = %tx,
            commitment = %record.commitment_hash,
            "New signature commitment transaction submitted"
        );

        record.advance(CommitmentStatus::InitialTxSent)?;
        record.initial_tx_handle = Some(tx);
        Ok(tx)
    }

    /// Submits the completion call for a `ReadyToComplete` record. The record is not mutated.
    pub async fn write_complete_signature_commitment(
        &self,
        ctx: &CancellationContext,
        record: &LifecycleRecord,
    ) -> RelayResult<TxHandle> {
        info!(
            commitment = %record.commitment_hash,
            block = record.block_number,
            "Relay writer received commitment ready to complete"
        );

        let message = self.builder.build_complete(record)?;
        let contract = self.contract(LIGHT_CLIENT_BRIDGE_CONTRACT_ID)?;
        let options = self.transact_opts(ctx);

        let tx = contract.submit_complete(&options, &message).await?;
        info!(
            tx_hash = %tx,
            commitment = %record.commitment_hash,
            "Complete signature commitment transaction submitted"
        );
        Ok(tx)
    }

    fn contract(&self, id: &str) -> RelayResult<Arc<dyn ContractBinding>> {
        self.contracts.resolve(id)
    }

    fn transact_opts(&self, ctx: &CancellationContext) -> TransactOpts {
        let connection = Arc::clone(&self.connection);
        TransactOpts {
            from: self.connection.identity(),
            signer: Arc::new(move |account: &Address, transaction: UnsignedTransaction| {
                connection.sign(account, transaction)
            }),
            context: ctx.clone(),
            gas_limit: self.config.gas_limit,
        }
    }

    /// Delivers an advanced record upstream. The transaction is already on chain, so this
    /// waits for channel capacity even after cancellation.
    async fn report(&self, record: LifecycleRecord) {
        let commitment = record.commitment_hash;
        if self.feedback.send(record).await.is_err() {
            warn!(%commitment, "Feedback channel closed, dropping commitment update");
        }
    }
}

fn log_submission_failure(record: &LifecycleRecord, action: DispatchAction, err: &RelayError) {
    if err.is_cancellation() {
        info!(
            commitment = %record.commitment_hash,
            action = action.name(),
            "Submission aborted by cancellation"
        );
        return;
    }
    error!(
        commitment = %record.commitment_hash,
        status = %record.status,
        action = action.name(),
        error = %err,
        "Error submitting commitment to destination chain"
    );
}
