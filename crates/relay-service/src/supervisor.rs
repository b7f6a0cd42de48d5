use crate::ServiceError;
use relay_core::{cancellation, CancellationContext, CancellationHandle, RelayResult};
use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

/// Error-propagating task group for relay streams.
///
/// Every task shares one cancellation context. The first task to fail cancels the rest, and
/// that first failure is what [`run_until`](Self::run_until) returns. Tasks that stop with
/// `Cancelled` count as clean exits.
pub struct RelaySupervisor {
    tasks: JoinSet<RelayResult<()>>,
    handle: CancellationHandle,
    context: CancellationContext,
}

impl RelaySupervisor {
    pub fn new() -> Self {
        let (handle, context) = cancellation();
        Self {
            tasks: JoinSet::new(),
            handle,
            context,
        }
    }

    pub fn context(&self) -> CancellationContext {
        self.context.clone()
    }

    /// The underlying task group, for `RelayWriter::start`.
    pub fn tasks(&mut self) -> &mut JoinSet<RelayResult<()>> {
        &mut self.tasks
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = RelayResult<()>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Waits for every task, cancelling the group when `shutdown` resolves or a task fails.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut first_error: Option<ServiceError> = None;
        let mut shutting_down = false;

        loop {
            tokio::select! {
                _ = &mut shutdown, if !shutting_down => {
                    info!(tasks = self.tasks.len(), "Shutdown requested, cancelling relay tasks");
                    shutting_down = true;
                    self.handle.cancel();
                }
                joined = self.tasks.join_next() => match joined {
                    Some(joined) => {
                        if let Some(err) = self.settle(joined) {
                            first_error.get_or_insert(err);
                        }
                    }
                    None => break,
                },
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Waits for every task without an external shutdown trigger.
    pub async fn wait(self) -> Result<(), ServiceError> {
        self.run_until(std::future::pending::<()>()).await
    }

    fn settle(&self, joined: Result<RelayResult<()>, JoinError>) -> Option<ServiceError> {
        let err = match joined {
            Ok(Ok(())) => {
                debug!("Relay task finished");
                return None;
            }
            Ok(Err(err)) if err.is_cancellation() => {
                debug!("Relay task stopped after cancellation");
                return None;
            }
            Ok(Err(err)) => ServiceError::Relay(err),
            Err(join) => ServiceError::Task(join.to_string()),
        };
        error!(error = %err, "Relay task failed, cancelling the group");
        self.handle.cancel();
        Some(err)
    }
}

impl Default for RelaySupervisor {
    fn default() -> Self {
        Self::new()
    }
}
