use tokio::sync::watch;

/// Creates a linked cancel handle and context pair.
pub fn cancellation() -> (CancellationHandle, CancellationContext) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, CancellationContext { rx })
}

/// Owner side of a shared cancellation context.
#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn context(&self) -> CancellationContext {
        CancellationContext {
            rx: self.tx.subscribe(),
        }
    }
}

/// Shared cancellation signal observed by the write loop and every submission it makes.
///
/// Dropping the handle without cancelling leaves the context un-cancelled forever.
#[derive(Debug, Clone)]
pub struct CancellationContext {
    rx: watch::Receiver<bool>,
}

impl CancellationContext {
    /// A context that is never cancelled.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_every_context() {
        let (handle, ctx) = cancellation();
        let other = handle.context();
        assert!(!ctx.is_cancelled());

        let waiter = tokio::spawn(async move { other.cancelled().await });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("context must observe cancellation")
            .unwrap();
        assert!(ctx.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn never_context_stays_pending() {
        let ctx = CancellationContext::never();
        let result = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(result.is_err());
        assert!(!ctx.is_cancelled());
    }
}
