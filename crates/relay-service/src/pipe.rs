use crate::ServiceError;
use relay_core::{CancellationContext, LifecycleRecord, RelayMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Parses one NDJSON input line: a JSON array of relay messages, or a single message.
pub fn parse_batch(line: &str) -> Result<Vec<RelayMessage>, serde_json::Error> {
    match serde_json::from_str::<Vec<RelayMessage>>(line) {
        Ok(batch) => Ok(batch),
        Err(_) => serde_json::from_str::<RelayMessage>(line).map(|message| vec![message]),
    }
}

/// Feeds batches read from `input` into the relay channel until EOF or cancellation.
///
/// Malformed lines are logged and skipped. Returns the number of batches forwarded.
pub async fn read_batches<R>(
    input: R,
    messages: mpsc::Sender<Vec<RelayMessage>>,
    ctx: CancellationContext,
) -> Result<u64, ServiceError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut line_number = 0u64;
    let mut forwarded = 0u64;

    loop {
        let line = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                debug!(forwarded, "Input reader cancelled");
                return Ok(forwarded);
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!(forwarded, "Input exhausted, closing relay channel");
            return Ok(forwarded);
        };
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let batch = match parse_batch(&line) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping malformed input line");
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Ok(forwarded),
            sent = messages.send(batch) => {
                if sent.is_err() {
                    debug!(line = line_number, "Relay channel closed, stopping input reader");
                    return Ok(forwarded);
                }
                forwarded += 1;
            }
        }
    }
}

/// Writes every reported record to `output` as one JSON line. Returns the record count.
pub async fn write_feedback<W>(
    mut feedback: mpsc::Receiver<LifecycleRecord>,
    mut output: W,
) -> Result<u64, ServiceError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(record) = feedback.recv().await {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
        written += 1;
    }
    Ok(written)
}
