use crate::error::{RelayError, RelayResult};
use crate::types::{CommitmentStatus, StatusCode};

/// What the write loop does with a record in a given lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    /// Submit the initial signature commitment and report the record as sent.
    SubmitInitial,
    /// Confirmation is observed on the destination chain by a separate watcher.
    AwaitConfirmation,
    /// Submit the completion call; no local state change follows.
    SubmitComplete,
    /// Terminal, nothing owed.
    Finished,
    /// Status code outside the known lifecycle.
    Invalid,
}

impl DispatchAction {
    pub fn name(self) -> &'static str {
        match self {
            Self::SubmitInitial => "submit_initial",
            Self::AwaitConfirmation => "await_confirmation",
            Self::SubmitComplete => "submit_complete",
            Self::Finished => "finished",
            Self::Invalid => "invalid",
        }
    }

    pub fn submits(self) -> bool {
        matches!(self, Self::SubmitInitial | Self::SubmitComplete)
    }
}

/// Lifecycle state to write-loop action. Every known state has exactly one row.
pub const DISPATCH_TABLE: [(CommitmentStatus, DispatchAction); 5] = [
    (CommitmentStatus::Witnessed, DispatchAction::SubmitInitial),
    (CommitmentStatus::InitialTxSent, DispatchAction::AwaitConfirmation),
    (
        CommitmentStatus::InitialTxConfirmed,
        DispatchAction::AwaitConfirmation,
    ),
    (CommitmentStatus::ReadyToComplete, DispatchAction::SubmitComplete),
    (CommitmentStatus::Completed, DispatchAction::Finished),
];

pub fn dispatch_action(status: StatusCode) -> DispatchAction {
    status
        .lifecycle()
        .and_then(|state| {
            DISPATCH_TABLE
                .iter()
                .find(|(row, _)| *row == state)
                .map(|(_, action)| *action)
        })
        .unwrap_or(DispatchAction::Invalid)
}

/// Lifecycle states only move forward; unknown codes cannot be advanced from.
pub fn check_transition(current: StatusCode, next: CommitmentStatus) -> RelayResult<()> {
    match current.lifecycle() {
        Some(state) if state < next => Ok(()),
        _ => Err(RelayError::StatusRegression {
            from: current,
            to: next.code(),
        }),
    }
}
