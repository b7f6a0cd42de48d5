use crate::error::RelayResult;
use crate::types::{CompleteCommitmentMessage, InitialCommitmentMessage, LifecycleRecord};

/// Turns a lifecycle record into call-ready payload and proof fields.
///
/// Builders are pure from the engine's point of view: the same record yields the same
/// message, and a malformed payload yields `RelayError::MessageBuild`.
pub trait MessageBuilder: Send + Sync {
    fn build_initial(&self, record: &LifecycleRecord) -> RelayResult<InitialCommitmentMessage>;

    fn build_complete(&self, record: &LifecycleRecord) -> RelayResult<CompleteCommitmentMessage>;
}
