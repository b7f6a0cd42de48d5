use crate::types::{Address, StatusCode};
use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

/// Relay engine errors.
///
/// Only `InvalidMessage` unwinds out of the write loop; startup errors abort before the
/// loop exists and everything else is absorbed per record.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid message on relay channel: expected commitment, got '{kind}'")]
    InvalidMessage { kind: String },

    #[error("Unknown contract '{0}'")]
    UnknownContract(String),

    #[error("Commitment message build failed: {0}")]
    MessageBuild(String),

    #[error("Contract '{contract}' submission failed: {message}")]
    Submission { contract: String, message: String },

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Contract binding error: {0}")]
    Binding(String),

    #[error("Chain client error: {0}")]
    Client(String),

    #[error("Status regression: {from} -> {to}")]
    StatusRegression { from: StatusCode, to: StatusCode },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Relay cancelled")]
    Cancelled,
}

impl RelayError {
    pub fn submission(contract: &str, message: impl Into<String>) -> Self {
        Self::Submission {
            contract: contract.to_string(),
            message: message.into(),
        }
    }

    /// Cancellation is the normal shutdown trigger, not a failure to report.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Errors that terminate the write loop instead of being logged per record.
    pub fn is_fatal_to_loop(&self) -> bool {
        matches!(self, Self::InvalidMessage { .. })
    }
}

/// Failures of the transaction signing callback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("no signing key for account {0}")]
    UnknownAccount(Address),

    #[error("signature scheme failure: {0}")]
    Scheme(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_error_converts_into_relay_error() {
        let err: RelayError = SigningError::Scheme("corrupted key".to_string()).into();
        assert!(matches!(err, RelayError::Signing(_)));
        assert!(err.to_string().contains("corrupted key"));
        assert!(!err.is_fatal_to_loop());
    }

    #[test]
    fn only_invalid_message_is_fatal() {
        let fatal = RelayError::InvalidMessage {
            kind: "parachain_call".to_string(),
        };
        assert!(fatal.is_fatal_to_loop());
        assert!(!RelayError::UnknownContract("x".to_string()).is_fatal_to_loop());
        assert!(RelayError::Cancelled.is_cancellation());
    }
}
