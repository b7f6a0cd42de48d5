//! Commitment relay engine.
//!
//! Receives status-tagged commitment records from a source-chain observer, submits the
//! matching light-client bridge transaction to the destination chain, and reports advanced
//! records back upstream. The engine is a single writer per relay stream: records are
//! dispatched strictly in order through an explicit status table, per-record failures are
//! logged and absorbed, and cancellation drains the inbound channel before exiting.

#![deny(unsafe_code)]

pub mod binding;
pub mod builder;
pub mod cancel;
pub mod config;
pub mod connection;
pub mod error;
pub mod flow;
pub mod registry;
pub mod types;
pub mod writer;

pub use binding::{BindingFactory, ContractBinding, Signer, TransactOpts};
pub use builder::MessageBuilder;
pub use cancel::{cancellation, CancellationContext, CancellationHandle};
pub use config::{RelayWriterConfig, DEFAULT_GAS_LIMIT};
pub use connection::{ChainClient, ChainConnection};
pub use error::{RelayError, RelayResult, SigningError};
pub use flow::{dispatch_action, DispatchAction, DISPATCH_TABLE};
pub use registry::{ContractRegistry, LIGHT_CLIENT_BRIDGE_CONTRACT_ID};
pub use types::{
    strip_hex_prefix, Address, CommitmentHash, CommitmentPayload, CommitmentStatus,
    CompleteCommitmentMessage, InitialCommitmentMessage, LifecycleRecord, ParachainCall,
    RelayMessage, SignedTransaction, StatusCode, TxHandle, UnsignedTransaction,
};
pub use writer::RelayWriter;
