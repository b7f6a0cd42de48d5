//! Concrete adapters for the relay engine: a JSON signed-commitment message builder, the
//! light-client bridge contract binding, a local Ed25519 signing connection and an
//! in-memory destination chain.

#![deny(unsafe_code)]

pub mod binding;
pub mod builder;
pub mod client;
pub mod connection;

pub use binding::{
    encode_call, selector, LightClientBridgeBinding, LightClientBridgeFactory,
    COMPLETE_SIGNATURE_COMMITMENT, NEW_SIGNATURE_COMMITMENT,
};
pub use builder::{HexBytes, JsonCommitmentBuilder, SignedCommitment, ValidatorEntry};
pub use client::InMemoryChainClient;
pub use connection::{address_of, verify_transaction, LocalKeyConnection};
