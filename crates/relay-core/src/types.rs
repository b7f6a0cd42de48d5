use crate::error::{RelayError, RelayResult};
use crate::flow;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Drops an optional `0x` or `0X` prefix from a hex string.
pub fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

fn decode_fixed<const N: usize>(input: &str) -> Result<[u8; N], String> {
    let digits = strip_hex_prefix(input.trim());
    let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected {} bytes, got {}", N, bytes.len()))
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                decode_fixed::<$len>(&raw)
                    .map(Self)
                    .map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// Destination-chain account or contract address.
    Address,
    20
);

fixed_bytes!(
    /// Hash of a submitted destination-chain transaction.
    TxHandle,
    32
);

fixed_bytes!(
    /// Hash identifying the source-chain commitment a record tracks.
    CommitmentHash,
    32
);

impl FromStr for Address {
    type Err = RelayError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        decode_fixed::<20>(input)
            .map(Self)
            .map_err(|reason| RelayError::InvalidAddress {
                input: input.to_string(),
                reason,
            })
    }
}

impl Address {
    pub fn from_hex(input: &str) -> RelayResult<Self> {
        input.parse()
    }
}

/// Raw lifecycle status as carried on the wire.
///
/// Known codes map onto [`CommitmentStatus`]; anything else is preserved so the engine can
/// report it instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u8);

impl StatusCode {
    pub fn lifecycle(self) -> Option<CommitmentStatus> {
        CommitmentStatus::from_code(self)
    }
}

impl From<CommitmentStatus> for StatusCode {
    fn from(status: CommitmentStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lifecycle() {
            Some(status) => f.write_str(status.name()),
            None => write!(f, "unknown({})", self.0),
        }
    }
}

/// Commitment lifecycle states, in the order a commitment moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommitmentStatus {
    Witnessed,
    InitialTxSent,
    InitialTxConfirmed,
    ReadyToComplete,
    Completed,
}

impl CommitmentStatus {
    pub const ALL: [CommitmentStatus; 5] = [
        Self::Witnessed,
        Self::InitialTxSent,
        Self::InitialTxConfirmed,
        Self::ReadyToComplete,
        Self::Completed,
    ];

    pub fn code(self) -> StatusCode {
        StatusCode(match self {
            Self::Witnessed => 0,
            Self::InitialTxSent => 1,
            Self::InitialTxConfirmed => 2,
            Self::ReadyToComplete => 3,
            Self::Completed => 4,
        })
    }

    pub fn from_code(code: StatusCode) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Witnessed => "witnessed",
            Self::InitialTxSent => "initial_tx_sent",
            Self::InitialTxConfirmed => "initial_tx_confirmed",
            Self::ReadyToComplete => "ready_to_complete",
            Self::Completed => "completed",
        }
    }
}

/// Opaque commitment data, hex encoded on the wire.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CommitmentPayload(pub Vec<u8>);

impl CommitmentPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CommitmentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitmentPayload({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for CommitmentPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for CommitmentPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for CommitmentPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(strip_hex_prefix(&raw))
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A commitment observation flowing through its submission states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub commitment_hash: CommitmentHash,
    pub block_number: u64,
    pub status: StatusCode,
    pub payload: CommitmentPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_tx_handle: Option<TxHandle>,
}

impl LifecycleRecord {
    pub fn witnessed(
        commitment_hash: CommitmentHash,
        block_number: u64,
        payload: impl Into<CommitmentPayload>,
    ) -> Self {
        Self {
            commitment_hash,
            block_number,
            status: CommitmentStatus::Witnessed.code(),
            payload: payload.into(),
            initial_tx_handle: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<StatusCode>) -> Self {
        self.status = status.into();
        self
    }

    pub fn lifecycle(&self) -> Option<CommitmentStatus> {
        self.status.lifecycle()
    }

    /// Moves the record forward to `next`, refusing any transition that does not advance.
    pub fn advance(&mut self, next: CommitmentStatus) -> RelayResult<()> {
        flow::check_transition(self.status, next)?;
        self.status = next.code();
        Ok(())
    }
}

/// A call destined for the source chain, travelling the opposite relay direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParachainCall {
    pub call: String,
    #[serde(default)]
    pub args: CommitmentPayload,
}

/// Messages carried on the shared relay channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelayMessage {
    Commitment(LifecycleRecord),
    ParachainCall(ParachainCall),
}

impl RelayMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Commitment(_) => "commitment",
            Self::ParachainCall(_) => "parachain_call",
        }
    }
}

impl From<LifecycleRecord> for RelayMessage {
    fn from(record: LifecycleRecord) -> Self {
        Self::Commitment(record)
    }
}

/// Fields for the light-client bridge's initial signature commitment call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialCommitmentMessage {
    pub commitment_hash: CommitmentHash,
    pub payload: Vec<u8>,
    pub validator_claims_bitfield: Vec<u8>,
    pub validator_signature_commitment: Vec<u8>,
    pub validator_public_key: Vec<u8>,
    pub validator_public_key_merkle_proof: Vec<[u8; 32]>,
}

/// Fields for the light-client bridge's completion call.
///
/// The `random_*` vectors are index-aligned: entry `i` of each describes the same validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteCommitmentMessage {
    pub id: u64,
    pub commitment_hash: CommitmentHash,
    pub payload: Vec<u8>,
    pub random_signature_commitments: Vec<Vec<u8>>,
    pub random_signature_bitfield_positions: Vec<u64>,
    pub random_validator_public_keys: Vec<Vec<u8>>,
    pub random_public_key_merkle_proofs: Vec<Vec<[u8; 32]>>,
}

/// Destination-chain transaction before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    pub to: Address,
    pub gas_limit: u64,
    pub data: Vec<u8>,
}

impl UnsignedTransaction {
    /// Canonical byte encoding covered by the signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + Address::LEN + 8 + 4 + self.data.len());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(self.to.as_bytes());
        out.extend_from_slice(&self.gas_limit.to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: UnsignedTransaction,
    pub from: Address,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedTransaction {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.transaction.signing_bytes();
        out.extend_from_slice(self.from.as_bytes());
        out.extend_from_slice(&self.public_key);
        out.extend_from_slice(&self.signature);
        out
    }
}
