use rand::rngs::StdRng;
use rand::SeedableRng;
use relay_core::{
    strip_hex_prefix, CompleteCommitmentMessage, InitialCommitmentMessage, LifecycleRecord,
    MessageBuilder, RelayError, RelayResult,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Byte string carried as hex inside commitment documents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HexBytes(pub Vec<u8>);

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(strip_hex_prefix(&raw))
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// One member of the validator set that signed (or failed to sign) the commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub public_key: HexBytes,
    #[serde(default)]
    pub signature: Option<HexBytes>,
    /// Proof of `public_key` against the validator set root, leaf to root.
    pub merkle_proof: Vec<HexBytes>,
}

/// Signed commitment document carried in a record's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCommitment {
    pub payload: HexBytes,
    pub validators: Vec<ValidatorEntry>,
    /// Validation id assigned by the bridge once the initial transaction is confirmed.
    #[serde(default)]
    pub validation_id: Option<u64>,
    /// Seed for the completion subset; falls back to the commitment hash.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl SignedCommitment {
    pub fn decode(record: &LifecycleRecord) -> RelayResult<Self> {
        serde_json::from_slice(record.payload.as_bytes()).map_err(|e| {
            RelayError::MessageBuild(format!(
                "commitment {} payload is not a signed commitment: {e}",
                record.commitment_hash
            ))
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    fn signed_positions(&self) -> Vec<usize> {
        self.validators
            .iter()
            .enumerate()
            .filter(|(_, validator)| validator.signature.is_some())
            .map(|(index, _)| index)
            .collect()
    }

    fn claims_bitfield(&self, positions: &[usize]) -> Vec<u8> {
        let mut bitfield = vec![0u8; self.validators.len().div_ceil(8)];
        for position in positions {
            bitfield[position / 8] |= 1 << (position % 8);
        }
        bitfield
    }
}

/// Builds light-client bridge call fields from JSON signed-commitment payloads.
#[derive(Debug, Clone, Default)]
pub struct JsonCommitmentBuilder;

impl JsonCommitmentBuilder {
    /// Number of validators sampled for the completion proof: two thirds of signers,
    /// rounded up, never zero.
    pub fn required_signatures(signed: usize) -> usize {
        (signed * 2).div_ceil(3).max(1)
    }

    fn signed(document: &SignedCommitment, record: &LifecycleRecord) -> RelayResult<Vec<usize>> {
        let positions = document.signed_positions();
        if positions.is_empty() {
            return Err(RelayError::MessageBuild(format!(
                "commitment {} carries no validator signatures",
                record.commitment_hash
            )));
        }
        Ok(positions)
    }

    fn seed(document: &SignedCommitment, record: &LifecycleRecord) -> u64 {
        document.random_seed.unwrap_or_else(|| {
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&record.commitment_hash.as_bytes()[..8]);
            u64::from_be_bytes(prefix)
        })
    }
}

fn proof_nodes(validator: &ValidatorEntry) -> RelayResult<Vec<[u8; 32]>> {
    validator
        .merkle_proof
        .iter()
        .map(|node| {
            <[u8; 32]>::try_from(node.0.as_slice()).map_err(|_| {
                RelayError::MessageBuild(format!(
                    "merkle proof node must be 32 bytes, got {}",
                    node.0.len()
                ))
            })
        })
        .collect()
}

fn signature_of(validator: &ValidatorEntry) -> RelayResult<Vec<u8>> {
    validator
        .signature
        .as_ref()
        .map(|signature| signature.0.clone())
        .ok_or_else(|| RelayError::MessageBuild("validator has not signed".to_string()))
}

impl MessageBuilder for JsonCommitmentBuilder {
    fn build_initial(&self, record: &LifecycleRecord) -> RelayResult<InitialCommitmentMessage> {
        let document = SignedCommitment::decode(record)?;
        let positions = Self::signed(&document, record)?;
        let claimant = &document.validators[positions[0]];

        Ok(InitialCommitmentMessage {
            commitment_hash: record.commitment_hash,
            payload: document.payload.0.clone(),
            validator_claims_bitfield: document.claims_bitfield(&positions),
            validator_signature_commitment: signature_of(claimant)?,
            validator_public_key: claimant.public_key.0.clone(),
            validator_public_key_merkle_proof: proof_nodes(claimant)?,
        })
    }

    fn build_complete(&self, record: &LifecycleRecord) -> RelayResult<CompleteCommitmentMessage> {
        let document = SignedCommitment::decode(record)?;
        let id = document.validation_id.ok_or_else(|| {
            RelayError::MessageBuild(format!(
                "commitment {} has no validation id yet",
                record.commitment_hash
            ))
        })?;
        let positions = Self::signed(&document, record)?;

        let mut rng = StdRng::seed_from_u64(Self::seed(&document, record));
        let amount = Self::required_signatures(positions.len());
        let mut chosen: Vec<usize> = rand::seq::index::sample(&mut rng, positions.len(), amount)
            .into_iter()
            .map(|index| positions[index])
            .collect();
        chosen.sort_unstable();

        let mut message = CompleteCommitmentMessage {
            id,
            commitment_hash: record.commitment_hash,
            payload: document.payload.0.clone(),
            random_signature_commitments: Vec::with_capacity(amount),
            random_signature_bitfield_positions: Vec::with_capacity(amount),
            random_validator_public_keys: Vec::with_capacity(amount),
            random_public_key_merkle_proofs: Vec::with_capacity(amount),
        };
        for position in chosen {
            let validator = &document.validators[position];
            message
                .random_signature_commitments
                .push(signature_of(validator)?);
            message
                .random_signature_bitfield_positions
                .push(position as u64);
            message
                .random_validator_public_keys
                .push(validator.public_key.0.clone());
            message
                .random_public_key_merkle_proofs
                .push(proof_nodes(validator)?);
        }
        Ok(message)
    }
}
