use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use relay_core::{
    strip_hex_prefix, Address, ChainClient, ChainConnection, RelayError, RelayResult,
    SignedTransaction, SigningError, UnsignedTransaction,
};
use std::fmt;
use std::sync::Arc;

/// Account address for an Ed25519 public key: the last 20 bytes of its blake3 digest.
pub fn address_of(public_key: &VerifyingKey) -> Address {
    let digest = blake3::hash(public_key.as_bytes());
    let mut bytes = [0u8; Address::LEN];
    bytes.copy_from_slice(&digest.as_bytes()[32 - Address::LEN..]);
    Address(bytes)
}

/// Checks the signature and the sender address of a signed transaction.
pub fn verify_transaction(signed: &SignedTransaction) -> Result<(), SigningError> {
    let key_bytes: [u8; 32] = signed
        .public_key
        .as_slice()
        .try_into()
        .map_err(|_| SigningError::Scheme("public key must be 32 bytes".to_string()))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| SigningError::Scheme(format!("invalid public key: {e}")))?;
    if address_of(&key) != signed.from {
        return Err(SigningError::Scheme(format!(
            "sender {} does not match the signing key",
            signed.from
        )));
    }
    let signature = Signature::from_slice(&signed.signature)
        .map_err(|e| SigningError::Scheme(format!("malformed signature: {e}")))?;
    key.verify(&signed.transaction.signing_bytes(), &signature)
        .map_err(|e| SigningError::Scheme(format!("signature check failed: {e}")))
}

/// Destination-chain connection that signs with a single local Ed25519 key.
pub struct LocalKeyConnection {
    key: SigningKey,
    identity: Address,
    client: Arc<dyn ChainClient>,
}

impl LocalKeyConnection {
    pub fn new(key: SigningKey, client: Arc<dyn ChainClient>) -> Self {
        let identity = address_of(&key.verifying_key());
        Self {
            key,
            identity,
            client,
        }
    }

    /// Fresh random key, for dry runs and tests.
    pub fn generate(client: Arc<dyn ChainClient>) -> Self {
        Self::new(SigningKey::from_bytes(&rand::random::<[u8; 32]>()), client)
    }

    /// Loads a 32-byte secret key given as hex, with or without a `0x` prefix.
    pub fn from_secret_hex(secret: &str, client: Arc<dyn ChainClient>) -> RelayResult<Self> {
        let bytes = hex::decode(strip_hex_prefix(secret.trim()))
            .map_err(|e| RelayError::Config(format!("signer secret is not hex: {e}")))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            RelayError::Config(format!(
                "signer secret must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(SigningKey::from_bytes(&seed), client))
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl fmt::Debug for LocalKeyConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyConnection")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl ChainConnection for LocalKeyConnection {
    fn identity(&self) -> Address {
        self.identity
    }

    fn sign(
        &self,
        account: &Address,
        transaction: UnsignedTransaction,
    ) -> Result<SignedTransaction, SigningError> {
        if *account != self.identity {
            return Err(SigningError::UnknownAccount(*account));
        }
        let signature = self.key.sign(&transaction.signing_bytes());
        Ok(SignedTransaction {
            transaction,
            from: self.identity,
            public_key: self.key.verifying_key().to_bytes().to_vec(),
            signature: signature.to_bytes().to_vec(),
        })
    }

    fn client(&self) -> Arc<dyn ChainClient> {
        Arc::clone(&self.client)
    }
}
