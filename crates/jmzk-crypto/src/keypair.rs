use jmzk_chain_core::PublicKeyBytes;
use jmzk_chain_core::RecoverableSignature;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// A secp256k1 keypair. The secret scalar is held in a `Zeroizing` buffer
/// and wiped on drop; only the public key and its derived bytes are ever
/// serialized.
#[derive(Serialize, Deserialize)]
pub struct KeyPair {
    public_key: PublicKeyBytes,
    #[serde(skip_serializing, skip_deserializing)]
    secret_key: Option<Zeroizing<[u8; 32]>>,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self::from_signing_key(signing_key)
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let encoded = verifying_key.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(encoded.as_bytes());
        KeyPair {
            public_key: PublicKeyBytes(bytes),
            secret_key: Some(Zeroizing::new(signing_key.to_bytes().into())),
        }
    }

    pub fn public_key(&self) -> PublicKeyBytes {
        self.public_key
    }

    fn signing_key(&self) -> Result<SigningKey, CryptoError> {
        let secret = self
            .secret_key
            .as_ref()
            .ok_or_else(|| CryptoError::InvalidKey("keypair has no secret material".into()))?;
        SigningKey::from_bytes(secret.as_ref().into()).map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Sign a 32-byte digest, producing a 65-byte recoverable signature
    /// (64-byte (r, s) plus 1-byte recovery id).
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let signing_key = self.signing_key()?;
        let (signature, recovery_id): (Signature, RecoveryId) = signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SignFailed(e.to_string()))?;
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature(bytes))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {:?} }}", self.public_key)
    }
}
