use jmzk_chain_core::{PublicKeyBytes, RecoverableSignature};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::error::CryptoError;

/// Recover the public key that produced `sig` over `digest`. This is the
/// primitive the jmzk-Link codec's `restore_keys()` and the transaction
/// processor's signing-key recovery both build on.
pub fn recover_public_key(digest: &[u8; 32], sig: &RecoverableSignature) -> Result<PublicKeyBytes, CryptoError> {
    let signature = Signature::from_slice(&sig.0[..64]).map_err(|e| CryptoError::BadSignature(e.to_string()))?;
    let recovery_id =
        RecoveryId::from_byte(sig.0[64]).ok_or_else(|| CryptoError::BadSignature("bad recovery id".into()))?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|e| CryptoError::BadSignature(e.to_string()))?;
    let encoded = verifying_key.to_encoded_point(true);
    let mut bytes = [0u8; 33];
    bytes.copy_from_slice(encoded.as_bytes());
    Ok(PublicKeyBytes(bytes))
}

/// Verify that `sig` was produced by `public_key` over `digest`, without
/// caring which recovery id was embedded.
pub fn verify(digest: &[u8; 32], sig: &RecoverableSignature, public_key: &PublicKeyBytes) -> Result<bool, CryptoError> {
    Ok(recover_public_key(digest, sig)? == *public_key)
}
