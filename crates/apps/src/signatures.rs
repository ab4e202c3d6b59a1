//! Signer recovery over 65-byte `(r, s, v)` signatures.

use alloy_primitives::{Address, B256};
use arbiter_primitives::ProtocolError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

/// Recovers the signer address of a 65-byte `(r, s, v)` signature over a
/// 32-byte digest. The recovery id `v` may be given raw (0/1) or in its
/// legacy 27/28 form.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, ProtocolError> {
    let raw: &[u8; 65] = signature
        .try_into()
        .map_err(|_| ProtocolError::BadSignature {
            reason: format!("expected 65 bytes, got {}", signature.len()),
        })?;

    let v = match raw[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        v => {
            return Err(ProtocolError::BadSignature {
                reason: format!("invalid recovery id: {v}"),
            })
        }
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or_else(|| ProtocolError::BadSignature {
        reason: format!("invalid recovery id: {v}"),
    })?;

    let signature =
        Signature::from_slice(&raw[..64]).map_err(|e| ProtocolError::BadSignature {
            reason: format!("malformed signature: {e}"),
        })?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|e| ProtocolError::BadSignature {
            reason: format!("recovery failed: {e}"),
        })?;

    Ok(Address::from_public_key(&key))
}

/// Signs a 32-byte digest, returning the 65-byte `(r, s, v)` signature that
/// [recover_signer] accepts. Off-chain clients use this to produce state and
/// action signatures.
pub fn sign_digest(key: &SigningKey, digest: B256) -> Result<Vec<u8>, ProtocolError> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|e| ProtocolError::BadSignature {
            reason: format!("signing failed: {e}"),
        })?;

    let mut raw = signature.to_vec();
    raw.push(recovery_id.to_byte());
    Ok(raw)
}
