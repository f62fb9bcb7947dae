//! Secp256k1 helpers shared by the signer and by callers that self-check signatures.

use alloy_primitives::B256;
use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};

use crate::{
    errors::{CryptoError, Result},
    hash::{keccak256, keccak256_concat},
};

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// EOA address of a public key: the low 20 bytes of `keccak256(x || y)`.
pub fn address_of(key: &VerifyingKey) -> [u8; 20] {
    let point = key.as_affine().to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    out
}

/// Uncompressed SEC1 encoding (`0x04 || x || y`).
pub fn uncompressed_public_key(key: &VerifyingKey) -> Vec<u8> {
    key.as_affine().to_encoded_point(false).as_bytes().to_vec()
}

/// Digest actually signed for a 32-byte message under the personal-message convention.
pub fn personal_message_digest(message: &[u8; 32]) -> B256 {
    keccak256_concat(&[PERSONAL_MESSAGE_PREFIX, message])
}

/// Recover the signer address of a personal-message signature.
///
/// Notes:
/// - We accept v in {0,1,27,28}, matching the remote verifier's `ecrecover` tolerance.
/// - High-S signatures are rejected.
pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<[u8; 20]> {
    let message: &[u8; 32] = message
        .try_into()
        .map_err(|_| CryptoError::InvalidMessage(message.len()))?;
    if signature.len() != 65 {
        return Err(CryptoError::InvalidSignature.into());
    }

    let v = match signature[64] {
        27 | 28 => signature[64] - 27,
        0 | 1 => signature[64],
        _ => return Err(CryptoError::InvalidSignature.into()),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(CryptoError::InvalidSignature)?;
    let sig = Signature::from_slice(&signature[..64]).map_err(|_| CryptoError::InvalidSignature)?;
    if sig.normalize_s().is_some() {
        return Err(CryptoError::InvalidSignature.into());
    }

    let digest = personal_message_digest(message);
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;
    Ok(address_of(&key))
}
