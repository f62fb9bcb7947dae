//! Keccak-256, the one hash primitive every other component uses.

use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

/// Keccak-256 of `bytes`.
pub fn keccak256(bytes: impl AsRef<[u8]>) -> B256 {
    let mut h = Keccak256::new();
    h.update(bytes.as_ref());
    B256::from_slice(h.finalize().as_slice())
}

/// Keccak-256 over the concatenation of `parts`, without building the pre-image first.
pub fn keccak256_concat(parts: &[&[u8]]) -> B256 {
    let mut h = Keccak256::new();
    for part in parts {
        h.update(part);
    }
    B256::from_slice(h.finalize().as_slice())
}
