//! Recoverable ECDSA signing of 32-byte messages.
//!
//! Every signature produced by this crate (operation hash, paymaster authorization, session
//! authentication) comes from [`sign`], so all of them share one layout:
//!
//! - the signed digest is `keccak256("\x19Ethereum Signed Message:\n32" || message)`;
//! - output is `r || s || v`, 65 bytes, with `s` in the lower half of the curve order;
//! - `v` is `27 + recovery_id`, i.e. always 27 or 28.

use core::fmt;

use k256::ecdsa::SigningKey as EcdsaKey;
use rand::{CryptoRng, RngCore};
use tracing::trace;

use crate::{
    errors::{CryptoError, Result},
    utils::{
        bytes::to_hex,
        crypto::{address_of, personal_message_digest, uncompressed_public_key},
    },
};

/// Offset added to the recovery id to form `v`.
pub const V_OFFSET: u8 = 27;

/// Private scalar with its derived address. Owned per call; never shared across signers.
pub struct SigningKey {
    inner: EcdsaKey,
    address: [u8; 20],
}

impl SigningKey {
    /// Parse a 32-byte hex private key, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 64 {
            return Err(CryptoError::InvalidKey.into());
        }
        let raw = hex::decode(digits).map_err(|_| CryptoError::InvalidKey)?;
        Self::from_slice(&raw)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKey.into());
        }
        let inner = EcdsaKey::from_slice(bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self::from_inner(inner))
    }

    /// Fresh key from a cryptographically secure RNG.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_inner(EcdsaKey::random(rng))
    }

    fn from_inner(inner: EcdsaKey) -> Self {
        let address = address_of(inner.verifying_key());
        Self { inner, address }
    }

    pub fn address(&self) -> [u8; 20] {
        self.address
    }

    /// Lowercase `0x` address.
    pub fn address_hex(&self) -> String {
        to_hex(&self.address)
    }

    /// Uncompressed public key as lowercase `0x` hex.
    pub fn public_key_hex(&self) -> String {
        to_hex(&uncompressed_public_key(self.inner.verifying_key()))
    }

    /// Raw private scalar, for handing a session key back to its owner.
    pub fn to_hex(&self) -> String {
        to_hex(&self.inner.to_bytes())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("address", &self.address_hex())
            .finish_non_exhaustive()
    }
}

/// Sign a 32-byte message, returning `r || s || v`.
pub fn sign(message: &[u8], key: &SigningKey) -> Result<[u8; 65]> {
    let message: &[u8; 32] = message
        .try_into()
        .map_err(|_| CryptoError::InvalidMessage(message.len()))?;

    let digest = personal_message_digest(message);
    let (signature, recovery_id) = key
        .inner
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|_| CryptoError::SigningFailed)?;

    // Ethereum can only express recovery ids 0 and 1.
    let recovery = recovery_id.to_byte();
    if recovery > 1 {
        return Err(CryptoError::SigningFailed.into());
    }

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = V_OFFSET + recovery;
    trace!(signer = %key.address_hex(), v = out[64], "signed message");
    Ok(out)
}

/// [`sign`] rendered as lowercase `0x` hex.
pub fn sign_hex(message: &[u8], key: &SigningKey) -> Result<String> {
    sign(message, key).map(|sig| to_hex(&sig))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, hash::keccak256, utils::crypto::recover_address};

    const KEY_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const HARDHAT_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_known_addresses() {
        assert_eq!(
            SigningKey::from_hex(KEY_ONE).unwrap().address_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert_eq!(
            SigningKey::from_hex(HARDHAT_0).unwrap().address_hex(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_signature_shape_and_recovery() {
        let key = SigningKey::from_hex(HARDHAT_0).unwrap();
        for i in 0u8..8 {
            let message = keccak256([i]);
            let sig = sign(message.as_slice(), &key).unwrap();
            assert_eq!(sig.len(), 65);
            assert!(sig[64] == 27 || sig[64] == 28);
            assert_eq!(recover_address(message.as_slice(), &sig).unwrap(), key.address());

            // The 0/1 convention recovers to the same signer.
            let mut raw_v = sig;
            raw_v[64] -= V_OFFSET;
            assert_eq!(recover_address(message.as_slice(), &raw_v).unwrap(), key.address());
        }
    }

    #[test]
    fn test_matches_alloy_personal_sign_digest() {
        let message = keccak256(b"userop");
        let ours = personal_message_digest(&message.0);
        assert_eq!(ours, alloy_primitives::eip191_hash_message(message.as_slice()));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let key = SigningKey::from_hex(HARDHAT_0).unwrap();
        let message = keccak256(b"same message");
        assert_eq!(
            sign_hex(message.as_slice(), &key).unwrap(),
            sign_hex(message.as_slice(), &key).unwrap()
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let non_hex = "zz".repeat(32);
        let zero = "0".repeat(64);
        for bad in ["", "0x1234", non_hex.as_str(), zero.as_str()] {
            assert_eq!(
                SigningKey::from_hex(bad).unwrap_err(),
                Error::Crypto(CryptoError::InvalidKey),
                "{bad:?}"
            );
        }
        let key = SigningKey::from_hex(HARDHAT_0).unwrap();
        assert_eq!(
            sign(&[0u8; 31], &key).unwrap_err(),
            Error::Crypto(CryptoError::InvalidMessage(31))
        );
    }

    #[test]
    fn test_debug_does_not_leak_scalar() {
        let key = SigningKey::from_hex(HARDHAT_0).unwrap();
        let printed = format!("{key:?}");
        assert!(!printed.contains(HARDHAT_0));
        assert!(printed.contains("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    }
}
