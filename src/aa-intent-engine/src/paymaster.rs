//! Paymaster sponsorship authorization.
//!
//! The client signs `keccak256(nonce (32) || client (20) || validUntil (6) || validAfter (6))`;
//! the blob handed to the paymaster is `abi(address client, uint48 validUntil, uint48 validAfter,
//! bytes signature)`.

use alloy_primitives::{B256, U256};
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    abi::{encode_types, AbiType, AbiValue},
    errors::{overflow, Result},
    hash::keccak256,
    signer::{sign, SigningKey},
    utils::bytes::{quantity_to_be, to_hex, u64_to_be_width},
};

/// Byte width of the packed validity timestamps (uint48).
pub const TIMESTAMP_WIDTH: usize = 6;

/// Validity window of a paymaster authorization, in unix seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub valid_until: u64,
    pub valid_after: u64,
}

impl Validity {
    /// Valid from the beginning of time until `valid_until`.
    pub fn until(valid_until: u64) -> Self {
        Self {
            valid_until,
            valid_after: 0,
        }
    }

    /// Window of `secs` seconds starting at `now`.
    pub fn starting_at(now: OffsetDateTime, secs: u64) -> Result<Self> {
        let now = u64::try_from(now.unix_timestamp()).map_err(|_| overflow("validAfter", TIMESTAMP_WIDTH))?;
        let valid_until = now
            .checked_add(secs)
            .ok_or_else(|| overflow("validUntil", TIMESTAMP_WIDTH))?;
        Ok(Self {
            valid_until,
            valid_after: 0,
        })
    }
}

/// 64-byte pre-image signed by the client.
pub fn pack_authorization(nonce: &str, client: &[u8; 20], validity: Validity) -> Result<Vec<u8>> {
    let mut packed = Vec::with_capacity(32 + 20 + 2 * TIMESTAMP_WIDTH);
    packed.extend_from_slice(&quantity_to_be::<32>(nonce, "nonce")?);
    packed.extend_from_slice(client);
    packed.extend(u64_to_be_width(validity.valid_until, TIMESTAMP_WIDTH, "validUntil")?);
    packed.extend(u64_to_be_width(validity.valid_after, TIMESTAMP_WIDTH, "validAfter")?);
    Ok(packed)
}

pub fn authorization_hash(nonce: &str, client: &[u8; 20], validity: Validity) -> Result<B256> {
    pack_authorization(nonce, client, validity).map(keccak256)
}

/// Signed paymaster data for the client owning `client_key`, as raw bytes.
pub fn paymaster_data_bytes(nonce: &str, validity: Validity, client_key: &SigningKey) -> Result<Vec<u8>> {
    let client = client_key.address();
    let digest = authorization_hash(nonce, &client, validity)?;
    let signature = sign(digest.as_slice(), client_key)?;

    let data = encode_types(
        &[
            AbiType::Address,
            AbiType::Uint(48),
            AbiType::Uint(48),
            AbiType::Bytes,
        ],
        &[
            AbiValue::Address(to_hex(&client)),
            AbiValue::Uint(U256::from(validity.valid_until)),
            AbiValue::Uint(U256::from(validity.valid_after)),
            AbiValue::Bytes(signature.to_vec()),
        ],
    )?;
    debug!(
        client = %client_key.address_hex(),
        valid_until = validity.valid_until,
        valid_after = validity.valid_after,
        "generated paymaster data"
    );
    Ok(data)
}

/// [`paymaster_data_bytes`] as lowercase `0x` hex.
pub fn generate_paymaster_data(nonce: &str, validity: Validity, client_key: &SigningKey) -> Result<String> {
    paymaster_data_bytes(nonce, validity, client_key).map(|b| to_hex(&b))
}
