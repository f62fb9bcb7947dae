//! Intent parameter builder: one ABI field set per intent kind.

use aa_intent_types::Intent;
use alloy_primitives::U256;
use tracing::debug;

use crate::{
    abi::{encode, params, with_offset_prefix, AbiType, AbiValue, ParameterSpec},
    errors::Result,
    utils::bytes::{normalize_address, parse_hex_bytes, parse_uint},
};

/// Declared parameters and values for the intent's own field set.
pub fn intent_fields(intent: &Intent) -> Result<(Vec<ParameterSpec>, Vec<AbiValue>)> {
    intent.validate()?;

    let fields = match intent {
        Intent::TokenTransfer {
            recipient,
            token_address,
            amount,
            network_id,
        } => (
            params(&[
                ("networkId", AbiType::String),
                ("recipient", AbiType::String),
                ("tokenAddress", AbiType::String),
                ("amount", AbiType::Uint(256)),
            ]),
            vec![
                AbiValue::string(network_id),
                AbiValue::String(normalize_address(recipient, "recipient")?),
                AbiValue::String(normalize_address(token_address, "tokenAddress")?),
                AbiValue::Uint(parse_uint(amount, "amount")?),
            ],
        ),
        Intent::NftTransfer {
            recipient,
            collection_address,
            nft_id,
            amount,
            nft_type,
            network_id,
        } => (
            params(&[
                ("networkId", AbiType::String),
                ("recipient", AbiType::String),
                ("collectionAddress", AbiType::String),
                ("nftId", AbiType::Uint(256)),
                ("amount", AbiType::Uint(256)),
                ("nftType", AbiType::String),
            ]),
            vec![
                AbiValue::string(network_id),
                AbiValue::String(normalize_address(recipient, "recipient")?),
                AbiValue::String(normalize_address(collection_address, "collectionAddress")?),
                AbiValue::Uint(parse_uint(nft_id, "nftId")?),
                AbiValue::Uint(parse_uint(amount, "amount")?),
                AbiValue::string(nft_type.as_str()),
            ],
        ),
        Intent::RawTransaction {
            from,
            to,
            data,
            value,
            chain_id,
        } => (
            params(&[
                ("from", AbiType::Address),
                ("to", AbiType::Address),
                ("data", AbiType::Bytes),
                ("value", AbiType::Uint(256)),
                ("chainId", AbiType::Uint(256)),
            ]),
            vec![
                AbiValue::address(from),
                AbiValue::address(to),
                AbiValue::Bytes(parse_hex_bytes(data, "data")?),
                AbiValue::Uint(parse_uint(value, "value")?),
                AbiValue::Uint(U256::from(*chain_id)),
            ],
        ),
    };
    Ok(fields)
}

/// `jobParameters`: the intent field set, offset-wrapped as one dynamic value.
pub fn job_parameters(intent: &Intent) -> Result<Vec<u8>> {
    let (specs, values) = intent_fields(intent)?;
    let encoded = encode(&specs, &values)?;
    debug!(kind = intent.type_tag(), len = encoded.len(), "encoded intent parameters");
    Ok(with_offset_prefix(encoded))
}
