//! UserOperation hashing (packed v0.7 layout).

use aa_intent_types::UnsignedOperation;
use alloy_primitives::{B256, U256};
use tracing::trace;

use crate::{
    abi::{encode_types, AbiType, AbiValue},
    errors::Result,
    hash::keccak256,
    utils::bytes::{normalize_address, parse_address, parse_hex_bytes, quantity_to_be, to_hex},
};

/// Transient packed form of an operation. Only lives inside [`user_operation_hash`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedOperation {
    pub sender: [u8; 20],
    pub nonce: [u8; 32],
    pub init_code: Vec<u8>,
    pub call_data: Vec<u8>,
    pub account_gas_limits: [u8; 32],
    pub pre_verification_gas: [u8; 32],
    pub gas_fees: [u8; 32],
    pub paymaster_and_data: Vec<u8>,
}

/// Two quantities left-padded to 16 bytes each, high half first.
fn pack_pair(high: &str, high_field: &str, low: &str, low_field: &str) -> Result<[u8; 32]> {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&quantity_to_be::<16>(high, high_field)?);
    out[16..].copy_from_slice(&quantity_to_be::<16>(low, low_field)?);
    Ok(out)
}

/// `verificationGasLimit (16) || callGasLimit (16)`.
pub fn pack_account_gas_limits(verification_gas_limit: &str, call_gas_limit: &str) -> Result<[u8; 32]> {
    pack_pair(
        verification_gas_limit,
        "verificationGasLimit",
        call_gas_limit,
        "callGasLimit",
    )
}

/// `maxFeePerGas (16) || maxPriorityFeePerGas (16)`.
pub fn pack_gas_fees(max_fee_per_gas: &str, max_priority_fee_per_gas: &str) -> Result<[u8; 32]> {
    pack_pair(
        max_fee_per_gas,
        "maxFeePerGas",
        max_priority_fee_per_gas,
        "maxPriorityFeePerGas",
    )
}

/// `paymaster (20) || pmVerificationGasLimit (16) || pmPostOpGasLimit (16) || paymasterData`,
/// or empty when the operation has no paymaster.
pub fn pack_paymaster_and_data(op: &UnsignedOperation) -> Result<Vec<u8>> {
    let Some(paymaster) = op.paymaster_address() else {
        return Ok(Vec::new());
    };
    let data = parse_hex_bytes(&op.paymaster_data, "paymasterData")?;
    let mut out = Vec::with_capacity(52 + data.len());
    out.extend_from_slice(&parse_address(paymaster, "paymaster")?);
    out.extend_from_slice(&quantity_to_be::<16>(
        &op.paymaster_verification_gas_limit,
        "paymasterVerificationGasLimit",
    )?);
    out.extend_from_slice(&quantity_to_be::<16>(
        &op.paymaster_post_op_gas_limit,
        "paymasterPostOpGasLimit",
    )?);
    out.extend(data);
    Ok(out)
}

impl PackedOperation {
    pub fn from_unsigned(op: &UnsignedOperation) -> Result<Self> {
        Ok(Self {
            sender: parse_address(&op.sender, "sender")?,
            nonce: quantity_to_be::<32>(&op.nonce, "nonce")?,
            init_code: Vec::new(),
            call_data: parse_hex_bytes(&op.call_data, "callData")?,
            account_gas_limits: pack_account_gas_limits(
                &op.verification_gas_limit,
                &op.call_gas_limit,
            )?,
            pre_verification_gas: quantity_to_be::<32>(
                &op.pre_verification_gas,
                "preVerificationGas",
            )?,
            gas_fees: pack_gas_fees(&op.max_fee_per_gas, &op.max_priority_fee_per_gas)?,
            paymaster_and_data: pack_paymaster_and_data(op)?,
        })
    }

    /// Keccak of the ABI-encoded packed fields, before entry point and chain are bound in.
    pub fn inner_hash(&self) -> Result<B256> {
        let word = |b: &[u8]| AbiValue::FixedBytes(b.to_vec());
        let encoded = encode_types(
            &[
                AbiType::Address,
                AbiType::FixedBytes(32),
                AbiType::FixedBytes(32),
                AbiType::FixedBytes(32),
                AbiType::FixedBytes(32),
                AbiType::Uint(256),
                AbiType::FixedBytes(32),
                AbiType::FixedBytes(32),
            ],
            &[
                AbiValue::Address(to_hex(&self.sender)),
                word(&self.nonce),
                word(keccak256(&self.init_code).as_slice()),
                word(keccak256(&self.call_data).as_slice()),
                word(&self.account_gas_limits),
                AbiValue::Uint(U256::from_be_bytes(self.pre_verification_gas)),
                word(&self.gas_fees),
                word(keccak256(&self.paymaster_and_data).as_slice()),
            ],
        )?;
        Ok(keccak256(encoded))
    }
}

/// Final signing hash: `keccak(abi(keccak(packed), entryPoint, chainId))`.
pub fn user_operation_hash(op: &UnsignedOperation, entry_point: &str, chain_id: u64) -> Result<B256> {
    let packed = PackedOperation::from_unsigned(op)?;
    let inner = packed.inner_hash()?;
    trace!(
        account_gas_limits = %to_hex(&packed.account_gas_limits),
        gas_fees = %to_hex(&packed.gas_fees),
        paymaster_and_data_len = packed.paymaster_and_data.len(),
        first_hash = %inner,
        "packed user operation"
    );

    let encoded = encode_types(
        &[AbiType::FixedBytes(32), AbiType::Address, AbiType::Uint(256)],
        &[
            AbiValue::FixedBytes(inner.to_vec()),
            AbiValue::Address(normalize_address(entry_point, "entryPoint")?),
            AbiValue::Uint(U256::from(chain_id)),
        ],
    )?;
    Ok(keccak256(encoded))
}

/// [`user_operation_hash`] rendered as lowercase `0x` hex.
pub fn user_operation_hash_hex(op: &UnsignedOperation, entry_point: &str, chain_id: u64) -> Result<String> {
    user_operation_hash(op, entry_point, chain_id).map(|h| to_hex(h.as_slice()))
}
