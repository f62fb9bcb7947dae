use aa_intent_types::{GasQuote, NetworkPolicy, SessionContext, UnsignedOperation};
use alloy_primitives::B256;
use serde::Serialize;
use tracing::debug;

use crate::{
    config::EngineConfig,
    errors::{Result, ValidationError},
    hasher::user_operation_hash,
    signer::{sign_hex, SigningKey},
    utils::bytes::{normalize_address, parse_address, parse_hex_bytes, quantity_to_be, to_hex},
};

/// Fill a fresh operation from assembled call data, the gas quote and the configured limits.
///
/// The paymaster is taken from `network` only when the network sponsors gas, and then
/// `paymaster_data` must carry its signed authorization; it is ignored otherwise. Every hex field
/// is checked here so a bad value never reaches the hasher.
pub fn build_unsigned_operation(
    call_data: &str,
    sender: &str,
    nonce: &str,
    gas: &GasQuote,
    network: &NetworkPolicy,
    paymaster_data: Option<String>,
    config: &EngineConfig,
) -> Result<UnsignedOperation> {
    parse_hex_bytes(call_data, "callData")?;
    quantity_to_be::<32>(nonce, "nonce")?;
    quantity_to_be::<16>(&gas.max_fee_per_gas, "maxFeePerGas")?;
    quantity_to_be::<16>(&gas.max_priority_fee_per_gas, "maxPriorityFeePerGas")?;

    let paymaster = match (&network.paymaster, network.sponsorship_enabled) {
        (Some(p), true) if !p.trim().is_empty() => Some(normalize_address(p, "paymaster")?),
        _ => None,
    };
    let paymaster_data = match (&paymaster, paymaster_data) {
        (Some(_), Some(data)) => {
            if parse_hex_bytes(&data, "paymasterData")?.is_empty() {
                return Err(ValidationError::MissingField("paymasterData").into());
            }
            data.to_lowercase()
        }
        (Some(_), None) => return Err(ValidationError::MissingField("paymasterData").into()),
        (None, _) => "0x".to_string(),
    };

    Ok(UnsignedOperation {
        sender: normalize_address(sender, "sender")?,
        nonce: nonce.to_lowercase(),
        paymaster,
        call_gas_limit: config.call_gas_limit.clone(),
        verification_gas_limit: config.verification_gas_limit.clone(),
        pre_verification_gas: config.pre_verification_gas.clone(),
        max_fee_per_gas: gas.max_fee_per_gas.clone(),
        max_priority_fee_per_gas: gas.max_priority_fee_per_gas.clone(),
        paymaster_verification_gas_limit: config.paymaster_verification_gas_limit.clone(),
        paymaster_post_op_gas_limit: config.paymaster_post_op_gas_limit.clone(),
        call_data: call_data.to_lowercase(),
        paymaster_data,
    })
}

/// Reject a session whose chain or entry point differs from the selected network's.
///
/// The operation is assembled from the network snapshot but hashed against the session, so both
/// must name the same deployment.
pub fn ensure_same_deployment(session: &SessionContext, network: &NetworkPolicy) -> Result<()> {
    if session.chain_id != network.chain_id {
        return Err(ValidationError::ContextMismatch("chainId").into());
    }
    let session_entry_point = parse_address(&session.entry_point_address, "entryPointAddress")?;
    if session_entry_point != parse_address(&network.entry_point, "entryPoint")? {
        return Err(ValidationError::ContextMismatch("entryPoint").into());
    }
    Ok(())
}

/// An operation together with its signature. Immutable once produced by [`sign_operation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOperation {
    #[serde(flatten)]
    operation: UnsignedOperation,
    signature: String,
    #[serde(skip)]
    op_hash: B256,
}

impl SignedOperation {
    pub fn operation(&self) -> &UnsignedOperation {
        &self.operation
    }

    /// `0x` hex `r || s || v`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn op_hash(&self) -> B256 {
        self.op_hash
    }

    pub fn op_hash_hex(&self) -> String {
        to_hex(self.op_hash.as_slice())
    }

    pub fn into_parts(self) -> (UnsignedOperation, String) {
        (self.operation, self.signature)
    }
}

/// Hash `op` for the session's entry point and chain, then sign the hash.
pub fn sign_operation(
    op: UnsignedOperation,
    session: &SessionContext,
    key: &SigningKey,
) -> Result<SignedOperation> {
    let op_hash = user_operation_hash(&op, &session.entry_point_address, session.chain_id)?;
    let signature = sign_hex(op_hash.as_slice(), key)?;
    debug!(
        op_hash = %op_hash,
        sender = %op.sender,
        chain_id = session.chain_id,
        "signed user operation"
    );
    Ok(SignedOperation {
        operation: op,
        signature,
        op_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::{EncodingError, Error},
        utils::{bytes::parse_hex_bytes, crypto::recover_address},
    };

    const PAYMASTER: &str = "0x5555555555555555555555555555555555555555";

    fn network(sponsored: bool) -> NetworkPolicy {
        NetworkPolicy {
            network_id: "polygon-amoy".into(),
            chain_id: 80002,
            gsn_enabled: false,
            sponsorship_enabled: sponsored,
            entry_point: "0x0000000071727De22E5E9d8BAf0edAc6f37da032".into(),
            paymaster: Some(PAYMASTER.into()),
            job_manager: "0x6666666666666666666666666666666666666666".into(),
        }
    }

    fn gas() -> GasQuote {
        GasQuote {
            max_fee_per_gas: "0x59682f00".into(),
            max_priority_fee_per_gas: "0x3b9aca00".into(),
        }
    }

    fn session() -> SessionContext {
        SessionContext {
            user_address: "0x1111111111111111111111111111111111111111".into(),
            client_id: "client-123".into(),
            entry_point_address: "0x0000000071727De22E5E9d8BAf0edAc6f37da032".into(),
            chain_id: 80002,
        }
    }

    #[test]
    fn test_build_uses_config_limits() {
        let cfg = EngineConfig::default();
        let op = build_unsigned_operation(
            "0xABCD",
            "0x1111111111111111111111111111111111111111",
            "0x1",
            &gas(),
            &network(false),
            Some("0x1234".into()),
            &cfg,
        )
        .unwrap();
        assert_eq!(op.call_gas_limit, cfg.call_gas_limit);
        assert_eq!(op.verification_gas_limit, "0x30d40");
        assert_eq!(op.call_data, "0xabcd");
        assert_eq!(op.paymaster, None);
        assert_eq!(op.paymaster_data, "0x");
    }

    #[test]
    fn test_build_attaches_paymaster_when_sponsored() {
        let op = build_unsigned_operation(
            "0x",
            "0x1111111111111111111111111111111111111111",
            "0x1",
            &gas(),
            &network(true),
            Some("0x1234".into()),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(op.paymaster.as_deref(), Some(PAYMASTER));
        assert_eq!(op.paymaster_data, "0x1234");
    }

    #[test]
    fn test_build_rejects_oversized_fee() {
        let mut quote = gas();
        quote.max_fee_per_gas = format!("0x1{}", "0".repeat(32));
        let err = build_unsigned_operation(
            "0x",
            "0x1111111111111111111111111111111111111111",
            "0x1",
            &quote,
            &network(false),
            None,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Encoding(EncodingError::Overflow { .. })));
    }

    #[test]
    fn test_sign_operation_recovers_to_signer() {
        let key = SigningKey::from_hex(&format!("{:064x}", 7)).unwrap();
        let op = build_unsigned_operation(
            "0xdeadbeef",
            "0x1111111111111111111111111111111111111111",
            "0x1",
            &gas(),
            &network(false),
            None,
            &EngineConfig::default(),
        )
        .unwrap();
        let signed = sign_operation(op.clone(), &session(), &key).unwrap();

        assert_eq!(
            signed.op_hash(),
            user_operation_hash(&op, &session().entry_point_address, 80002).unwrap()
        );
        let sig = parse_hex_bytes(signed.signature(), "signature").unwrap();
        assert_eq!(sig.len(), 65);
        assert_eq!(
            recover_address(signed.op_hash().as_slice(), &sig).unwrap(),
            key.address()
        );
        assert_eq!(signed.operation(), &op);
    }

    #[test]
    fn test_sponsored_build_requires_paymaster_data() {
        for data in [None, Some("0x".to_string())] {
            let err = build_unsigned_operation(
                "0x",
                "0x1111111111111111111111111111111111111111",
                "0x1",
                &gas(),
                &network(true),
                data,
                &EngineConfig::default(),
            )
            .unwrap_err();
            assert_eq!(err, Error::Validation(ValidationError::MissingField("paymasterData")));
        }
    }

    #[test]
    fn test_deployment_mismatch_is_rejected() {
        let net = network(false);
        assert_eq!(ensure_same_deployment(&session(), &net), Ok(()));

        let mut other_chain = session();
        other_chain.chain_id = 1;
        assert_eq!(
            ensure_same_deployment(&other_chain, &net).unwrap_err(),
            Error::Validation(ValidationError::ContextMismatch("chainId"))
        );

        let mut other_entry_point = session();
        other_entry_point.entry_point_address = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".into();
        assert_eq!(
            ensure_same_deployment(&other_entry_point, &net).unwrap_err(),
            Error::Validation(ValidationError::ContextMismatch("entryPoint"))
        );

        // Address case does not matter.
        let mut lower = session();
        lower.entry_point_address = lower.entry_point_address.to_lowercase();
        assert_eq!(ensure_same_deployment(&lower, &net), Ok(()));
    }

    #[test]
    fn test_signed_operation_serializes_flat() {
        let key = SigningKey::from_hex(&format!("{:064x}", 7)).unwrap();
        let op = build_unsigned_operation(
            "0x",
            "0x1111111111111111111111111111111111111111",
            "0x1",
            &gas(),
            &network(true),
            Some("0xabcd".into()),
            &EngineConfig::default(),
        )
        .unwrap();
        let signed = sign_operation(op, &session(), &key).unwrap();
        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["sender"], "0x1111111111111111111111111111111111111111");
        assert_eq!(json["paymaster"], PAYMASTER);
        assert_eq!(json["paymasterData"], "0xabcd");
        assert_eq!(json["signature"], signed.signature());
        assert!(json.get("opHash").is_none());
    }
}
