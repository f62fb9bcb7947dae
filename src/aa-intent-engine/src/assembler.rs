//! UserOperation assembler: turns an intent into the account's opaque `callData`.
//!
//! Layout (all ABI-encoded):
//! - inner call = `selector(job fn) || (jobId, clientId, userAddress, feePayerAddress,
//!   policyBytes, sponsorshipBytes, jobParameters, intentTypeTag)`
//! - `callData` = `(bytes4 functionSelector, address target, uint256 value = 0, bytes innerCall)`

use aa_intent_types::{Intent, NetworkPolicy, SessionContext};
use alloy_primitives::U256;
use tracing::debug;

use crate::{
    abi::{encode, encode_types, params, selector, with_offset_prefix, AbiType, AbiValue},
    config::EngineConfig,
    errors::Result,
    intent::job_parameters,
    utils::bytes::{normalize_address, quantity_to_be, to_hex},
};

/// Parameter types of the job executor function, in order.
pub fn job_call_types() -> Vec<AbiType> {
    vec![
        AbiType::Uint(256),
        AbiType::String,
        AbiType::Address,
        AbiType::Address,
        AbiType::Bytes,
        AbiType::Bytes,
        AbiType::Bytes,
        AbiType::String,
    ]
}

/// Gas sponsorship requirements attached to a job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SponsorshipDescriptor {
    pub is_required: bool,
    pub required_networks: Vec<String>,
    pub tokens: Vec<Vec<u8>>,
}

impl SponsorshipDescriptor {
    /// `(bool isRequired, string[] requiredNetworks, bytes[] tokens)`, offset-wrapped.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let specs = params(&[
            ("isRequired", AbiType::Bool),
            ("requiredNetworks", AbiType::Array(Box::new(AbiType::String))),
            ("tokens", AbiType::Array(Box::new(AbiType::Bytes))),
        ]);
        let values = [
            AbiValue::Bool(self.is_required),
            AbiValue::Array(self.required_networks.iter().map(|n| AbiValue::string(n.as_str())).collect()),
            AbiValue::Array(self.tokens.iter().cloned().map(AbiValue::Bytes).collect()),
        ];
        encode(&specs, &values).map(with_offset_prefix)
    }
}

/// `(bool gsnEnabled, bool sponsorshipEnabled)` from the network snapshot; both false without one.
pub fn policy_bytes(network: Option<&NetworkPolicy>) -> Result<Vec<u8>> {
    let (gsn, sponsorship) = network
        .map(|n| (n.gsn_enabled, n.sponsorship_enabled))
        .unwrap_or((false, false));
    encode_types(
        &[AbiType::Bool, AbiType::Bool],
        &[AbiValue::Bool(gsn), AbiValue::Bool(sponsorship)],
    )
}

/// Job id: the 32 nonce bytes read in reverse order as a big-endian integer.
pub fn job_id(nonce: &[u8; 32]) -> U256 {
    let mut reversed = *nonce;
    reversed.reverse();
    U256::from_be_bytes(reversed)
}

/// Fee payer recorded in the job: the paymaster when the network sponsors gas, else the user.
pub fn fee_payer(network: Option<&NetworkPolicy>, user_address: &str) -> Result<String> {
    match network {
        Some(NetworkPolicy {
            sponsorship_enabled: true,
            paymaster: Some(paymaster),
            ..
        }) if !paymaster.trim().is_empty() => normalize_address(paymaster, "paymaster"),
        _ => normalize_address(user_address, "userAddress"),
    }
}

/// Inputs of one call-data assembly. `network` is the snapshot taken at the call boundary.
#[derive(Clone, Copy, Debug)]
pub struct JobRequest<'a> {
    pub intent: &'a Intent,
    pub session: &'a SessionContext,
    /// 32-byte operation nonce (hex quantity).
    pub nonce: &'a str,
    /// Contract that receives the inner job call.
    pub target: &'a str,
    pub network: Option<&'a NetworkPolicy>,
    pub sponsorship: &'a SponsorshipDescriptor,
}

/// Assemble `callData` bytes.
pub fn assemble_call_data_bytes(req: &JobRequest<'_>, config: &EngineConfig) -> Result<Vec<u8>> {
    let job_params = job_parameters(req.intent)?;
    let sponsorship = req.sponsorship.encode()?;
    let policy = policy_bytes(req.network)?;

    let types = job_call_types();
    let job_selector = selector(&config.job_function_name, &types);
    let nonce = quantity_to_be::<32>(req.nonce, "nonce")?;

    let inner_args = encode_types(
        &types,
        &[
            AbiValue::Uint(job_id(&nonce)),
            AbiValue::string(&req.session.client_id),
            AbiValue::address(&req.session.user_address),
            AbiValue::Address(fee_payer(req.network, &req.session.user_address)?),
            AbiValue::Bytes(policy),
            AbiValue::Bytes(sponsorship),
            AbiValue::Bytes(job_params),
            AbiValue::string(req.intent.type_tag()),
        ],
    )?;
    let mut inner = Vec::with_capacity(4 + inner_args.len());
    inner.extend_from_slice(&job_selector);
    inner.extend(inner_args);

    let call_data = encode_types(
        &[
            AbiType::FixedBytes(4),
            AbiType::Address,
            AbiType::Uint(256),
            AbiType::Bytes,
        ],
        &[
            AbiValue::FixedBytes(job_selector.to_vec()),
            AbiValue::address(req.target),
            AbiValue::Uint(U256::ZERO),
            AbiValue::Bytes(inner),
        ],
    )?;

    debug!(
        kind = req.intent.type_tag(),
        network = req.network.map(|n| n.network_id.as_str()).unwrap_or("none"),
        selector = %to_hex(&job_selector),
        len = call_data.len(),
        "assembled call data"
    );
    Ok(call_data)
}

/// Assemble `callData` as lowercase `0x` hex.
pub fn assemble_call_data(req: &JobRequest<'_>, config: &EngineConfig) -> Result<String> {
    assemble_call_data_bytes(req, config).map(|b| to_hex(&b))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, Bytes, FixedBytes};
    use alloy_sol_types::SolValue;

    use super::*;
    use crate::errors::{EncodingError, Error, ValidationError};

    const USER: &str = "0x1111111111111111111111111111111111111111";
    const PAYMASTER: &str = "0x5555555555555555555555555555555555555555";
    const JOB_MANAGER: &str = "0x6666666666666666666666666666666666666666";

    fn session() -> SessionContext {
        SessionContext {
            user_address: USER.into(),
            client_id: "client-123".into(),
            entry_point_address: "0x0000000071727De22E5E9d8BAf0edAc6f37da032".into(),
            chain_id: 80002,
        }
    }

    fn network(sponsored: bool) -> NetworkPolicy {
        NetworkPolicy {
            network_id: "polygon-amoy".into(),
            chain_id: 80002,
            gsn_enabled: true,
            sponsorship_enabled: sponsored,
            entry_point: "0x0000000071727De22E5E9d8BAf0edAc6f37da032".into(),
            paymaster: Some(PAYMASTER.into()),
            job_manager: JOB_MANAGER.into(),
        }
    }

    fn transfer() -> Intent {
        Intent::TokenTransfer {
            recipient: "0x2222222222222222222222222222222222222222".into(),
            token_address: "0x3333333333333333333333333333333333333333".into(),
            amount: "5".into(),
            network_id: "polygon-amoy".into(),
        }
    }

    #[test]
    fn test_job_id_reverses_nonce_bytes() {
        let mut nonce = [0u8; 32];
        nonce[0] = 0x01;
        assert_eq!(job_id(&nonce), U256::from(1u64));
        nonce = [0u8; 32];
        nonce[31] = 0x01;
        assert_eq!(job_id(&nonce), U256::from(1u64) << 248);
    }

    #[test]
    fn test_policy_defaults_to_false_without_network() {
        assert_eq!(policy_bytes(None).unwrap(), vec![0u8; 64]);
        let on = policy_bytes(Some(&network(true))).unwrap();
        assert_eq!((on[31], on[63]), (1, 1));
    }

    #[test]
    fn test_default_sponsorship_descriptor() {
        let expected = (false, Vec::<String>::new(), Vec::<Bytes>::new()).abi_encode();
        assert_eq!(SponsorshipDescriptor::default().encode().unwrap(), expected);
    }

    #[test]
    fn test_fee_payer_choice() {
        assert_eq!(fee_payer(Some(&network(true)), USER).unwrap(), PAYMASTER);
        assert_eq!(fee_payer(Some(&network(false)), USER).unwrap(), USER);
        assert_eq!(fee_payer(None, USER).unwrap(), USER);
    }

    #[test]
    fn test_call_data_layout_matches_reference_encoding() {
        let intent = transfer();
        let session = session();
        let net = network(true);
        let sponsorship = SponsorshipDescriptor::default();
        let nonce = "0x0000000000000000000000000000000000000000000000000000000000000001";
        let req = JobRequest {
            intent: &intent,
            session: &session,
            nonce,
            target: JOB_MANAGER,
            network: Some(&net),
            sponsorship: &sponsorship,
        };
        let ours = assemble_call_data_bytes(&req, &EngineConfig::default()).unwrap();

        let sel = selector("executeJob", &job_call_types());
        let inner_args = (
            U256::from(1u64) << 248,
            "client-123".to_string(),
            USER.parse::<Address>().unwrap(),
            PAYMASTER.parse::<Address>().unwrap(),
            Bytes::from(policy_bytes(Some(&net)).unwrap()),
            Bytes::from(sponsorship.encode().unwrap()),
            Bytes::from(job_parameters(&intent).unwrap()),
            "token_transfer".to_string(),
        )
            .abi_encode_params();
        let mut inner = sel.to_vec();
        inner.extend(inner_args);
        let expected = (
            FixedBytes::<4>::from(sel),
            JOB_MANAGER.parse::<Address>().unwrap(),
            U256::ZERO,
            Bytes::from(inner),
        )
            .abi_encode_params();

        assert_eq!(hex::encode(&ours), hex::encode(&expected));
        assert_eq!(&ours[..4], &sel);
        assert_eq!(
            assemble_call_data(&req, &EngineConfig::default()).unwrap(),
            format!("0x{}", hex::encode(expected))
        );
    }

    #[test]
    fn test_failures_propagate_unchanged() {
        let session = session();
        let sponsorship = SponsorshipDescriptor::default();
        let intent = transfer();
        let bad_target = JobRequest {
            intent: &intent,
            session: &session,
            nonce: "0x1",
            target: "0x66",
            network: None,
            sponsorship: &sponsorship,
        };
        assert!(matches!(
            assemble_call_data(&bad_target, &EngineConfig::default()).unwrap_err(),
            Error::Encoding(EncodingError::MalformedInput(_))
        ));

        let empty = Intent::RawTransaction {
            from: USER.into(),
            to: String::new(),
            data: "0x".into(),
            value: "0".into(),
            chain_id: 1,
        };
        let req = JobRequest { intent: &empty, target: JOB_MANAGER, ..bad_target };
        assert_eq!(
            assemble_call_data(&req, &EngineConfig::default()).unwrap_err(),
            Error::Validation(ValidationError::MissingField("to"))
        );
    }
}
