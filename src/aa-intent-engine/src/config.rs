//! Engine configuration: every constant the remote verifier must agree on.

use serde::{Deserialize, Serialize};

/// Six hours, the validity window of a session's paymaster authorization.
pub const DEFAULT_PAYMASTER_VALIDITY_SECS: u64 = 6 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Name of the job executor function; its signature is fixed by the assembler.
    pub job_function_name: String,

    /// Gas limits used for freshly built operations (hex quantities).
    pub call_gas_limit: String,
    pub verification_gas_limit: String,
    pub pre_verification_gas: String,
    pub paymaster_verification_gas_limit: String,
    pub paymaster_post_op_gas_limit: String,

    /// Fee ceilings written into session data.
    pub session_max_fee_per_gas: String,
    pub session_max_priority_fee_per_gas: String,

    pub paymaster_validity_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            job_function_name: "executeJob".into(),
            call_gas_limit: "0x927c0".into(),
            verification_gas_limit: "0x30d40".into(),
            pre_verification_gas: "0xc350".into(),
            paymaster_verification_gas_limit: "0x186a0".into(),
            paymaster_post_op_gas_limit: "0xc350".into(),
            session_max_fee_per_gas: "0x174876e800".into(),
            session_max_priority_fee_per_gas: "0x3b9aca00".into(),
            paymaster_validity_secs: DEFAULT_PAYMASTER_VALIDITY_SECS,
        }
    }
}
