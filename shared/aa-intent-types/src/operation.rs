use serde::{Deserialize, Serialize};

/// ERC-4337 v0.7 user operation before signing.
///
/// Every numeric field is a `0x`-prefixed hex quantity; byte fields are `0x`-prefixed hex data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedOperation {
    /// Smart account address.
    pub sender: String,
    /// 32-byte key/sequence nonce.
    pub nonce: String,
    /// Sponsoring paymaster; `None` (or empty) when the account pays for itself.
    #[serde(default)]
    pub paymaster: Option<String>,
    pub call_gas_limit: String,
    pub verification_gas_limit: String,
    pub pre_verification_gas: String,
    pub max_fee_per_gas: String,
    pub max_priority_fee_per_gas: String,
    pub paymaster_verification_gas_limit: String,
    pub paymaster_post_op_gas_limit: String,
    pub call_data: String,
    #[serde(default = "empty_hex")]
    pub paymaster_data: String,
}

impl UnsignedOperation {
    /// Paymaster address when one is set and non-empty.
    pub fn paymaster_address(&self) -> Option<&str> {
        self.paymaster
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != "0x")
    }
}

fn empty_hex() -> String {
    "0x".to_string()
}
