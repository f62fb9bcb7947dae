use serde::{Deserialize, Serialize};

/// Snapshot of the currently selected network, as published by the network-selection provider.
///
/// Read once at the call boundary and never mutated while an operation is being encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicy {
    pub network_id: String,
    pub chain_id: u64,
    pub gsn_enabled: bool,
    pub sponsorship_enabled: bool,
    pub entry_point: String,
    #[serde(default)]
    pub paymaster: Option<String>,
    /// Contract that executes job calls on behalf of the smart account.
    pub job_manager: String,
}

/// Network-selection provider abstraction, implemented by the host application.
pub trait NetworkSelection {
    /// Current selection, or `None` when the user has not picked a network.
    fn snapshot(&self) -> Option<NetworkPolicy>;
}

impl NetworkSelection for Option<NetworkPolicy> {
    fn snapshot(&self) -> Option<NetworkPolicy> {
        self.clone()
    }
}

impl NetworkSelection for NetworkPolicy {
    fn snapshot(&self) -> Option<NetworkPolicy> {
        Some(self.clone())
    }
}

/// Per-session values supplied by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub user_address: String,
    pub client_id: String,
    pub entry_point_address: String,
    pub chain_id: u64,
}

/// Gas price quote from the oracle (hex quantities).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasQuote {
    pub max_fee_per_gas: String,
    pub max_priority_fee_per_gas: String,
}
