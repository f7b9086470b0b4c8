//! Wire protocol spoken with the wake backend.
//!
//! Requests are JSON keyed by method name; every request carries the
//! session identifier so the backend can multiplex many sessions over one
//! connection. Responses carry a `success` flag plus either a payload or
//! an error message.

use sake_core::account::Address;
use sake_core::adapter::{CallRequest, DeployRequest, NetworkConfig, NetworkDump};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request envelope sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeRequest {
    /// Session the operation targets
    pub session_id: String,
    #[serde(flatten)]
    pub method: WakeMethod,
}

/// The backend operations, keyed by method name on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum WakeMethod {
    CreateChain { config: NetworkConfig },
    ConnectChain { uri: String },
    DisconnectChain,
    GetBalances { addresses: Vec<Address> },
    SetBalance { address: Address, balance: U256 },
    SetLabel { address: Address, label: Option<String> },
    Deploy { request: DeployRequest },
    Call { request: CallRequest },
    Transact { request: CallRequest },
    DumpState,
    LoadState { dump: NetworkDump },
    GetAbi { address: Address },
    Ping,
}

impl WakeMethod {
    /// Wire name of this method, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateChain { .. } => "create_chain",
            Self::ConnectChain { .. } => "connect_chain",
            Self::DisconnectChain => "disconnect_chain",
            Self::GetBalances { .. } => "get_balances",
            Self::SetBalance { .. } => "set_balance",
            Self::SetLabel { .. } => "set_label",
            Self::Deploy { .. } => "deploy",
            Self::Call { .. } => "call",
            Self::Transact { .. } => "transact",
            Self::DumpState => "dump_state",
            Self::LoadState { .. } => "load_state",
            Self::GetAbi { .. } => "get_abi",
            Self::Ping => "ping",
        }
    }
}

/// One response envelope from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One entry of a `get_balances` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub address: Address,
    pub balance: U256,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_carries_method_name_and_session_id() {
        let request = WakeRequest {
            session_id: "s1".to_string(),
            method: WakeMethod::Ping,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["sessionId"], "s1");
        assert_eq!(value["method"], "ping");
    }

    #[test]
    fn test_method_params_are_nested() {
        let request = WakeRequest {
            session_id: "s1".to_string(),
            method: WakeMethod::ConnectChain {
                uri: "http://127.0.0.1:8545".to_string(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "connect_chain");
        assert_eq!(value["params"]["uri"], "http://127.0.0.1:8545");
    }

    #[test]
    fn test_balance_serializes_as_hex_string() {
        let request = WakeRequest {
            session_id: "s1".to_string(),
            method: WakeMethod::SetBalance {
                address: Address::new("0xAA"),
                balance: U256::from(1_000_000u64),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["params"]["address"], "0xaa");
        assert!(value["params"]["balance"].is_string());
    }

    #[test]
    fn test_response_with_missing_fields_deserializes() {
        let response: WakeResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(response.success);
        assert!(response.data.is_none());
        assert!(response.error.is_none());
    }
}
