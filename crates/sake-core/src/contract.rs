//! Contract domain models.
//!
//! Two distinct populations live here: contracts compiled from workspace
//! sources (shared across every session, because compilation is a
//! workspace-wide concept) and contracts deployed or discovered on a
//! particular session's chain.

use crate::account::Address;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A contract produced by the workspace compiler.
///
/// Lives in the single global compiled-contract store; all sessions observe
/// the same set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledContract {
    /// Fully-qualified name, e.g. `contracts/Token.sol:Token`
    pub fqn: String,
    /// Short display name
    pub name: String,
    /// Contract ABI as produced by the compiler
    pub abi: Value,
    /// Whether the artifact can be deployed (abstract contracts and
    /// interfaces cannot)
    pub is_deployable: bool,
}

/// An implementation contract discovered behind a proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationContract {
    /// Identifier used for explicit removal
    pub id: String,
    /// Implementation address, if the backend could resolve one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Implementation ABI
    pub abi: Value,
    /// Display name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A contract present on a session's chain.
///
/// Deployed either from a compiled artifact (carries the artifact's
/// fully-qualified name) or discovered on-chain by address (no source
/// artifact, `fqn` is `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedContract {
    /// Normalized lowercase address
    pub address: Address,
    /// Display name
    pub name: String,
    /// Fully-qualified name of the source artifact, when deployed from one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqn: Option<String>,
    /// Contract ABI
    pub abi: Value,
    /// Last observed balance, if queried
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<U256>,
    /// Implementation chain discovered behind a proxy. Append-only except
    /// for explicit removal by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxy_for: Vec<ImplementationContract>,
}

impl DeployedContract {
    /// Creates a record for a contract deployed from a compiled artifact.
    pub fn from_artifact(
        address: impl Into<Address>,
        name: impl Into<String>,
        fqn: impl Into<String>,
        abi: Value,
    ) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            fqn: Some(fqn.into()),
            abi,
            balance: None,
            proxy_for: Vec::new(),
        }
    }

    /// Creates a record for a contract discovered on-chain.
    pub fn onchain(address: impl Into<Address>, name: impl Into<String>, abi: Value) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            fqn: None,
            abi,
            balance: None,
            proxy_for: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deployed_contract_address_is_normalized() {
        let contract = DeployedContract::onchain("0xDEAD", "Found", json!([]));
        assert_eq!(contract.address.as_str(), "0xdead");
        assert!(contract.fqn.is_none());
    }

    #[test]
    fn test_missing_optional_fields_take_defaults() {
        let json = json!({
            "address": "0xaa",
            "name": "Token",
            "abi": []
        });
        let contract: DeployedContract = serde_json::from_value(json).unwrap();
        assert!(contract.proxy_for.is_empty());
        assert!(contract.balance.is_none());
    }
}
