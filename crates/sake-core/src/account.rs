//! Account domain model.
//!
//! Addresses are normalized to lowercase hex at every construction point,
//! so store membership checks are exact-match safe regardless of the casing
//! the backend or the user supplied.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chain address, held in normalized (lowercase hex) form.
///
/// Equality and hashing operate on the normalized form, which makes two
/// addresses differing only in checksum casing compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Creates an address from any casing of a hex string.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Returns the normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// An account visible in a session's account store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Normalized lowercase address
    pub address: Address,
    /// Current balance in base units
    pub balance: U256,
    /// Optional user-assigned nickname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl Account {
    /// Creates an account with no nickname.
    pub fn new(address: impl Into<Address>, balance: U256) -> Self {
        Self {
            address: address.into(),
            balance,
            nickname: None,
        }
    }
}
