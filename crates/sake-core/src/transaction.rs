//! Transaction history records.
//!
//! Each session keeps an append-only list of these; a record is never
//! mutated after insertion. The `success` flag distinguishes a reverted
//! transaction (which still produced a record) from one that succeeded.
//! An adapter-level failure produces no record at all.

use crate::account::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw and decoded return data of a call or transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    /// Hex-encoded raw return bytes
    pub raw: String,
    /// Decoded form, when the ABI allowed decoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded: Option<Value>,
}

/// One entry in a session's transaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionRecord {
    /// A contract deployment attempt.
    Deployment {
        success: bool,
        /// Display name of the deployed contract
        name: String,
        /// Address assigned by the backend, present on success
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<Address>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receipt: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_trace: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A function call or state-changing transaction.
    FunctionCall {
        success: bool,
        /// Target contract address
        to: Address,
        /// Function name or signature
        function: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<TxOutput>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receipt: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_trace: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl TransactionRecord {
    /// Whether the underlying chain operation succeeded.
    pub fn success(&self) -> bool {
        match self {
            Self::Deployment { success, .. } | Self::FunctionCall { success, .. } => *success,
        }
    }
}
