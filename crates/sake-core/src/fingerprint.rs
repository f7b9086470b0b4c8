//! State fingerprinting.
//!
//! A fingerprint is a SHA-256 digest over the canonical JSON form of a
//! session's serializable state subset. It is stored alongside every
//! persisted dump and re-verified best-effort on load: a mismatch signals
//! drift between the dump and the expected state, but never blocks loading.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Computes the hex fingerprint of any serializable value.
///
/// `serde_json` keeps object keys sorted, so serializing through `Value`
/// yields a canonical byte sequence for structurally equal inputs.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let canonical: Value = serde_json::to_value(value)?;
    let bytes = serde_json::to_vec(&canonical)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
