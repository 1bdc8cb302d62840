// crates/substrate-core/src/core/hashing.rs
// ============================================================================
// Module: Substrate Hashing
// Description: Canonical JSON serialization and hash-chain primitives.
// Purpose: Give the audit chain a single, stable way to hash entries.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Audit entries are hash-chained: `hash_i = SHA256(jcs(payload_i) || hash_{i-1})`.
//! Canonicalizing with JCS before hashing keeps the digest stable regardless of
//! struct field order or serializer whitespace choices.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// A SHA-256 digest rendered as lowercase hex on the wire.
///
/// # Invariants
/// - Always exactly 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HashDigest([u8; 32]);

impl HashDigest {
    /// The all-zero digest used as the `prev_hash` of the first entry in a chain.
    pub const GENESIS: Self = Self([0u8; 32]);

    /// Returns the digest as a lowercase hex string.
    #[must_use]
    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parses a digest from a lowercase hex string.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Errors raised while canonicalizing or hashing a payload.
#[derive(Debug, Error)]
pub enum HashingError {
    /// The payload could not be serialized to canonical JSON.
    #[error("canonical json serialization failed: {0}")]
    Canonicalize(String),
}

/// Serializes `value` to JCS-canonical JSON bytes.
///
/// # Errors
///
/// Returns [`HashingError::Canonicalize`] when `value` cannot be serialized.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashingError> {
    serde_jcs::to_vec(value).map_err(|err| HashingError::Canonicalize(err.to_string()))
}

/// Computes the next hash in a chain: `SHA256(canonical(payload) || prev_hash)`.
///
/// # Errors
///
/// Returns [`HashingError::Canonicalize`] when `payload` cannot be canonicalized.
pub fn chain_hash<T: Serialize>(payload: &T, prev_hash: HashDigest) -> Result<HashDigest, HashingError> {
    let canonical = canonical_json_bytes(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hasher.update(prev_hash.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Ok(HashDigest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        a: u32,
        b: &'static str,
    }

    #[test]
    fn chain_hash_is_deterministic() {
        let payload = Sample { a: 1, b: "x" };
        let first = chain_hash(&payload, HashDigest::GENESIS).expect("hash");
        let second = chain_hash(&payload, HashDigest::GENESIS).expect("hash");
        assert_eq!(first, second);
    }

    #[test]
    fn chain_hash_changes_with_prev_hash() {
        let payload = Sample { a: 1, b: "x" };
        let first = chain_hash(&payload, HashDigest::GENESIS).expect("hash");
        let second = chain_hash(&payload, first).expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn hex_round_trips() {
        let payload = Sample { a: 7, b: "y" };
        let digest = chain_hash(&payload, HashDigest::GENESIS).expect("hash");
        let hex = digest.to_hex();
        assert_eq!(HashDigest::from_hex(&hex), Some(digest));
    }
}
