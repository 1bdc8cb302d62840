// crates/substrate-gate/src/request_id.rs
// ============================================================================
// Module: Request Id Generation
// Description: Boot-scoped generator for auto-assigned request identifiers.
// Purpose: Give every resolved context a stable, collision-free request id
//          when the caller did not supply `X-Request-Id`.
// Dependencies: rand, substrate-core
// ============================================================================

//! ## Overview
//! Request ids generated here are unique within the process lifetime: a
//! random boot id fixes the process, and a monotonic counter fixes the
//! request within that process. Callers that do supply `X-Request-Id` skip
//! this generator entirely; it only fills the gap.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use substrate_core::RequestId;

/// Boot-scoped request id generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct RequestIdGenerator {
    prefix: &'static str,
    boot_id: u64,
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a new generator with the given prefix.
    #[must_use]
    pub fn new(prefix: &'static str) -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            prefix,
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new request id.
    #[must_use]
    pub fn issue(&self) -> RequestId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        RequestId::new(format!("{}-{:016x}-{:016x}", self.prefix, self.boot_id, seq))
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new("req")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_ids_are_unique_and_prefixed() {
        let generator = RequestIdGenerator::new("req");
        let first = generator.issue();
        let second = generator.issue();
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("req-"));
    }
}
