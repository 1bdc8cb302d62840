// crates/substrate-core/src/core/time.rs
// ============================================================================
// Module: Substrate Time Model
// Description: Canonical timestamp representation used across envelopes and audit entries.
// Purpose: Provide a single wall-clock timestamp type with a deterministic test seam.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every persisted envelope and audit entry carries a single timestamp type.
//! Production code stamps timestamps via [`Timestamp::now`]; tests and replay
//! tooling construct them directly via [`Timestamp::from_unix_millis`] so
//! ordering assertions stay deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix-epoch millisecond timestamp used in envelopes, routes, and audit entries.
///
/// # Invariants
/// - Values are non-negative; construction from [`SystemTime`] before the
///   epoch clamps to zero rather than panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));
        Self(millis)
    }

    /// Constructs a timestamp from raw unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}
