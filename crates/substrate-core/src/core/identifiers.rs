// crates/substrate-core/src/core/identifiers.rs
// ============================================================================
// Module: Substrate Identifiers
// Description: Canonical opaque identifiers for tenants, resources, and streams.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout the control
//! plane. Identifiers are opaque and serialize as strings on the wire.
//! `TenantId` enforces the `^t_[a-z0-9_-]+$` wire format at construction
//! boundaries; the remaining identifiers are free-form non-empty strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Tenant Identifier
// ============================================================================

/// The hardcoded system tenant used for global-default routes and bootstrap.
pub const SYSTEM_TENANT: &str = "t_system";

/// Tenant identifier scoped to the control plane.
///
/// # Invariants
/// - Always matches `^t_[a-z0-9_-]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

/// Error returned when a tenant identifier fails validation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("tenant id {0:?} does not match ^t_[a-z0-9_-]+$")]
pub struct TenantIdInvalid(String);

impl TenantId {
    /// Returns the reserved system tenant identifier.
    #[must_use]
    pub fn system() -> Self {
        Self(SYSTEM_TENANT.to_owned())
    }

    /// Parses and validates a tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TenantIdInvalid`] when `raw` does not match the tenant wire format.
    pub fn parse(raw: &str) -> Result<Self, TenantIdInvalid> {
        if is_valid_tenant_id(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(TenantIdInvalid(raw.to_owned()))
        }
    }

    /// Returns the tenant identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when this tenant is the reserved system tenant.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_TENANT
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for TenantId {
    type Error = TenantIdInvalid;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdInvalid;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Returns true when `raw` matches the tenant id wire format `^t_[a-z0-9_-]+$`.
#[must_use]
pub fn is_valid_tenant_id(raw: &str) -> bool {
    let Some(rest) = raw.strip_prefix("t_") else {
        return false;
    };
    !rest.is_empty()
        && rest
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

// ============================================================================
// SECTION: Free-Form Opaque Identifiers
// ============================================================================

/// Declares an opaque, non-empty string identifier newtype with the
/// standard `new`/`as_str`/`Display`/`From` surface used across the crate.
macro_rules! opaque_string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from an owned string.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_string_id!(ProjectId, "Project identifier scoped to a tenant.");
opaque_string_id!(SurfaceId, "Surface identifier; always stored in canonical form.");
opaque_string_id!(AppId, "Application identifier scoped to a tenant.");
opaque_string_id!(UserId, "User identifier overlaid from a bearer token.");
opaque_string_id!(ActorId, "Actor identifier attached to emitted envelopes.");
opaque_string_id!(RequestId, "Per-request correlation identifier.");
opaque_string_id!(TraceId, "Cross-request trace correlation identifier.");
opaque_string_id!(RunId, "Run correlation identifier.");
opaque_string_id!(StepId, "Step correlation identifier within a run.");
opaque_string_id!(RouteId, "Stable identifier of a `ResourceRoute` record.");
opaque_string_id!(StreamId, "Identifier of an append-only event stream.");
opaque_string_id!(EventId, "Monotonic, sortable identifier of a stream event.");
opaque_string_id!(IdempotencyKey, "Caller-supplied idempotency key for stream appends.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_accepts_valid_forms() {
        assert!(TenantId::parse("t_acme").is_ok());
        assert!(TenantId::parse("t_acme-prod_01").is_ok());
        assert!(TenantId::system().is_system());
    }

    #[test]
    fn tenant_id_rejects_invalid_forms() {
        assert!(TenantId::parse("acme").is_err());
        assert!(TenantId::parse("t_").is_err());
        assert!(TenantId::parse("t_Acme").is_err());
        assert!(TenantId::parse("t_acme!").is_err());
    }
}
