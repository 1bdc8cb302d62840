// crates/substrate-adapters/src/backend_class.rs
// ============================================================================
// Module: Backend Class Guard
// Description: Enforces the durable-backend policy for sellable deployment modes.
// Purpose: Prevent any component from silently falling back to a non-durable backend.
// Dependencies: substrate-core
// ============================================================================

//! ## Overview
//! `saas` and `enterprise` tenants (and anything resolved against the
//! `t_system` baseline) may never be handed a non-durable adapter. This
//! module is the single place that decision is made; the adapter factory in
//! [`crate::factory`] calls it before constructing anything.
//!
//! Security posture: this guard is structural, not a convention callers must
//! remember — the factory cannot construct a forbidden adapter without
//! calling [`ensure_backend_allowed`] first.

use substrate_core::Mode;
use substrate_core::ResourceKind;
use substrate_core::SubstrateError;

/// Backend type strings that are never durable and therefore forbidden
/// outside `lab` mode.
pub const FORBIDDEN_BACKEND_TYPES: &[&str] = &["filesystem", "in_memory", "noop", "local", "tmp"];

/// Returns true when `backend_type` matches one of the forbidden classes,
/// including the `localhost-*` wildcard family.
#[must_use]
pub fn is_forbidden_backend_type(backend_type: &str) -> bool {
    FORBIDDEN_BACKEND_TYPES.contains(&backend_type) || backend_type.starts_with("localhost-")
}

/// Enforces the backend-class guard for `resource_kind`/`backend_type` under `mode`.
///
/// # Errors
///
/// Returns [`SubstrateError::ForbiddenBackendClass`] when `mode` is sellable
/// (`saas` or `enterprise`) and `backend_type` is non-durable.
pub fn ensure_backend_allowed(mode: Mode, resource_kind: ResourceKind, backend_type: &str) -> Result<(), SubstrateError> {
    if mode.is_sellable() && is_forbidden_backend_type(backend_type) {
        return Err(SubstrateError::ForbiddenBackendClass {
            resource_kind,
            backend_type: backend_type.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saas_rejects_filesystem() {
        let err = ensure_backend_allowed(Mode::Saas, ResourceKind::ObjectStore, "filesystem");
        assert!(matches!(err, Err(SubstrateError::ForbiddenBackendClass { .. })));
    }

    #[test]
    fn lab_permits_filesystem() {
        assert!(ensure_backend_allowed(Mode::Lab, ResourceKind::ObjectStore, "filesystem").is_ok());
    }

    #[test]
    fn enterprise_rejects_localhost_wildcard() {
        let err = ensure_backend_allowed(Mode::Enterprise, ResourceKind::EventStream, "localhost-dev");
        assert!(err.is_err());
    }

    #[test]
    fn saas_permits_durable_backend() {
        assert!(ensure_backend_allowed(Mode::Saas, ResourceKind::ObjectStore, "s3").is_ok());
    }
}
