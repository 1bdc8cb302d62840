// crates/substrate-server/src/startup.rs
// ============================================================================
// Module: Startup Validator
// Description: Fail-fast boot check that the routing table is complete and
//              every required route's backend class is allowed.
// Purpose: Prevent the process from ever accepting traffic with an
//          incomplete or misconfigured routing table.
// Dependencies: substrate-core, substrate-adapters
// ============================================================================

//! ## Overview
//! Runs once, single-threaded, before any router is mounted. For every
//! resource kind the operator marked required, it resolves a baseline route
//! under `(t_system, dev, project=None)` and checks the resolved
//! `backend_type` against the backend-class guard under `saas` (the
//! strictest mode any tenant could run in). A missing route or a disallowed
//! backend type is refused with a message naming the offending
//! `resource_kind`, matching the teacher's store/registry `readiness()`
//! convention of naming exactly what is missing rather than a generic
//! failure.

use substrate_adapters::ensure_backend_allowed;
use substrate_core::Mode;
use substrate_core::ResourceKind;
use substrate_core::RoutingRegistryStore;
use substrate_core::TenantId;
use thiserror::Error;

/// A required resource kind with no valid baseline route.
#[derive(Debug, Error)]
pub enum StartupValidationError {
    /// No route exists for `resource_kind` under the baseline scope.
    #[error("startup validation failed: missing route for resource_kind={0:?}")]
    MissingRoute(ResourceKind),
    /// The baseline route's backend type is forbidden for sellable modes.
    #[error("startup validation failed: resource_kind={resource_kind:?} backend_type={backend_type:?} is not allowed: {reason}")]
    ForbiddenBackendClass {
        /// Resource kind whose route failed the guard.
        resource_kind: ResourceKind,
        /// Disallowed backend type.
        backend_type: String,
        /// Underlying guard error text.
        reason: String,
    },
    /// The registry store could not be queried.
    #[error("startup validation failed: registry lookup error: {0}")]
    RegistryUnavailable(String),
}

/// Validates that every resource kind in `required` has a usable baseline
/// route before the server is allowed to accept traffic.
///
/// # Errors
///
/// Returns [`StartupValidationError`] naming the first resource kind that
/// fails validation.
pub fn validate_startup(registry: &dyn RoutingRegistryStore, required: &[ResourceKind]) -> Result<(), StartupValidationError> {
    let system_tenant = TenantId::system();
    for &resource_kind in required {
        let route = registry
            .get_exact_route(resource_kind, system_tenant.as_str(), "dev", None)
            .map_err(|err| StartupValidationError::RegistryUnavailable(err.to_string()))?
            .ok_or(StartupValidationError::MissingRoute(resource_kind))?;
        ensure_backend_allowed(Mode::Saas, resource_kind, &route.backend_type).map_err(|err| StartupValidationError::ForbiddenBackendClass {
            resource_kind,
            backend_type: route.backend_type.clone(),
            reason: err.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use substrate_core::AdapterError;
    use substrate_core::Env;
    use substrate_core::ResourceRoute;
    use substrate_core::RouteFilters;
    use substrate_core::core::identifiers::RouteId;
    use substrate_core::core::time::Timestamp;

    use super::*;

    struct FakeRegistry {
        routes: Vec<ResourceRoute>,
    }

    impl RoutingRegistryStore for FakeRegistry {
        fn upsert_route(&self, route: ResourceRoute) -> Result<ResourceRoute, AdapterError> {
            Ok(route)
        }

        fn get_exact_route(&self, resource_kind: ResourceKind, tenant_id: &str, env: &str, project_id: Option<&str>) -> Result<Option<ResourceRoute>, AdapterError> {
            Ok(self
                .routes
                .iter()
                .find(|r| r.resource_kind == resource_kind && r.tenant_id.as_str() == tenant_id && r.env.as_str() == env && r.project_id.is_none() == project_id.is_none())
                .cloned())
        }

        fn list_routes(&self, _filters: &RouteFilters) -> Result<Vec<ResourceRoute>, AdapterError> {
            Ok(self.routes.clone())
        }

        fn delete_route(&self, _id: &str) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    fn route(resource_kind: ResourceKind, backend_type: &str) -> ResourceRoute {
        ResourceRoute {
            id: RouteId::new("route-1"),
            resource_kind,
            tenant_id: TenantId::system(),
            env: Env::Dev,
            project_id: None,
            surface_id: None,
            backend_type: backend_type.to_owned(),
            config: BTreeMap::new(),
            required: true,
            tier: None,
            cost_notes: None,
            health_status: None,
            previous_backend_type: None,
            last_switch_time: None,
            switch_rationale: None,
            created_at: Timestamp::from_unix_millis(0),
            updated_at: Timestamp::from_unix_millis(0),
        }
    }

    #[test]
    fn passes_when_every_required_route_resolves_to_an_allowed_backend() {
        let registry = FakeRegistry {
            routes: vec![route(ResourceKind::RoutingRegistry, "s3")],
        };
        let result = validate_startup(&registry, &[ResourceKind::RoutingRegistry]);
        assert!(result.is_ok());
    }

    #[test]
    fn fails_when_a_required_route_is_missing() {
        let registry = FakeRegistry {
            routes: vec![],
        };
        let err = validate_startup(&registry, &[ResourceKind::EventStream]).unwrap_err();
        assert!(matches!(err, StartupValidationError::MissingRoute(ResourceKind::EventStream)));
    }

    #[test]
    fn fails_when_a_required_route_uses_a_forbidden_backend() {
        let registry = FakeRegistry {
            routes: vec![route(ResourceKind::ObjectStore, "filesystem")],
        };
        let err = validate_startup(&registry, &[ResourceKind::ObjectStore]).unwrap_err();
        assert!(matches!(err, StartupValidationError::ForbiddenBackendClass { .. }));
    }
}
