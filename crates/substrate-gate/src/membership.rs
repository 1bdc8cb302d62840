// crates/substrate-gate/src/membership.rs
// ============================================================================
// Module: Membership Authorization
// Description: Tenant membership lookup used by the gate chain's membership
//              gate.
// Purpose: Provide a pluggable, fail-closed membership seam so services can
//          back it with a durable store without coupling the gate chain to one.
// Dependencies: substrate-core
// ============================================================================

//! A context with no `user_id` is treated as a service-to-service or
//! lab-tooling call and passes membership evaluation unconditionally: the
//! membership gate only has an identity to check when one was resolved.

use std::collections::BTreeMap;

use substrate_core::Membership;
use substrate_core::MembershipRole;
use substrate_core::RequestContext;
use substrate_core::TenantId;
use substrate_core::UserId;

/// Outcome of a membership check, carrying an audit-facing reason.
#[derive(Debug, Clone)]
pub struct MembershipDecision {
    /// Whether the caller is a member of the resolved tenant.
    pub allowed: bool,
    /// Reason label suitable for the `SAFETY_DECISION` audit event.
    pub reason: String,
}

impl MembershipDecision {
    fn allow(reason: &'static str) -> Self {
        Self {
            allowed: true,
            reason: reason.to_owned(),
        }
    }

    fn deny(reason: &'static str) -> Self {
        Self {
            allowed: false,
            reason: reason.to_owned(),
        }
    }
}

/// Tenant membership authorization interface.
pub trait MembershipAuthorizer: Send + Sync {
    /// Authorizes `ctx`'s resolved `(user_id, tenant_id)` pair.
    fn authorize(&self, ctx: &RequestContext) -> MembershipDecision;
}

/// In-memory membership table, keyed by `(user_id, tenant_id)`.
///
/// # Invariants
/// - At most one role is stored per `(user_id, tenant_id)` pair.
#[derive(Debug, Default)]
pub struct StaticMembershipAuthorizer {
    memberships: BTreeMap<(UserId, TenantId), MembershipRole>,
}

impl StaticMembershipAuthorizer {
    /// Builds an authorizer from a list of durable membership records.
    #[must_use]
    pub fn from_memberships(records: impl IntoIterator<Item = Membership>) -> Self {
        let memberships = records.into_iter().map(|m| ((m.user_id, m.tenant_id), m.role)).collect();
        Self {
            memberships,
        }
    }
}

impl MembershipAuthorizer for StaticMembershipAuthorizer {
    fn authorize(&self, ctx: &RequestContext) -> MembershipDecision {
        let Some(user_id) = &ctx.user_id else {
            return MembershipDecision::allow("no_user_id_service_call");
        };
        if self.memberships.contains_key(&(user_id.clone(), ctx.tenant_id.clone())) {
            MembershipDecision::allow("membership_found")
        } else {
            MembershipDecision::deny("membership_not_found")
        }
    }
}

/// Authorizer that allows every caller; for `lab` deployments and tests that
/// have not wired a durable membership store.
pub struct AllowAllMembership;

impl MembershipAuthorizer for AllowAllMembership {
    fn authorize(&self, _ctx: &RequestContext) -> MembershipDecision {
        MembershipDecision::allow("allow_all")
    }
}

#[cfg(test)]
mod tests {
    use substrate_core::ProjectId;
    use substrate_core::RequestId;

    use super::*;

    fn ctx(user_id: Option<UserId>, tenant: &str) -> RequestContext {
        RequestContext {
            tenant_id: TenantId::parse(tenant).expect("valid tenant"),
            mode: substrate_core::Mode::Saas,
            env: substrate_core::Env::Prod,
            project_id: ProjectId::new("p1"),
            surface_id: None,
            app_id: None,
            user_id,
            actor_id: None,
            membership_role: None,
            request_id: RequestId::new("r1"),
            trace_id: None,
            run_id: None,
            step_id: None,
        }
    }

    #[test]
    fn static_authorizer_allows_known_membership() {
        let authorizer = StaticMembershipAuthorizer::from_memberships([Membership {
            user_id: UserId::new("u1"),
            tenant_id: TenantId::parse("t_acme").expect("valid"),
            role: MembershipRole::Member,
        }]);
        let decision = authorizer.authorize(&ctx(Some(UserId::new("u1")), "t_acme"));
        assert!(decision.allowed);
    }

    #[test]
    fn static_authorizer_denies_unknown_membership() {
        let authorizer = StaticMembershipAuthorizer::default();
        let decision = authorizer.authorize(&ctx(Some(UserId::new("u1")), "t_acme"));
        assert!(!decision.allowed);
    }

    #[test]
    fn static_authorizer_allows_service_calls_without_user_id() {
        let authorizer = StaticMembershipAuthorizer::default();
        let decision = authorizer.authorize(&ctx(None, "t_acme"));
        assert!(decision.allowed);
    }
}
