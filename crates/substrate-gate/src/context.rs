// crates/substrate-gate/src/context.rs
// ============================================================================
// Module: Identity & Context Resolver
// Description: Builds a validated RequestContext from request headers and an
//              optional bearer token, enforcing identity precedence.
// Purpose: The one place untrusted request input becomes a typed, validated
//          RequestContext; every other subsystem trusts its output blindly.
// Dependencies: substrate-core
// ============================================================================

//! ## Overview
//! Precedence order, earlier wins: bearer token claims, then headers, then
//! query/body scope fields (and only the latter when a legacy migration flag
//! is explicitly enabled). `env` is not client-suppliable at all: a deployment
//! runs in exactly one environment, fixed at boot by the server's own
//! configuration, so the resolver takes it as a parameter rather than reading
//! it from the request. `X-Env` surviving as a header name is therefore
//! always the forbidden legacy one.
//!
//! Security posture: every field on the returned [`RequestContext`] has
//! already been validated; callers must never re-trust a raw header after
//! this point.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use substrate_core::AppId;
use substrate_core::Env;
use substrate_core::Mode;
use substrate_core::PayloadScope;
use substrate_core::ProjectId;
use substrate_core::RequestContext;
use substrate_core::SubstrateError;
use substrate_core::SurfaceId;
use substrate_core::TenantId;
use substrate_core::TraceId;
use substrate_core::UserId;
use substrate_core::normalize_surface_id;

use crate::request_id::RequestIdGenerator;

// ============================================================================
// SECTION: Header Names
// ============================================================================

/// Legacy environment header; presence in any case is a hard failure.
pub const HEADER_LEGACY_ENV: &str = "x-env";
/// Required tenant identifier header.
pub const HEADER_TENANT_ID: &str = "x-tenant-id";
/// Required deployment mode header.
pub const HEADER_MODE: &str = "x-mode";
/// Required project identifier header.
pub const HEADER_PROJECT_ID: &str = "x-project-id";
/// Optional surface identifier header.
pub const HEADER_SURFACE_ID: &str = "x-surface-id";
/// Optional application identifier header.
pub const HEADER_APP_ID: &str = "x-app-id";
/// Optional user identifier header.
pub const HEADER_USER_ID: &str = "x-user-id";
/// Optional membership role header.
pub const HEADER_MEMBERSHIP_ROLE: &str = "x-membership-role";
/// Optional request correlation id header.
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// Optional trace correlation id header.
pub const HEADER_TRACE_ID: &str = "x-trace-id";
/// Optional run correlation id header.
pub const HEADER_RUN_ID: &str = "x-run-id";
/// Optional step correlation id header.
pub const HEADER_STEP_ID: &str = "x-step-id";
/// Bearer authorization header.
pub const HEADER_AUTHORIZATION: &str = "authorization";

const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Token Verification Seam
// ============================================================================

/// Claims carried by a verified bearer token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    /// Tenant the token is scoped to.
    pub tenant_id: TenantId,
    /// Authenticated user identifier.
    pub user_id: Option<UserId>,
    /// Membership role asserted for `tenant_id`.
    pub membership_role: Option<substrate_core::MembershipRole>,
    /// Full set of tenants the token's subject is a member of.
    pub member_tenants: BTreeSet<TenantId>,
}

/// Verifies a bearer token into a claim set.
///
/// This crate performs no key-rotation lookups or JWKS fetches of its own;
/// operators wire in whatever JWT/JWS stack they run behind this seam, the
/// same way the teacher's namespace authority is pluggable over HTTP.
pub trait TokenVerifier: Send + Sync {
    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::AuthMissingOrInvalid`] when the token does
    /// not verify.
    fn verify(&self, token: &str) -> Result<TokenClaims, SubstrateError>;
}

/// Fail-closed verifier for deployments that have not wired a real one.
///
/// Unlike the teacher's `Noop*` seams (which default to allow for
/// standalone deployments with nothing to check against), a bearer token
/// asserts an identity that must be cryptographically verified somewhere;
/// refusing to verify is the only safe default.
pub struct RejectAllTokenVerifier;

impl TokenVerifier for RejectAllTokenVerifier {
    fn verify(&self, _token: &str) -> Result<TokenClaims, SubstrateError> {
        Err(SubstrateError::AuthMissingOrInvalid)
    }
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves a validated [`RequestContext`] from pre-lowercased request
/// headers, an optional legacy scope (query/body), and the deployment's
/// fixed environment.
///
/// `headers` keys must already be lowercased by the caller; this mirrors the
/// "parse headers case-insensitively" requirement without this crate owning
/// a transport-specific header map type.
///
/// # Errors
///
/// Returns the specific [`SubstrateError`] variant naming the first
/// validation failure encountered, in the order the algorithm specifies.
pub fn resolve_context(
    headers: &BTreeMap<String, String>,
    legacy_scope: Option<&PayloadScope>,
    allow_legacy_scope_fields: bool,
    deployment_env: Env,
    token_verifier: &dyn TokenVerifier,
    request_ids: &RequestIdGenerator,
) -> Result<RequestContext, SubstrateError> {
    if headers.contains_key(HEADER_LEGACY_ENV) {
        return Err(SubstrateError::LegacyEnvForbidden);
    }

    let mode = headers
        .get(HEADER_MODE)
        .and_then(|raw| Mode::parse(raw))
        .ok_or(SubstrateError::ModeRequired)?;

    let claims = match headers.get(HEADER_AUTHORIZATION) {
        Some(auth_header) => {
            let token = parse_bearer_token(auth_header)?;
            let verified = token_verifier.verify(&token)?;
            if !verified.member_tenants.contains(&verified.tenant_id) {
                return Err(SubstrateError::TenantNotMember);
            }
            Some(verified)
        }
        None => None,
    };

    let tenant_raw = precedence_value(
        claims.as_ref().map(|c| c.tenant_id.to_string()),
        headers.get(HEADER_TENANT_ID).map(String::as_str),
        legacy_scope.and_then(|s| s.tenant_id.as_deref()),
        allow_legacy_scope_fields,
    )
    .ok_or(SubstrateError::TenantInvalid)?;
    let tenant_id = TenantId::parse(&tenant_raw).map_err(|_| SubstrateError::TenantInvalid)?;

    let project_raw = precedence_value(
        None,
        headers.get(HEADER_PROJECT_ID).map(String::as_str),
        legacy_scope.and_then(|s| s.project_id.as_deref()),
        allow_legacy_scope_fields,
    )
    .ok_or(SubstrateError::ProjectRequired)?;
    let project_id = ProjectId::new(project_raw);

    let surface_id = precedence_value(
        None,
        headers.get(HEADER_SURFACE_ID).map(String::as_str),
        legacy_scope.and_then(|s| s.surface_id.as_deref()),
        allow_legacy_scope_fields,
    )
    .map(|raw| SurfaceId::new(normalize_surface_id(&raw)));

    let app_id = precedence_value(
        None,
        headers.get(HEADER_APP_ID).map(String::as_str),
        legacy_scope.and_then(|s| s.app_id.as_deref()),
        allow_legacy_scope_fields,
    )
    .map(AppId::new);

    let user_id = precedence_value(
        claims.as_ref().and_then(|c| c.user_id.as_ref().map(ToString::to_string)),
        headers.get(HEADER_USER_ID).map(String::as_str),
        None,
        false,
    )
    .map(UserId::new);

    let membership_role = claims
        .as_ref()
        .and_then(|c| c.membership_role)
        .or_else(|| headers.get(HEADER_MEMBERSHIP_ROLE).and_then(|raw| substrate_core::MembershipRole::parse(raw)));

    let actor_id = user_id.clone().map(|user_id| substrate_core::ActorId::new(user_id.as_str().to_owned()));

    let request_id = headers
        .get(HEADER_REQUEST_ID)
        .map(|raw| substrate_core::RequestId::new(raw.clone()))
        .unwrap_or_else(|| request_ids.issue());
    let trace_id = headers.get(HEADER_TRACE_ID).map(|raw| TraceId::new(raw.clone()));
    let run_id = headers.get(HEADER_RUN_ID).map(|raw| substrate_core::RunId::new(raw.clone()));
    let step_id = headers.get(HEADER_STEP_ID).map(|raw| substrate_core::StepId::new(raw.clone()));

    Ok(RequestContext {
        tenant_id,
        mode,
        env: deployment_env,
        project_id,
        surface_id,
        app_id,
        user_id,
        actor_id,
        membership_role,
        request_id,
        trace_id,
        run_id,
        step_id,
    })
}

/// Resolves a single field by precedence: claims, then header, then legacy
/// scope (only when `allow_legacy` is set).
fn precedence_value(from_claims: Option<String>, from_header: Option<&str>, from_legacy: Option<&str>, allow_legacy: bool) -> Option<String> {
    from_claims
        .or_else(|| from_header.map(ToOwned::to_owned))
        .or_else(|| if allow_legacy { from_legacy.map(ToOwned::to_owned) } else { None })
}

/// Parses a `Bearer <token>` authorization header value.
fn parse_bearer_token(header: &str) -> Result<String, SubstrateError> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(SubstrateError::AuthMissingOrInvalid);
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(SubstrateError::AuthMissingOrInvalid);
    }
    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn legacy_env_header_is_rejected() {
        let headers = headers(&[(HEADER_LEGACY_ENV, "dev"), (HEADER_MODE, "saas")]);
        let generator = RequestIdGenerator::new("req");
        let err = resolve_context(&headers, None, false, Env::Prod, &RejectAllTokenVerifier, &generator).unwrap_err();
        assert!(matches!(err, SubstrateError::LegacyEnvForbidden));
    }

    #[test]
    fn missing_mode_is_rejected() {
        let headers = headers(&[(HEADER_TENANT_ID, "t_acme"), (HEADER_PROJECT_ID, "p1")]);
        let generator = RequestIdGenerator::new("req");
        let err = resolve_context(&headers, None, false, Env::Prod, &RejectAllTokenVerifier, &generator).unwrap_err();
        assert!(matches!(err, SubstrateError::ModeRequired));
    }

    #[test]
    fn valid_headers_resolve_a_context_with_generated_request_id() {
        let headers = headers(&[(HEADER_MODE, "lab"), (HEADER_TENANT_ID, "t_acme"), (HEADER_PROJECT_ID, "p1"), (HEADER_SURFACE_ID, "SQUARED")]);
        let generator = RequestIdGenerator::new("req");
        let ctx = resolve_context(&headers, None, false, Env::Dev, &RejectAllTokenVerifier, &generator).expect("resolves");
        assert_eq!(ctx.tenant_id.as_str(), "t_acme");
        assert_eq!(ctx.mode, Mode::Lab);
        assert_eq!(ctx.surface_id.map(|id| id.as_str().to_owned()), Some("squared2".to_owned()));
        assert!(!ctx.request_id.as_str().is_empty());
    }

    #[test]
    fn missing_project_is_rejected() {
        let headers = headers(&[(HEADER_MODE, "saas"), (HEADER_TENANT_ID, "t_acme")]);
        let generator = RequestIdGenerator::new("req");
        let err = resolve_context(&headers, None, false, Env::Prod, &RejectAllTokenVerifier, &generator).unwrap_err();
        assert!(matches!(err, SubstrateError::ProjectRequired));
    }

    #[test]
    fn malformed_tenant_is_rejected() {
        let headers = headers(&[(HEADER_MODE, "saas"), (HEADER_TENANT_ID, "acme"), (HEADER_PROJECT_ID, "p1")]);
        let generator = RequestIdGenerator::new("req");
        let err = resolve_context(&headers, None, false, Env::Prod, &RejectAllTokenVerifier, &generator).unwrap_err();
        assert!(matches!(err, SubstrateError::TenantInvalid));
    }
}
