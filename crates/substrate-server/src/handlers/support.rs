// crates/substrate-server/src/handlers/support.rs
// ============================================================================
// Module: Handler Support
// Description: Shared context-resolution and gate-evaluation glue every
//              handler runs before touching the store.
// Purpose: Keep the resolve-then-gate boilerplate in one place instead of
//          repeating it per handler.
// Dependencies: axum, substrate-core, substrate-gate
// ============================================================================

use axum::http::HeaderMap;
use substrate_core::RequestContext;
use substrate_core::SubstrateError;
use substrate_gate::GateAction;
use substrate_gate::GateChainOutcome;
use substrate_gate::resolve_context;

use crate::error::ApiError;
use crate::headers::to_header_map;
use crate::state::AppState;

/// Resolves the request context from `headers` and runs `action` through the
/// shared gate chain, returning the resolved context on success.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution fails or any gate blocks.
pub fn resolve_and_gate(state: &AppState, headers: &HeaderMap, action: &GateAction) -> Result<RequestContext, ApiError> {
    let header_map = to_header_map(headers);
    let ctx = resolve_context(&header_map, None, false, state.deployment_env, state.token_verifier.as_ref(), state.request_ids.as_ref())
        .map_err(ApiError::from)?;
    match state.gate_chain.evaluate(&ctx, action, state.gate_sink.as_ref()) {
        GateChainOutcome::Passed => Ok(ctx),
        GateChainOutcome::Blocked {
            error,
            ..
        } => Err(ApiError::from(error)),
    }
}

/// Scopes a caller-supplied key or stream id under the resolved tenant,
/// environment, and project: `{tenant_id}/{env}/{project_id}/{key}`. Used
/// by both the blackboard and memory store handlers so one tenant can never
/// collide with another's keys at the storage layer.
#[must_use]
pub fn scoped_key(ctx: &RequestContext, key: &str) -> String {
    format!("{}/{}/{}/{}", ctx.tenant_id.as_str(), ctx.env.as_str(), ctx.project_id.as_str(), key)
}

/// Maps a missing lookup result onto [`SubstrateError::NotFound`].
pub fn require_found<T>(value: Option<T>) -> Result<T, SubstrateError> {
    value.ok_or(SubstrateError::NotFound)
}
