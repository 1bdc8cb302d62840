// crates/substrate-server/src/handlers/routing.rs
// ============================================================================
// Module: Routing Registry Handlers
// Description: List, upsert, exact-lookup, switch, diagnostics, and delete
//              handlers for the routing registry.
// Purpose: HTTP front for substrate_core::RoutingRegistryStore, enforcing the
//          backend-class guard on every route the caller proposes.
// Dependencies: axum, substrate-core, substrate-gate, substrate-adapters,
//               substrate-audit
// ============================================================================

//! ## Overview
//! Listing, exact-lookup, switching, diagnostics, and deleting are always
//! scoped to the resolved tenant: a query or path's own `tenant_id`, if
//! sent, is cross-checked against the resolved context and treated as
//! `NotFound` on mismatch rather than leaking whether another tenant's
//! route exists, matching the identity override protection the gate chain
//! already enforces for mutating actions. Upserting and switching both
//! re-run [`substrate_adapters::ensure_backend_allowed`] directly against
//! the proposed `resource_kind`/`backend_type` pair, the same guard the
//! Startup Validator and `AdapterFactory` apply, so a route can never be
//! saved in a shape those two would then refuse.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use serde::Deserialize;
use substrate_adapters::ensure_backend_allowed;
use substrate_core::Env;
use substrate_core::EventType;
use substrate_core::ResourceKind;
use substrate_core::ResourceRoute;
use substrate_core::RouteFilters;
use substrate_core::RoutingRegistryStore;
use substrate_core::Severity;
use substrate_core::Timestamp;
use substrate_core::core::identifiers::RouteId;
use substrate_gate::GateAction;

use crate::error::ApiError;
use crate::error::map_adapter_error;
use crate::handlers::support::resolve_and_gate;
use crate::state::AppState;

fn action(name: &str) -> GateAction {
    GateAction {
        name: name.to_owned(),
        resource_kind: Some(ResourceKind::RoutingRegistry),
        backend_type: Some("sqlite".to_owned()),
        ..GateAction::default()
    }
}

/// Query parameters for `GET /routing/routes`.
#[derive(Debug, Deserialize)]
pub struct ListRoutesQuery {
    /// Restrict to this resource kind, if set.
    pub resource_kind: Option<ResourceKind>,
    /// Restrict to this environment, if set.
    pub env: Option<Env>,
}

/// Handles `GET /routing/routes`, always scoped to the resolved tenant.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution, gating, or the listing
/// itself fails.
pub async fn list(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<ListRoutesQuery>) -> Result<Json<Vec<ResourceRoute>>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("routing.list"))?;
    let filters = RouteFilters {
        resource_kind: query.resource_kind,
        tenant_id: Some(ctx.tenant_id.to_string()),
        env: query.env.map(Env::as_str).map(str::to_owned),
    };
    let routes = state.store.list_routes(&filters).map_err(map_adapter_error)?;
    Ok(Json(routes))
}

/// Request body for `POST /routing/routes`.
#[derive(Debug, Deserialize)]
pub struct UpsertRouteRequest {
    /// Resource kind this route resolves.
    pub resource_kind: ResourceKind,
    /// Environment this route is scoped to.
    pub env: Env,
    /// Project this route is scoped to, if any.
    pub project_id: Option<String>,
    /// Surface this route is scoped to, if any.
    pub surface_id: Option<String>,
    /// Backend type identifier (e.g. `s3`, `filesystem`, `sqlite`).
    pub backend_type: String,
    /// Opaque backend configuration.
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    /// Whether the Startup Validator requires this route to exist.
    #[serde(default)]
    pub required: bool,
    /// Operator-facing tier label.
    pub tier: Option<String>,
    /// Operator-facing cost notes.
    pub cost_notes: Option<String>,
    /// Rationale for this write, when it switches an existing route's backend.
    pub switch_rationale: Option<String>,
}

/// Handles `POST /routing/routes`: creates a new route, or switches an
/// existing one's backend when `(resource_kind, env, project_id)` already
/// resolves to a route for this tenant.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails, when the
/// proposed backend type is forbidden for the resolved mode, or when the
/// write itself fails.
pub async fn upsert(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<UpsertRouteRequest>) -> Result<Json<ResourceRoute>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("routing.upsert"))?;
    ensure_backend_allowed(ctx.mode, body.resource_kind, &body.backend_type)?;

    let existing = state
        .store
        .get_exact_route(body.resource_kind, ctx.tenant_id.as_str(), ctx.env.as_str(), body.project_id.as_deref())
        .map_err(map_adapter_error)?;

    let now = Timestamp::now();
    let route = ResourceRoute {
        id: existing.as_ref().map_or_else(|| RouteId::new(generate_route_id()), |route| route.id.clone()),
        resource_kind: body.resource_kind,
        tenant_id: ctx.tenant_id.clone(),
        env: body.env,
        project_id: body.project_id.map(substrate_core::ProjectId::new),
        surface_id: body.surface_id.map(substrate_core::SurfaceId::new),
        backend_type: body.backend_type.clone(),
        config: body.config,
        required: body.required,
        tier: body.tier,
        cost_notes: body.cost_notes,
        health_status: None,
        previous_backend_type: existing.as_ref().map(|route| route.backend_type.clone()),
        last_switch_time: existing.is_some().then_some(now),
        switch_rationale: body.switch_rationale,
        created_at: existing.as_ref().map_or(now, |route| route.created_at),
        updated_at: now,
    };

    let saved = state.store.upsert_route(route).map_err(map_adapter_error)?;

    let payload = serde_json::to_value(&saved).unwrap_or_else(|_| serde_json::json!({"id": saved.id.as_str()}));
    if let Err(err) = state.audit_writer().append(&ctx, EventType::RouteChanged, Severity::Info, payload, Vec::new()) {
        tracing_fallback(&err);
    }

    Ok(Json(saved))
}

/// Handles `DELETE /routing/routes/{id}`, refusing to delete a route owned
/// by another tenant.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails, when the
/// route does not exist (or belongs to another tenant), or when the delete
/// itself fails.
pub async fn delete(State(state): State<AppState>, headers: HeaderMap, Path(route_id): Path<String>) -> Result<StatusCode, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("routing.delete"))?;
    let filters = RouteFilters {
        resource_kind: None,
        tenant_id: Some(ctx.tenant_id.to_string()),
        env: None,
    };
    let owned = state.store.list_routes(&filters).map_err(map_adapter_error)?;
    if !owned.iter().any(|route| route.id.as_str() == route_id) {
        return Err(substrate_core::SubstrateError::NotFound.into());
    }
    state.store.delete_route(&route_id).map_err(map_adapter_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Path parameters shared by the exact-lookup, switch, and diagnostics
/// endpoints: `{resource_kind}/{tenant_id}/{env}`.
#[derive(Debug, Deserialize)]
pub struct ExactRoutePath {
    /// Resource kind being resolved.
    pub resource_kind: ResourceKind,
    /// Tenant the route belongs to; must match the resolved context.
    pub tenant_id: String,
    /// Environment the route is scoped to.
    pub env: Env,
}

/// Handles `GET /routing/routes/{resource_kind}/{tenant_id}/{env}`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails, when the
/// path's `tenant_id` does not match the resolved tenant, or when no route
/// is found.
pub async fn get_exact(State(state): State<AppState>, headers: HeaderMap, Path(path): Path<ExactRoutePath>) -> Result<Json<ResourceRoute>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("routing.get_exact"))?;
    if path.tenant_id != ctx.tenant_id.as_str() {
        return Err(substrate_core::SubstrateError::NotFound.into());
    }
    let route = state
        .store
        .get_exact_route(path.resource_kind, ctx.tenant_id.as_str(), path.env.as_str(), None)
        .map_err(map_adapter_error)?
        .ok_or(substrate_core::SubstrateError::NotFound)?;
    Ok(Json(route))
}

/// Request body for `PUT /routing/routes/{resource_kind}/{tenant_id}/{env}/switch`.
#[derive(Debug, Deserialize)]
pub struct SwitchRouteRequest {
    /// New backend type to switch the existing route to.
    pub backend_type: String,
    /// Operator-supplied rationale for the switch, recorded on the route
    /// and in the audit entry.
    pub switch_rationale: Option<String>,
}

/// Handles `PUT /routing/routes/{resource_kind}/{tenant_id}/{env}/switch`:
/// changes only the backend type of an existing route, preserving its
/// identity, required flag, and config.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails, when the
/// path's `tenant_id` does not match the resolved tenant, when no route
/// exists to switch, when the new backend type is forbidden, or when the
/// write itself fails.
pub async fn switch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<ExactRoutePath>,
    Json(body): Json<SwitchRouteRequest>,
) -> Result<Json<ResourceRoute>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("routing.switch"))?;
    if path.tenant_id != ctx.tenant_id.as_str() {
        return Err(substrate_core::SubstrateError::NotFound.into());
    }
    ensure_backend_allowed(ctx.mode, path.resource_kind, &body.backend_type)?;

    let existing = state
        .store
        .get_exact_route(path.resource_kind, ctx.tenant_id.as_str(), path.env.as_str(), None)
        .map_err(map_adapter_error)?
        .ok_or(substrate_core::SubstrateError::NotFound)?;

    let now = Timestamp::now();
    let route = ResourceRoute {
        previous_backend_type: Some(existing.backend_type.clone()),
        backend_type: body.backend_type,
        switch_rationale: body.switch_rationale,
        last_switch_time: Some(now),
        updated_at: now,
        ..existing
    };

    let saved = state.store.upsert_route(route).map_err(map_adapter_error)?;

    let payload = serde_json::to_value(&saved).unwrap_or_else(|_| serde_json::json!({"id": saved.id.as_str()}));
    if let Err(err) = state.audit_writer().append(&ctx, EventType::RouteChanged, Severity::Info, payload, Vec::new()) {
        tracing_fallback(&err);
    }

    Ok(Json(saved))
}

/// Diagnostics response for a single resolved route.
#[derive(Debug, serde::Serialize)]
pub struct RouteDiagnostics {
    /// The route as currently stored, if any.
    pub route: Option<ResourceRoute>,
    /// Whether the route's backend type is allowed for the resolved mode.
    pub backend_allowed: bool,
}

/// Handles `GET /routing/diagnostics/{resource_kind}/{tenant_id}/{env}`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails, or when
/// the path's `tenant_id` does not match the resolved tenant.
pub async fn diagnostics(State(state): State<AppState>, headers: HeaderMap, Path(path): Path<ExactRoutePath>) -> Result<Json<RouteDiagnostics>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("routing.diagnostics"))?;
    if path.tenant_id != ctx.tenant_id.as_str() {
        return Err(substrate_core::SubstrateError::NotFound.into());
    }
    let route = state
        .store
        .get_exact_route(path.resource_kind, ctx.tenant_id.as_str(), path.env.as_str(), None)
        .map_err(map_adapter_error)?;
    let backend_allowed = route.as_ref().is_some_and(|route| ensure_backend_allowed(ctx.mode, path.resource_kind, &route.backend_type).is_ok());
    Ok(Json(RouteDiagnostics { route, backend_allowed }))
}

fn generate_route_id() -> String {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn tracing_fallback(err: &substrate_core::SubstrateError) {
    eprintln!("routing audit append failed: {err}");
}
