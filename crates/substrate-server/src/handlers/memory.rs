// crates/substrate-server/src/handlers/memory.rs
// ============================================================================
// Module: Memory Store Handlers
// Description: Set, get, and delete handlers for the simple key/value store.
// Purpose: HTTP front for substrate_core::MemoryStore.
// Dependencies: axum, substrate-core, substrate-gate
// ============================================================================

use axum::Json;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use serde::Deserialize;
use substrate_core::MemoryStore;
use substrate_core::ResourceKind;
use substrate_gate::GateAction;

use crate::error::ApiError;
use crate::error::map_adapter_error;
use crate::handlers::support::require_found;
use crate::handlers::support::resolve_and_gate;
use crate::handlers::support::scoped_key;
use crate::state::AppState;

fn action(name: &str) -> GateAction {
    GateAction {
        name: name.to_owned(),
        resource_kind: Some(ResourceKind::MemoryStore),
        backend_type: Some("sqlite".to_owned()),
        ..GateAction::default()
    }
}

/// Request body for `POST /memory/set`.
#[derive(Debug, Deserialize)]
pub struct SetRequest {
    /// Key being set.
    pub key: String,
    /// Value being stored.
    pub value: serde_json::Value,
    /// Time-to-live in seconds, if any.
    pub ttl_seconds: Option<u64>,
}

/// Handles `POST /memory/set`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution, gating, or the write
/// itself fails.
pub async fn set(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<SetRequest>) -> Result<StatusCode, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("memory.set"))?;
    let key = scoped_key(&ctx, &body.key);
    state.store.set(&key, body.value, body.ttl_seconds).map_err(map_adapter_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for `GET /memory/get`.
#[derive(Debug, Deserialize)]
pub struct GetQuery {
    /// Key being read.
    pub key: String,
}

/// Handles `GET /memory/get`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails, or when
/// the key is absent or expired.
pub async fn get(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<GetQuery>) -> Result<Json<serde_json::Value>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("memory.get"))?;
    let key = scoped_key(&ctx, &query.key);
    let value = state.store.get(&key).map_err(map_adapter_error)?;
    Ok(Json(require_found(value)?))
}

/// Query parameters for `DELETE /memory/delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Key being deleted.
    pub key: String,
}

/// Handles `DELETE /memory/delete`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution, gating, or the delete
/// itself fails.
pub async fn delete(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<DeleteQuery>) -> Result<StatusCode, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("memory.delete"))?;
    let key = scoped_key(&ctx, &query.key);
    state.store.delete(&key).map_err(map_adapter_error)?;
    Ok(StatusCode::NO_CONTENT)
}
