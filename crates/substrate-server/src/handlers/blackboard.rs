// crates/substrate-server/src/handlers/blackboard.rs
// ============================================================================
// Module: Blackboard Handlers
// Description: Write, read, and list-keys handlers for the versioned
//              coordination store.
// Purpose: HTTP front for substrate_core::Blackboard.
// Dependencies: axum, substrate-core, substrate-gate
// ============================================================================

use axum::Json;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;
use substrate_core::Blackboard;
use substrate_core::BlackboardEntry;
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
        resource_kind: Some(ResourceKind::BlackboardStore),
        backend_type: Some("sqlite".to_owned()),
        ..GateAction::default()
    }
}

/// Request body for `POST /blackboard/write`.
#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    /// Stream the key belongs to.
    pub stream_id: String,
    /// Key being written.
    pub key: String,
    /// New value.
    pub value: serde_json::Value,
    /// Version the caller expects to currently hold, for optimistic
    /// concurrency; `None` asserts this is the first write.
    pub expected_version: Option<u64>,
}

/// Handles `POST /blackboard/write`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution, gating, or the write
/// itself (including a version conflict) fails.
pub async fn write(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<WriteRequest>) -> Result<Json<BlackboardEntry>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("blackboard.write"))?;
    let stream_key = scoped_key(&ctx, &body.stream_id);
    let entry = state
        .store
        .write(&stream_key, &body.key, body.value, body.expected_version, ctx.actor_id.as_ref())
        .map_err(map_adapter_error)?;
    Ok(Json(entry))
}

/// Query parameters for `GET /blackboard/read`.
#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    /// Stream the key belongs to.
    pub stream_id: String,
    /// Key being read.
    pub key: String,
    /// Specific historical version to read; omit for the latest.
    pub version: Option<u64>,
}

/// Handles `GET /blackboard/read`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails, or when
/// the key does not exist.
pub async fn read(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<ReadQuery>) -> Result<Json<BlackboardEntry>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("blackboard.read"))?;
    let stream_key = scoped_key(&ctx, &query.stream_id);
    let entry = state.store.read(&stream_key, &query.key, query.version).map_err(map_adapter_error)?;
    Ok(Json(require_found(entry)?))
}

/// Query parameters for `GET /blackboard/list-keys`.
#[derive(Debug, Deserialize)]
pub struct ListKeysQuery {
    /// Stream to list keys for.
    pub stream_id: String,
}

/// Handles `GET /blackboard/list-keys`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution, gating, or the listing
/// itself fails.
pub async fn list_keys(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<ListKeysQuery>) -> Result<Json<Vec<String>>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("blackboard.list_keys"))?;
    let stream_key = scoped_key(&ctx, &query.stream_id);
    let keys = state.store.list_keys(&stream_key).map_err(map_adapter_error)?;
    Ok(Json(keys))
}
