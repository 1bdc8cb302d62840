// crates/substrate-server/src/handlers/events.rs
// ============================================================================
// Module: Event Stream Handlers
// Description: Append and tail handlers for the append-only event stream.
// Purpose: HTTP front for substrate_core::EventStream.
// Dependencies: axum, substrate-core, substrate-gate
// ============================================================================

use axum::Json;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde::Serialize;
use substrate_core::ActorId;
use substrate_core::ActorType;
use substrate_core::EventStream;
use substrate_core::EventType;
use substrate_core::ResourceKind;
use substrate_core::IdempotencyKey;
use substrate_core::Severity;
use substrate_core::StorageClass;
use substrate_core::Timestamp;
use substrate_core::core::model::ENVELOPE_SCHEMA_VERSION;
use substrate_gate::GateAction;

use crate::error::ApiError;
use crate::error::map_adapter_error;
use crate::handlers::support::resolve_and_gate;
use crate::handlers::support::scoped_key;
use crate::state::AppState;

/// Request body for `POST /events/append`.
#[derive(Debug, Deserialize)]
pub struct AppendEventRequest {
    /// Logical stream to append to.
    pub stream_id: String,
    /// Canonical event type.
    pub event_type: EventType,
    /// Severity of this event; defaults to `info`.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Opaque domain payload.
    pub payload: serde_json::Value,
    /// PII flags attached by the caller.
    #[serde(default)]
    pub pii_flags: Vec<String>,
    /// Caller-supplied idempotency key, for append deduplication.
    pub idempotency_key: Option<String>,
    /// Thread this event belongs to, if any.
    pub thread_id: Option<String>,
    /// Canvas this event belongs to, if any.
    pub canvas_id: Option<String>,
    /// Session this event belongs to, if any.
    pub session_id: Option<String>,
}

/// Response body for `POST /events/append`.
#[derive(Debug, Serialize)]
pub struct AppendEventResponse {
    /// Identifier assigned to the appended event.
    pub event_id: String,
}

/// Handles `POST /events/append`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution, gating, or the append
/// itself fails.
pub async fn append(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<AppendEventRequest>) -> Result<Json<AppendEventResponse>, ApiError> {
    let action = GateAction {
        name: "events.append".to_owned(),
        resource_kind: Some(ResourceKind::EventStream),
        backend_type: Some("sqlite".to_owned()),
        ..GateAction::default()
    };
    let ctx = resolve_and_gate(&state, &headers, &action)?;

    let envelope = substrate_core::EventEnvelope {
        tenant_id: ctx.tenant_id.clone(),
        mode: ctx.mode,
        env: ctx.env,
        project_id: ctx.project_id.clone(),
        app_id: ctx.app_id.clone(),
        surface_id: ctx.surface_id.clone(),
        actor_id: ctx.actor_id.clone().unwrap_or_else(|| ActorId::new("system")),
        actor_type: if ctx.actor_id.is_some() {
            ActorType::Human
        } else {
            ActorType::System
        },
        thread_id: body.thread_id,
        canvas_id: body.canvas_id,
        session_id: body.session_id,
        event_id: None,
        request_id: ctx.request_id.clone(),
        trace_id: ctx.trace_id.clone(),
        run_id: ctx.run_id.clone(),
        step_id: ctx.step_id.clone(),
        event_type: body.event_type,
        timestamp: Timestamp::now(),
        severity: body.severity.unwrap_or(Severity::Info),
        schema_version: ENVELOPE_SCHEMA_VERSION,
        storage_class: StorageClass::Stream,
        pii_flags: body.pii_flags,
        idempotency_key: body.idempotency_key.map(IdempotencyKey::new),
    };

    let stream_key = scoped_key(&ctx, &body.stream_id);
    let event_id = state.store.append(&stream_key, envelope, body.payload).map_err(map_adapter_error)?;
    Ok(Json(AppendEventResponse {
        event_id: event_id.to_string(),
    }))
}

/// Query parameters for `GET /events/tail`.
#[derive(Debug, Deserialize)]
pub struct TailQuery {
    /// Stream to read from.
    pub stream_id: String,
    /// Return only events strictly after this event id.
    pub after_event_id: Option<String>,
    /// Maximum number of records to return.
    #[serde(default = "default_tail_limit")]
    pub limit: usize,
}

const fn default_tail_limit() -> usize {
    100
}

/// Handles `GET /events/tail`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution, gating, or the read itself
/// fails.
pub async fn tail(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<TailQuery>) -> Result<Json<Vec<substrate_core::StreamRecord>>, ApiError> {
    let action = GateAction {
        name: "events.tail".to_owned(),
        resource_kind: Some(ResourceKind::EventStream),
        backend_type: Some("sqlite".to_owned()),
        ..GateAction::default()
    };
    let ctx = resolve_and_gate(&state, &headers, &action)?;
    let stream_key = scoped_key(&ctx, &query.stream_id);

    let records = state
        .store
        .list_after(&stream_key, query.after_event_id.as_deref(), query.limit)
        .map_err(map_adapter_error)?;
    Ok(Json(records))
}
