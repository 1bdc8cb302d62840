// crates/substrate-server/src/handlers/health.rs
// ============================================================================
// Module: Health Handlers
// Description: Liveness and readiness probes.
// Purpose: Give orchestrators a cheap signal distinct from the Startup
//          Validator, which only runs once at boot.
// Dependencies: axum, substrate-core
// ============================================================================

//! ## Overview
//! `/healthz` only confirms the process is running and answering requests.
//! `/readyz` additionally re-resolves the configured required routes
//! against the live registry, so an operator sees a route deleted after
//! boot as a readiness failure rather than a silent 500 on first use.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::startup::validate_startup;
use crate::state::AppState;

/// Handles `GET /healthz`: the process is up and able to answer requests.
pub async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Readiness response body.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether every required resource kind still resolves to an allowed route.
    pub ready: bool,
    /// Failure detail, present only when `ready` is false.
    pub detail: Option<String>,
}

/// Handles `GET /readyz`: re-runs the Startup Validator against the live
/// registry so a route deleted after boot surfaces here, not as a 500 on
/// first use.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match validate_startup(state.store.as_ref(), &state.required_resource_kinds) {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                detail: None,
            }),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                detail: Some(err.to_string()),
            }),
        ),
    }
}
