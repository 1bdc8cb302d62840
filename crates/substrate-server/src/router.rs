// crates/substrate-server/src/router.rs
// ============================================================================
// Module: Router Assembly
// Description: Builds the full axum Router and serves it over plain HTTP.
// Purpose: The single place every route handler is mounted; binary entry
//          points call `serve` after loading configuration.
// Dependencies: axum, tokio, substrate-core
// ============================================================================

//! ## Overview
//! TLS termination is expected to sit in front of this process (a gateway
//! or sidecar), matching the Startup Validator's assumption that every
//! required backend route is already resolvable at boot; this module only
//! binds plain TCP, the same unadorned branch the teacher's own HTTP
//! transport falls back to when no TLS config is present.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use thiserror::Error;

use crate::config::SubstrateConfig;
use crate::handlers::blackboard;
use crate::handlers::events;
use crate::handlers::health;
use crate::handlers::memory;
use crate::handlers::routing;
use crate::handlers::stream;
use crate::state::AppState;
use crate::state::BootError;

/// Failures that can prevent the server from serving.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Application state could not be built.
    #[error(transparent)]
    Boot(#[from] BootError),
    /// The configured bind address is invalid.
    #[error("invalid bind address: {0}")]
    InvalidBind(String),
    /// The listener could not be bound.
    #[error("bind failed: {0}")]
    Bind(String),
    /// The server loop exited with an error.
    #[error("server failed: {0}")]
    Transport(String),
}

/// Builds the full route table over `state`.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/routing/routes", get(routing::list).post(routing::upsert))
        .route("/routing/routes/{id}", delete(routing::delete))
        .route("/routing/routes/{resource_kind}/{tenant_id}/{env}", get(routing::get_exact))
        .route("/routing/routes/{resource_kind}/{tenant_id}/{env}/switch", put(routing::switch))
        .route("/routing/diagnostics/{resource_kind}/{tenant_id}/{env}", get(routing::diagnostics))
        .route("/events/append", post(events::append))
        .route("/events/tail", get(events::tail))
        .route("/blackboard/write", post(blackboard::write))
        .route("/blackboard/read", get(blackboard::read))
        .route("/blackboard/list-keys", get(blackboard::list_keys))
        .route("/memory/set", post(memory::set))
        .route("/memory/get", get(memory::get))
        .route("/memory/delete", delete(memory::delete))
        .route("/sse/stream/{stream_id}", get(stream::sse))
        .route("/ws/stream/{stream_id}", get(stream::ws))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Loads configuration, boots application state, and serves until the
/// process is killed.
///
/// # Errors
///
/// Returns [`ServeError`] when configuration or state cannot be built, the
/// bind address is invalid, the listener cannot be bound, or the serve
/// loop itself fails.
pub async fn serve(config: &SubstrateConfig) -> Result<(), ServeError> {
    let state = AppState::build(config)?;
    let addr: SocketAddr = config.server.bind.parse().map_err(|_| ServeError::InvalidBind(config.server.bind.clone()))?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| ServeError::Bind(err.to_string()))?;
    axum::serve(listener, router.into_make_service()).await.map_err(|err| ServeError::Transport(err.to_string()))
}
