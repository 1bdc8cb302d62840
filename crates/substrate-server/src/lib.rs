// crates/substrate-server/src/lib.rs
// ============================================================================
// Module: Substrate Server
// Description: Multi-tenant control-plane HTTP server over the durable
//              substrate store.
// Purpose: Expose the routing registry, event streams, blackboard, memory
//          store, and audit chain as a gated REST surface.
// Dependencies: axum, tokio, substrate-core, substrate-gate, substrate-audit,
//               substrate-store-sqlite, substrate-adapters
// ============================================================================

//! ## Overview
//! Every request is resolved to a [`substrate_core::RequestContext`] and run
//! through the built-in gate chain before a handler touches the store; see
//! [`handlers::support::resolve_and_gate`]. [`router::serve`] is the normal
//! entry point for a binary: it loads configuration, boots [`state::AppState`]
//! (which itself runs the Startup Validator), and serves until killed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod router;
pub mod startup;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::SubstrateConfig;
pub use error::ApiError;
pub use router::ServeError;
pub use router::build_router;
pub use router::serve;
pub use startup::StartupValidationError;
pub use state::AppState;
pub use state::BootError;
