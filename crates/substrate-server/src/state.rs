// crates/substrate-server/src/state.rs
// ============================================================================
// Module: Application State
// Description: Assembles the durable store, gate chain, and identity seams
//              every route handler shares.
// Purpose: One fallible constructor that boots the process to a known-good
//          state or refuses, before any router is mounted.
// Dependencies: substrate-core, substrate-gate, substrate-audit,
//               substrate-store-sqlite, substrate-adapters
// ============================================================================

//! ## Overview
//! [`AppState::build`] opens the `SQLite` store, runs the Startup Validator
//! against it, and wires the built-in gate chain with a durable
//! hash-chained `SAFETY_DECISION` sink. Membership and bearer-token
//! verification have no backing store yet in this deployment shape, so they
//! are wired to the fail-closed/allow-all seams the gate framework and
//! resolver already define for that case; see `DESIGN.md` for the decision.

use std::sync::Arc;

use substrate_adapters::ensure_backend_allowed;
use substrate_audit::AuditChainGateEventSink;
use substrate_audit::AuditChainWriter;
use substrate_core::AuditSink;
use substrate_core::Env;
use substrate_core::Mode;
use substrate_core::ResourceKind;
use substrate_gate::AllowAllMembership;
use substrate_gate::BackendClassGate;
use substrate_gate::GateChain;
use substrate_gate::GateEventSink;
use substrate_gate::RejectAllTokenVerifier;
use substrate_gate::RequestIdGenerator;
use substrate_gate::TokenVerifier;
use substrate_store_sqlite::SqliteSubstrateStore;
use thiserror::Error;

use crate::config::SubstrateConfig;
use crate::startup::StartupValidationError;
use crate::startup::validate_startup;

/// Shared state every route handler reads through.
#[derive(Clone)]
pub struct AppState {
    /// Durable backend satisfying the routing registry, event stream,
    /// blackboard, memory, and audit sink interfaces.
    pub store: Arc<SqliteSubstrateStore>,
    /// Ordered pre-handler checks every mutating action runs through.
    pub gate_chain: Arc<GateChain>,
    /// `SAFETY_DECISION` sink the gate chain reports every evaluation to.
    pub gate_sink: Arc<dyn GateEventSink>,
    /// Bearer-token verifier used by the Identity & Context Resolver.
    pub token_verifier: Arc<dyn TokenVerifier>,
    /// Generator backing auto-assigned request ids.
    pub request_ids: Arc<RequestIdGenerator>,
    /// Environment this process is fixed to at boot.
    pub deployment_env: Env,
    /// Mode assumed when a request omits `X-Mode` and the endpoint allows it.
    pub default_mode: Mode,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Resource kinds the Startup Validator, and `/readyz`, require a route for.
    pub required_resource_kinds: Vec<ResourceKind>,
}

/// Failures that prevent the process from reaching a servable state.
#[derive(Debug, Error)]
pub enum BootError {
    /// The `SQLite` store could not be opened.
    #[error("store open failed: {0}")]
    Store(#[from] substrate_store_sqlite::SqliteStoreError),
    /// The Startup Validator refused to let the process accept traffic.
    #[error(transparent)]
    Startup(#[from] StartupValidationError),
}

impl AppState {
    /// Builds application state from `config`, opening the store and
    /// running the Startup Validator before returning.
    ///
    /// # Errors
    ///
    /// Returns [`BootError`] when the store cannot be opened or the
    /// Startup Validator finds a missing or disallowed required route.
    pub fn build(config: &SubstrateConfig) -> Result<Self, BootError> {
        let store = Arc::new(SqliteSubstrateStore::open(&config.sqlite)?);
        validate_startup(store.as_ref(), &config.required_resource_kinds)?;

        let backend_class = BackendClassGate::new(ensure_backend_allowed);
        let gate_chain = Arc::new(GateChain::with_builtin_gates(Box::new(AllowAllMembership), backend_class));

        let audit_writer = AuditChainWriter::new(Arc::clone(&store) as Arc<dyn AuditSink>);
        let gate_sink: Arc<dyn GateEventSink> = Arc::new(AuditChainGateEventSink::new(audit_writer));

        Ok(Self {
            store,
            gate_chain,
            gate_sink,
            token_verifier: Arc::new(RejectAllTokenVerifier),
            request_ids: Arc::new(RequestIdGenerator::new("req")),
            deployment_env: config.deployment.env,
            default_mode: config.deployment.default_mode,
            max_body_bytes: config.server.max_body_bytes,
            required_resource_kinds: config.required_resource_kinds.clone(),
        })
    }

    /// Builds a fresh audit chain writer over this state's store, for
    /// handlers that append domain-specific audit entries outside the gate
    /// chain (e.g. routing registry mutations).
    #[must_use]
    pub fn audit_writer(&self) -> AuditChainWriter {
        AuditChainWriter::new(Arc::clone(&self.store) as Arc<dyn AuditSink>)
    }
}
