// crates/substrate-audit/src/lib.rs
// ============================================================================
// Module: Substrate Audit
// Description: Hash-chained audit trail writer/verifier, plus a gate-chain
//              bridge that lands every SAFETY_DECISION durably.
// Purpose: Turn gate evaluations and registry mutations into a tamper-evident,
//          per-tenant append-only audit chain.
// Dependencies: substrate-core, substrate-gate
// ============================================================================

//! ## Overview
//! [`chain::AuditChainWriter`] appends hash-chained [`substrate_core::AuditEntry`]
//! records through any [`substrate_core::AuditSink`]; [`chain::AuditChainVerifier`]
//! re-walks a tenant's stored chain and reports the first broken link, if
//! any. [`sink::AuditChainGateEventSink`] adapts a writer into a
//! [`substrate_gate::GateEventSink`] so every gate evaluation, pass or
//! block, lands in the durable chain rather than only a log stream.

mod chain;
mod sink;

pub use chain::AuditChainVerifier;
pub use chain::AuditChainWriter;
pub use chain::ChainVerification;
pub use sink::AuditChainGateEventSink;
