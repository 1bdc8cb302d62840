// crates/substrate-gate/src/lib.rs
// ============================================================================
// Module: Substrate Gate
// Description: Identity & context resolution plus the ordered gate chain
//              that runs before any mutating action.
// Purpose: Collects the pieces every service entrypoint needs before
//          touching a domain handler: a validated RequestContext and a
//          pass/block decision with an audit trail.
// Dependencies: substrate-core
// ============================================================================

//! ## Overview
//! Two things live here. [`context::resolve_context`] turns request headers
//! (and, behind a legacy flag, query/body fields) into a validated
//! [`substrate_core::RequestContext`]. [`gate::GateChain`] then runs the
//! built-in checks — authenticated, membership, context-match,
//! identity-override, backend-class — plus whatever domain-specific gates a
//! service appends, short-circuiting on the first block and reporting every
//! evaluation to a [`gate::GateEventSink`].

mod context;
mod gate;
mod membership;
mod request_id;

pub use context::HEADER_APP_ID;
pub use context::HEADER_AUTHORIZATION;
pub use context::HEADER_LEGACY_ENV;
pub use context::HEADER_MEMBERSHIP_ROLE;
pub use context::HEADER_MODE;
pub use context::HEADER_PROJECT_ID;
pub use context::HEADER_REQUEST_ID;
pub use context::HEADER_RUN_ID;
pub use context::HEADER_STEP_ID;
pub use context::HEADER_SURFACE_ID;
pub use context::HEADER_TENANT_ID;
pub use context::HEADER_TRACE_ID;
pub use context::RejectAllTokenVerifier;
pub use context::TokenClaims;
pub use context::TokenVerifier;
pub use context::resolve_context;
pub use gate::AuthenticatedGate;
pub use gate::BackendClassGate;
pub use gate::ContextMatchGate;
pub use gate::Gate;
pub use gate::GateAction;
pub use gate::GateChain;
pub use gate::GateChainOutcome;
pub use gate::GateEventSink;
pub use gate::GateOutcome;
pub use gate::IdentityOverrideGate;
pub use gate::MembershipGate;
pub use gate::NoopGateEventSink;
pub use gate::StderrGateEventSink;
pub use membership::AllowAllMembership;
pub use membership::MembershipAuthorizer;
pub use membership::MembershipDecision;
pub use membership::StaticMembershipAuthorizer;
pub use request_id::RequestIdGenerator;
