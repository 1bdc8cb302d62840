// crates/substrate-gate/src/gate.rs
// ============================================================================
// Module: Gate Framework
// Description: Ordered pre-handler checks composed per action, with uniform
//              SAFETY_DECISION auditing.
// Purpose: Give every mutating action the same five built-in checks before
//          any domain-specific gate runs, the same extension seam the
//          teacher uses for `ToolAuthz`.
// Dependencies: substrate-core
// ============================================================================

//! ## Overview
//! The built-in chain is `authenticated -> membership -> context-match ->
//! identity-override -> backend-class`. Services splice domain-specific
//! gates (budget, KPI thresholds, kill-switch, strategy lock) onto the end
//! of the same ordered `Vec<Box<dyn Gate>>`; each gate returns a
//! [`SubstrateError`] already carrying the right `error_code`/HTTP status,
//! so the chain runner never has to re-derive one. Every evaluation, pass or
//! block, is reported to a [`GateEventSink`] for the `SAFETY_DECISION` audit
//! trail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use substrate_core::ClientSuppliedIdentity;
use substrate_core::PayloadScope;
use substrate_core::RequestContext;
use substrate_core::ResourceKind;
use substrate_core::SubstrateError;
use substrate_core::assert_context_matches;
use substrate_core::validate_identity_precedence;

use crate::membership::MembershipAuthorizer;

// ============================================================================
// SECTION: Action & Outcome
// ============================================================================

/// Describes the action a gate chain is evaluating.
#[derive(Debug, Clone, Default)]
pub struct GateAction {
    /// Dotted action name (e.g. `blackboard.write`), used for audit labeling.
    pub name: String,
    /// Whether this action requires an authenticated (non-anonymous) caller.
    pub requires_authentication: bool,
    /// Scope fields asserted by the request payload/path/query, if any.
    pub payload_scope: PayloadScope,
    /// Identity fields the client attempted to supply directly, if any.
    pub client_supplied_identity: ClientSuppliedIdentity,
    /// Resource kind being resolved, when the action resolves exactly one.
    pub resource_kind: Option<ResourceKind>,
    /// Backend type resolved for `resource_kind`, when known ahead of the
    /// gate chain running (multi-resource handlers invoke the backend-class
    /// guard directly per resolution instead of through this field).
    pub backend_type: Option<String>,
}

/// Result of evaluating a single gate.
#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// The gate allows the action to proceed.
    Pass,
    /// The gate blocks the action with the given error.
    Block(SubstrateError),
}

impl GateOutcome {
    /// Returns true when this outcome passed.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Outcome of running the full gate chain.
#[derive(Debug)]
pub enum GateChainOutcome {
    /// Every gate passed.
    Passed,
    /// The named gate blocked the action.
    Blocked {
        /// Name of the gate that blocked the action.
        gate: &'static str,
        /// The error the gate returned.
        error: SubstrateError,
    },
}

// ============================================================================
// SECTION: Gate Trait
// ============================================================================

/// A single pre-handler check in the gate chain.
pub trait Gate: Send + Sync {
    /// Stable name used in audit events and `GateBlocked` error bodies.
    fn name(&self) -> &'static str;

    /// Evaluates this gate against the resolved context and action.
    fn evaluate(&self, ctx: &RequestContext, action: &GateAction) -> GateOutcome;
}

// ============================================================================
// SECTION: Built-in Gates
// ============================================================================

/// Gate 1: rejects actions requiring authentication when no user identity
/// was resolved onto the context.
pub struct AuthenticatedGate;

impl Gate for AuthenticatedGate {
    fn name(&self) -> &'static str {
        "authenticated"
    }

    fn evaluate(&self, ctx: &RequestContext, action: &GateAction) -> GateOutcome {
        if action.requires_authentication && ctx.user_id.is_none() {
            GateOutcome::Block(SubstrateError::AuthMissingOrInvalid)
        } else {
            GateOutcome::Pass
        }
    }
}

/// Gate 2: enforces tenant membership via a pluggable authorizer.
pub struct MembershipGate {
    authorizer: Box<dyn MembershipAuthorizer>,
}

impl MembershipGate {
    /// Builds a membership gate backed by `authorizer`.
    #[must_use]
    pub fn new(authorizer: Box<dyn MembershipAuthorizer>) -> Self {
        Self {
            authorizer,
        }
    }
}

impl Gate for MembershipGate {
    fn name(&self) -> &'static str {
        "membership"
    }

    fn evaluate(&self, ctx: &RequestContext, _action: &GateAction) -> GateOutcome {
        let decision = self.authorizer.authorize(ctx);
        if decision.allowed {
            GateOutcome::Pass
        } else {
            GateOutcome::Block(SubstrateError::TenantNotMember)
        }
    }
}

/// Gate 3: rejects a request whose payload/path/query scope disagrees with
/// the resolved context.
pub struct ContextMatchGate;

impl Gate for ContextMatchGate {
    fn name(&self) -> &'static str {
        "context_match"
    }

    fn evaluate(&self, ctx: &RequestContext, action: &GateAction) -> GateOutcome {
        let mismatches = assert_context_matches(ctx, &action.payload_scope);
        if mismatches.is_empty() {
            GateOutcome::Pass
        } else {
            GateOutcome::Block(SubstrateError::ContextMismatch(mismatches))
        }
    }
}

/// Gate 4: rejects a client attempting to override server-derived identity.
pub struct IdentityOverrideGate;

impl Gate for IdentityOverrideGate {
    fn name(&self) -> &'static str {
        "identity_override"
    }

    fn evaluate(&self, ctx: &RequestContext, action: &GateAction) -> GateOutcome {
        let mismatches = validate_identity_precedence(ctx, &action.client_supplied_identity);
        if mismatches.is_empty() {
            GateOutcome::Pass
        } else {
            GateOutcome::Block(SubstrateError::IdentityOverride(mismatches))
        }
    }
}

/// Gate 5: the backend-class guard, invoked here only when the action names
/// exactly one resource/backend pair up front; multi-resource handlers call
/// the same guard directly at each resolution instead.
pub struct BackendClassGate {
    ensure_allowed: Box<dyn Fn(substrate_core::Mode, ResourceKind, &str) -> Result<(), SubstrateError> + Send + Sync>,
}

impl BackendClassGate {
    /// Builds a backend-class gate from the adapter crate's guard function.
    #[must_use]
    pub fn new(ensure_allowed: impl Fn(substrate_core::Mode, ResourceKind, &str) -> Result<(), SubstrateError> + Send + Sync + 'static) -> Self {
        Self {
            ensure_allowed: Box::new(ensure_allowed),
        }
    }
}

impl Gate for BackendClassGate {
    fn name(&self) -> &'static str {
        "backend_class"
    }

    fn evaluate(&self, ctx: &RequestContext, action: &GateAction) -> GateOutcome {
        let (Some(resource_kind), Some(backend_type)) = (action.resource_kind, action.backend_type.as_deref()) else {
            return GateOutcome::Pass;
        };
        match (self.ensure_allowed)(ctx.mode, resource_kind, backend_type) {
            Ok(()) => GateOutcome::Pass,
            Err(err) => GateOutcome::Block(err),
        }
    }
}

// ============================================================================
// SECTION: Audit Sink Seam
// ============================================================================

/// A single gate evaluation, shaped for the `SAFETY_DECISION` audit event.
#[derive(Debug, Serialize)]
pub struct SafetyDecisionEvent<'a> {
    event: &'static str,
    action: &'a str,
    gate: &'static str,
    result: &'static str,
    reason: Option<String>,
    tenant_id: String,
    request_id: String,
}

/// Audit sink for gate evaluations.
pub trait GateEventSink: Send + Sync {
    /// Records one gate evaluation, pass or block.
    fn record(&self, ctx: &RequestContext, action: &GateAction, gate_name: &'static str, outcome: &GateOutcome);
}

/// Audit sink that writes JSON lines to stderr.
pub struct StderrGateEventSink;

impl GateEventSink for StderrGateEventSink {
    fn record(&self, ctx: &RequestContext, action: &GateAction, gate_name: &'static str, outcome: &GateOutcome) {
        let event = build_event(ctx, action, gate_name, outcome);
        if let Ok(payload) = serde_json::to_string(&event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopGateEventSink;

impl GateEventSink for NoopGateEventSink {
    fn record(&self, _ctx: &RequestContext, _action: &GateAction, _gate_name: &'static str, _outcome: &GateOutcome) {}
}

fn build_event<'a>(ctx: &'a RequestContext, action: &'a GateAction, gate_name: &'static str, outcome: &GateOutcome) -> SafetyDecisionEvent<'a> {
    let (result, reason) = match outcome {
        GateOutcome::Pass => ("allow", None),
        GateOutcome::Block(err) => ("block", Some(err.to_string())),
    };
    SafetyDecisionEvent {
        event: "safety_decision",
        action: &action.name,
        gate: gate_name,
        result,
        reason,
        tenant_id: ctx.tenant_id.to_string(),
        request_id: ctx.request_id.to_string(),
    }
}

// ============================================================================
// SECTION: Chain
// ============================================================================

/// An ordered chain of gates evaluated in sequence; the first block wins.
pub struct GateChain {
    gates: Vec<Box<dyn Gate>>,
}

impl GateChain {
    /// Builds a chain from an explicit, ordered list of gates.
    #[must_use]
    pub fn new(gates: Vec<Box<dyn Gate>>) -> Self {
        Self {
            gates,
        }
    }

    /// Builds the standard five-gate built-in chain; services append
    /// domain-specific gates with [`GateChain::with_gate`].
    #[must_use]
    pub fn with_builtin_gates(membership: Box<dyn MembershipAuthorizer>, backend_class: BackendClassGate) -> Self {
        Self::new(vec![
            Box::new(AuthenticatedGate),
            Box::new(MembershipGate::new(membership)),
            Box::new(ContextMatchGate),
            Box::new(IdentityOverrideGate),
            Box::new(backend_class),
        ])
    }

    /// Appends one more gate to the end of the chain.
    #[must_use]
    pub fn with_gate(mut self, gate: Box<dyn Gate>) -> Self {
        self.gates.push(gate);
        self
    }

    /// Evaluates every gate in order, reporting each to `sink`, and stops at
    /// the first block.
    pub fn evaluate(&self, ctx: &RequestContext, action: &GateAction, sink: &dyn GateEventSink) -> GateChainOutcome {
        for gate in &self.gates {
            let outcome = gate.evaluate(ctx, action);
            sink.record(ctx, action, gate.name(), &outcome);
            if let GateOutcome::Block(error) = outcome {
                return GateChainOutcome::Blocked {
                    gate: gate.name(),
                    error,
                };
            }
        }
        GateChainOutcome::Passed
    }
}

#[cfg(test)]
mod tests {
    use substrate_core::ProjectId;
    use substrate_core::RequestId;

    use super::*;
    use crate::membership::AllowAllMembership;

    fn ctx() -> RequestContext {
        RequestContext {
            tenant_id: substrate_core::TenantId::parse("t_acme").expect("valid"),
            mode: substrate_core::Mode::Saas,
            env: substrate_core::Env::Prod,
            project_id: ProjectId::new("p1"),
            surface_id: None,
            app_id: None,
            user_id: Some(substrate_core::UserId::new("u1")),
            actor_id: None,
            membership_role: None,
            request_id: RequestId::new("r1"),
            trace_id: None,
            run_id: None,
            step_id: None,
        }
    }

    #[test]
    fn chain_passes_when_every_gate_passes() {
        let chain = GateChain::with_builtin_gates(Box::new(AllowAllMembership), BackendClassGate::new(|_, _, _| Ok(())));
        let action = GateAction {
            name: "blackboard.write".to_owned(),
            requires_authentication: true,
            ..GateAction::default()
        };
        let outcome = chain.evaluate(&ctx(), &action, &NoopGateEventSink);
        assert!(matches!(outcome, GateChainOutcome::Passed));
    }

    #[test]
    fn chain_blocks_on_identity_override() {
        let chain = GateChain::with_builtin_gates(Box::new(AllowAllMembership), BackendClassGate::new(|_, _, _| Ok(())));
        let action = GateAction {
            name: "blackboard.write".to_owned(),
            requires_authentication: true,
            client_supplied_identity: ClientSuppliedIdentity {
                tenant_id: Some("t_beta".to_owned()),
                ..ClientSuppliedIdentity::default()
            },
            ..GateAction::default()
        };
        let outcome = chain.evaluate(&ctx(), &action, &NoopGateEventSink);
        match outcome {
            GateChainOutcome::Blocked {
                gate,
                error,
            } => {
                assert_eq!(gate, "identity_override");
                assert!(matches!(error, SubstrateError::IdentityOverride(_)));
            }
            GateChainOutcome::Passed => panic!("expected block"),
        }
    }

    #[test]
    fn chain_blocks_on_backend_class_guard() {
        let chain = GateChain::with_builtin_gates(
            Box::new(AllowAllMembership),
            BackendClassGate::new(|_, resource_kind, backend_type| {
                Err(SubstrateError::ForbiddenBackendClass {
                    resource_kind,
                    backend_type: backend_type.to_owned(),
                })
            }),
        );
        let action = GateAction {
            name: "object_store.put".to_owned(),
            requires_authentication: true,
            resource_kind: Some(ResourceKind::ObjectStore),
            backend_type: Some("filesystem".to_owned()),
            ..GateAction::default()
        };
        let outcome = chain.evaluate(&ctx(), &action, &NoopGateEventSink);
        match outcome {
            GateChainOutcome::Blocked {
                gate,
                ..
            } => assert_eq!(gate, "backend_class"),
            GateChainOutcome::Passed => panic!("expected block"),
        }
    }
}
