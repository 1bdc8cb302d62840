// crates/substrate-core/src/core/model.rs
// ============================================================================
// Module: Substrate Data Model
// Description: RequestContext, ResourceRoute, EventEnvelope, and coordination records.
// Purpose: Give every subsystem one shared, validated vocabulary of records.
// Dependencies: crate::core::identifiers, crate::core::time, serde
// ============================================================================

//! ## Overview
//! Every boundary-crossing value in the control plane is one of the typed
//! records defined here. None of them are constructed partially: invariants
//! are enforced at the constructor, not re-checked by every caller.
//!
//! Security posture: fields originating from client input are treated as
//! untrusted until validated by [`crate::core::identifiers::TenantId::parse`]
//! and the surface/mode/env normalization helpers below.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::AppId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::ProjectId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::RouteId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::StepId;
use crate::core::identifiers::SurfaceId;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::TraceId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Mode / Env / Role Enums
// ============================================================================

/// Deployment class of a tenant; drives the backend-class guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Multi-tenant sellable deployment.
    Saas,
    /// Single-tenant sellable deployment.
    Enterprise,
    /// Local/developer deployment; permits non-durable backends.
    Lab,
}

impl Mode {
    /// Parses a mode from its wire string form.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "saas" => Some(Self::Saas),
            "enterprise" => Some(Self::Enterprise),
            "lab" => Some(Self::Lab),
            _ => None,
        }
    }

    /// Returns true when this mode is a sellable (non-lab) mode.
    #[must_use]
    pub const fn is_sellable(self) -> bool {
        matches!(self, Self::Saas | Self::Enterprise)
    }

    /// Returns the wire string form of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Saas => "saas",
            Self::Enterprise => "enterprise",
            Self::Lab => "lab",
        }
    }
}

/// Deployment environment of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Env {
    /// Development environment.
    Dev,
    /// Staging environment.
    Staging,
    /// Production environment.
    Prod,
}

impl Env {
    /// Parses and normalizes an environment value; `stage` aliases to `staging`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "dev" => Some(Self::Dev),
            "staging" | "stage" => Some(Self::Staging),
            "prod" => Some(Self::Prod),
            _ => None,
        }
    }

    /// Returns the canonical wire string form of this environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }
}

/// Role a user holds within a tenant membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    /// Tenant owner; full control.
    Owner,
    /// Tenant administrator.
    Admin,
    /// Ordinary tenant member.
    Member,
}

impl MembershipRole {
    /// Parses a membership role from its wire string form.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Surface Normalization
// ============================================================================

/// Normalizes a surface identifier through the canonical alias table.
///
/// The set of recognized aliases is intentionally small and documented: it is
/// the minimum viable alias set the design notes call for, extractable
/// without changing call sites. Unrecognized surface ids pass through
/// lowercased, unchanged.
#[must_use]
pub fn normalize_surface_id(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    match lowered.as_str() {
        "squared" | "squared2" | "squared²" | "sq2" => "squared2".to_owned(),
        other => other.to_owned(),
    }
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Validated per-request identity and routing context.
///
/// # Invariants
/// - `tenant_id`, `mode`, `env`, `project_id` are always present and valid.
/// - `surface_id`, if set, is already in canonical form.
/// - Never mutated after construction; every resolver returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Resolved tenant identifier.
    pub tenant_id: TenantId,
    /// Resolved deployment mode.
    pub mode: Mode,
    /// Resolved deployment environment.
    pub env: Env,
    /// Resolved project identifier.
    pub project_id: ProjectId,
    /// Canonical surface identifier, if supplied.
    pub surface_id: Option<SurfaceId>,
    /// Application identifier, if supplied.
    pub app_id: Option<AppId>,
    /// Authenticated user identifier, if any.
    pub user_id: Option<UserId>,
    /// Actor identifier attached to emitted envelopes.
    pub actor_id: Option<ActorId>,
    /// Membership role of `user_id` within `tenant_id`, if known.
    pub membership_role: Option<MembershipRole>,
    /// Per-request correlation identifier; auto-generated when absent.
    pub request_id: RequestId,
    /// Cross-request trace correlation identifier.
    pub trace_id: Option<TraceId>,
    /// Run correlation identifier.
    pub run_id: Option<RunId>,
    /// Step correlation identifier within a run.
    pub step_id: Option<StepId>,
}

/// A single field mismatch detected by [`assert_context_matches`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMismatch {
    /// Name of the mismatched field.
    pub field: String,
    /// Value present in the request context.
    pub context_value: String,
    /// Value present in the payload/path/query scope.
    pub payload_value: String,
}

/// Scope fields optionally carried in a payload, path, or query string, to be
/// compared against the resolved [`RequestContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadScope {
    /// Tenant id asserted by the payload, if any.
    pub tenant_id: Option<String>,
    /// Mode asserted by the payload, if any.
    pub mode: Option<String>,
    /// Env asserted by the payload, if any.
    pub env: Option<String>,
    /// Project id asserted by the payload, if any.
    pub project_id: Option<String>,
    /// Surface id asserted by the payload, if any.
    pub surface_id: Option<String>,
    /// App id asserted by the payload, if any.
    pub app_id: Option<String>,
}

/// Compares any scope fields present in `payload` against `ctx`, returning
/// every mismatch found. An empty result means the payload is consistent
/// with the resolved context.
#[must_use]
pub fn assert_context_matches(ctx: &RequestContext, payload: &PayloadScope) -> Vec<ContextMismatch> {
    let mut mismatches = Vec::new();
    let mut check = |field: &str, context_value: String, payload_value: &Option<String>| {
        if let Some(value) = payload_value {
            if value != &context_value {
                mismatches.push(ContextMismatch {
                    field: field.to_owned(),
                    context_value: context_value.clone(),
                    payload_value: value.clone(),
                });
            }
        }
    };
    check("tenant_id", ctx.tenant_id.to_string(), &payload.tenant_id);
    check("mode", ctx.mode.as_str().to_owned(), &payload.mode);
    check("env", ctx.env.as_str().to_owned(), &payload.env);
    check("project_id", ctx.project_id.to_string(), &payload.project_id);
    if let Some(app_id) = &ctx.app_id {
        check("app_id", app_id.to_string(), &payload.app_id);
    }
    if let Some(surface_id) = &ctx.surface_id {
        check("surface_id", surface_id.to_string(), &payload.surface_id);
    }
    mismatches
}

/// Identity fields a client attempted to supply directly on a durable-write
/// request, checked by [`validate_identity_precedence`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSuppliedIdentity {
    /// Tenant id the client supplied, if any.
    pub tenant_id: Option<String>,
    /// Project id the client supplied, if any.
    pub project_id: Option<String>,
    /// User id the client supplied, if any.
    pub user_id: Option<String>,
    /// Surface id the client supplied, if any.
    pub surface_id: Option<String>,
    /// Mode the client supplied, if any.
    pub mode: Option<String>,
}

/// Returns the mismatches between `client_supplied` identity fields and the
/// resolved `ctx`. A non-empty result means the caller must reject the
/// request with `auth.identity_override` and emit an `auth_violation` event.
#[must_use]
pub fn validate_identity_precedence(
    ctx: &RequestContext,
    client_supplied: &ClientSuppliedIdentity,
) -> Vec<ContextMismatch> {
    let payload = PayloadScope {
        tenant_id: client_supplied.tenant_id.clone(),
        mode: client_supplied.mode.clone(),
        env: None,
        project_id: client_supplied.project_id.clone(),
        surface_id: client_supplied.surface_id.clone(),
        app_id: None,
    };
    let mut mismatches = assert_context_matches(ctx, &payload);
    if let Some(user_id) = &client_supplied.user_id {
        let context_value = ctx.user_id.as_ref().map(ToString::to_string).unwrap_or_default();
        if user_id != &context_value {
            mismatches.push(ContextMismatch {
                field: "user_id".to_owned(),
                context_value,
                payload_value: user_id.clone(),
            });
        }
    }
    mismatches
}

// ============================================================================
// SECTION: Membership
// ============================================================================

/// Durable record of a user's membership in a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Member user identifier.
    pub user_id: UserId,
    /// Tenant the membership grants access to.
    pub tenant_id: TenantId,
    /// Role held within the tenant.
    pub role: MembershipRole,
}

// ============================================================================
// SECTION: Resource Route
// ============================================================================

/// Logical capability whose physical backend is chosen per tenant via a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Raw object storage.
    ObjectStore,
    /// Append-only event stream storage.
    EventStream,
    /// Tabular record storage.
    TabularStore,
    /// Metrics time-series storage.
    MetricsStore,
    /// Simple key/value memory storage.
    MemoryStore,
    /// Versioned coordination key/value storage.
    BlackboardStore,
    /// Analytics ingestion and query storage.
    AnalyticsStore,
    /// The routing registry's own storage.
    RoutingRegistry,
}

impl ResourceKind {
    /// Returns the wire string form of this resource kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ObjectStore => "object_store",
            Self::EventStream => "event_stream",
            Self::TabularStore => "tabular_store",
            Self::MetricsStore => "metrics_store",
            Self::MemoryStore => "memory_store",
            Self::BlackboardStore => "blackboard_store",
            Self::AnalyticsStore => "analytics_store",
            Self::RoutingRegistry => "routing_registry",
        }
    }
}

/// A durable record mapping `(resource_kind, scope)` to a backend descriptor.
///
/// # Invariants
/// - `(resource_kind, tenant_id, env, project_id)` is unique within the registry.
/// - Scope keys (`tenant_id`, `surface_id`) are always canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRoute {
    /// Stable identifier of this route record.
    pub id: RouteId,
    /// Logical resource kind this route resolves.
    pub resource_kind: ResourceKind,
    /// Tenant this route is scoped to.
    pub tenant_id: TenantId,
    /// Environment this route is scoped to.
    pub env: Env,
    /// Project this route is scoped to, if any (absent means tenant/env default).
    pub project_id: Option<ProjectId>,
    /// Surface this route is scoped to, if any.
    pub surface_id: Option<SurfaceId>,
    /// Backend type identifier (e.g. `s3`, `filesystem`, `dynamodb`).
    pub backend_type: String,
    /// Opaque backend configuration (bucket names, regions, endpoints; never secrets).
    pub config: BTreeMap<String, String>,
    /// Whether the startup validator requires this route to exist.
    pub required: bool,
    /// Operator-facing tier label.
    pub tier: Option<String>,
    /// Operator-facing cost notes.
    pub cost_notes: Option<String>,
    /// Last observed health status.
    pub health_status: Option<String>,
    /// Backend type this route previously held, if it was ever switched.
    pub previous_backend_type: Option<String>,
    /// Timestamp of the last backend switch.
    pub last_switch_time: Option<Timestamp>,
    /// Operator-supplied rationale for the last backend switch.
    pub switch_rationale: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last update timestamp.
    pub updated_at: Timestamp,
}

// ============================================================================
// SECTION: Event Envelope
// ============================================================================

/// Type of actor that produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// A human end user.
    Human,
    /// An autonomous or semi-autonomous agent.
    Agent,
    /// The system itself.
    System,
    /// A tool invoked on behalf of an actor.
    Tool,
}

/// Severity of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Diagnostic detail.
    Debug,
    /// Informational event.
    Info,
    /// Recoverable anomaly.
    Warn,
    /// Failure requiring attention.
    Error,
}

/// Storage class an envelope is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    /// Operational event stream.
    Ops,
    /// Tamper-evident audit chain entry.
    Audit,
    /// Domain event stream.
    Stream,
    /// Cost accounting event.
    Cost,
    /// Metrics event.
    Metric,
}

/// Canonical event type carried by every persisted envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A routing registry mutation.
    RouteChanged,
    /// A gate evaluation, pass or block.
    SafetyDecision,
    /// A rejected identity-override attempt.
    AuthViolation,
    /// A domain-defined event type not covered by the built-ins above.
    Domain(String),
}

/// Routing, identity, and correlation metadata attached to every persisted event.
///
/// # Invariants
/// - Required routing keys are non-empty.
/// - `event_id` is monotonic within its stream (assigned by the store, never the caller).
/// - Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Tenant this envelope belongs to.
    pub tenant_id: TenantId,
    /// Mode the originating request was made under.
    pub mode: Mode,
    /// Environment the originating request was made under.
    pub env: Env,
    /// Project this envelope belongs to.
    pub project_id: ProjectId,
    /// Application identifier, if any.
    pub app_id: Option<AppId>,
    /// Canonical surface identifier, if any.
    pub surface_id: Option<SurfaceId>,
    /// Identifier of the actor that produced this envelope.
    pub actor_id: ActorId,
    /// Type of actor that produced this envelope.
    pub actor_type: ActorType,
    /// Thread this envelope belongs to, if any.
    pub thread_id: Option<String>,
    /// Canvas this envelope belongs to, if any.
    pub canvas_id: Option<String>,
    /// Session this envelope belongs to, if any.
    pub session_id: Option<String>,
    /// Identifier assigned by the store; unique and sortable within its stream.
    pub event_id: Option<EventId>,
    /// Correlation id of the originating request.
    pub request_id: RequestId,
    /// Correlation id of the originating trace.
    pub trace_id: Option<TraceId>,
    /// Correlation id of the originating run.
    pub run_id: Option<RunId>,
    /// Correlation id of the originating step.
    pub step_id: Option<StepId>,
    /// Canonical event type.
    pub event_type: EventType,
    /// Emission timestamp.
    pub timestamp: Timestamp,
    /// Severity of this event.
    pub severity: Severity,
    /// Schema version of the envelope shape.
    pub schema_version: u32,
    /// Storage class this envelope is persisted under.
    pub storage_class: StorageClass,
    /// PII flags attached by the originating handler.
    pub pii_flags: Vec<String>,
    /// Caller-supplied idempotency key, if any, for append deduplication.
    pub idempotency_key: Option<crate::core::identifiers::IdempotencyKey>,
}

/// Current schema version stamped onto every newly constructed envelope.
pub const ENVELOPE_SCHEMA_VERSION: u32 = 1;

/// `EventEnvelope` plus its domain payload and the deterministic link to the
/// previous event in the same stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Envelope metadata for this record.
    pub envelope: EventEnvelope,
    /// Opaque domain payload, stored as canonical JSON.
    pub payload: serde_json::Value,
    /// Identifier of the event immediately preceding this one in the stream, if any.
    pub prev_event_id: Option<EventId>,
}

// ============================================================================
// SECTION: Blackboard Entry
// ============================================================================

/// A versioned coordination key/value record.
///
/// # Invariants
/// - `version` is monotonically increasing per `(stream_key, key)`.
/// - Entries are never deleted; history is queryable by version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackboardEntry {
    /// Logical stream key this entry belongs to.
    pub stream_key: String,
    /// Key within `stream_key`.
    pub key: String,
    /// Monotonically increasing version of this entry.
    pub version: u64,
    /// Opaque value, stored as canonical JSON.
    pub value: serde_json::Value,
    /// Actor that created version 1 of this key.
    pub created_by: Option<ActorId>,
    /// Timestamp version 1 of this key was created.
    pub created_at: Timestamp,
    /// Actor that wrote this specific version.
    pub updated_by: Option<ActorId>,
    /// Timestamp this specific version was written.
    pub updated_at: Timestamp,
}

// ============================================================================
// SECTION: Audit Entry
// ============================================================================

/// An `EventEnvelope` with `storage_class = audit`, extended with the
/// per-tenant hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Envelope metadata, always carrying `storage_class = audit`.
    pub envelope: EventEnvelope,
    /// Opaque audit payload, stored as canonical JSON.
    pub payload: serde_json::Value,
    /// Hash of the previous entry in this tenant's chain (genesis for the first entry).
    pub prev_hash: crate::core::hashing::HashDigest,
    /// `SHA256(canonical(payload) || prev_hash)`.
    pub hash: crate::core::hashing::HashDigest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_normalization_covers_documented_aliases() {
        assert_eq!(normalize_surface_id("SQUARED\u{b2}"), "squared2");
        assert_eq!(normalize_surface_id("squared"), "squared2");
        assert_eq!(normalize_surface_id("sq2"), "squared2");
        assert_eq!(normalize_surface_id("other-surface"), "other-surface");
    }

    #[test]
    fn env_alias_normalizes_stage_to_staging() {
        assert_eq!(Env::parse("stage"), Some(Env::Staging));
        assert_eq!(Env::parse("staging"), Some(Env::Staging));
    }

    #[test]
    fn identity_precedence_detects_tenant_override() {
        let ctx = RequestContext {
            tenant_id: TenantId::parse("t_acme").expect("valid"),
            mode: Mode::Saas,
            env: Env::Prod,
            project_id: ProjectId::new("p1"),
            surface_id: None,
            app_id: None,
            user_id: Some(UserId::new("u_1")),
            actor_id: None,
            membership_role: None,
            request_id: RequestId::new("r1"),
            trace_id: None,
            run_id: None,
            step_id: None,
        };
        let client_supplied = ClientSuppliedIdentity {
            tenant_id: Some("t_beta".to_owned()),
            ..ClientSuppliedIdentity::default()
        };
        let mismatches = validate_identity_precedence(&ctx, &client_supplied);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "tenant_id");
    }
}
