// crates/substrate-core/src/lib.rs
// ============================================================================
// Module: Substrate Core
// Description: Shared data model, identifiers, hashing, and adapter interfaces.
// Purpose: Give every other crate in the workspace one validated vocabulary.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! `substrate-core` has no knowledge of HTTP, SQLite, or any concrete
//! backend. It defines the identifiers, the `RequestContext`/`ResourceRoute`/
//! `EventEnvelope`/`BlackboardEntry`/`AuditEntry` data model, the crate-wide
//! error taxonomy, and the backend-agnostic adapter traits every concrete
//! implementation satisfies. Everything here must stay deterministic and
//! free of I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::errors::ErrorEnvelope;
pub use core::errors::SubstrateError;
pub use core::hashing::HashDigest;
pub use core::hashing::HashingError;
pub use core::hashing::canonical_json_bytes;
pub use core::hashing::chain_hash;
pub use core::identifiers::ActorId;
pub use core::identifiers::AppId;
pub use core::identifiers::EventId;
pub use core::identifiers::IdempotencyKey;
pub use core::identifiers::ProjectId;
pub use core::identifiers::RequestId;
pub use core::identifiers::RouteId;
pub use core::identifiers::RunId;
pub use core::identifiers::StepId;
pub use core::identifiers::StreamId;
pub use core::identifiers::SurfaceId;
pub use core::identifiers::TenantId;
pub use core::identifiers::TenantIdInvalid;
pub use core::identifiers::TraceId;
pub use core::identifiers::UserId;
pub use core::model::ActorType;
pub use core::model::AuditEntry;
pub use core::model::BlackboardEntry;
pub use core::model::ClientSuppliedIdentity;
pub use core::model::ContextMismatch;
pub use core::model::Env;
pub use core::model::EventEnvelope;
pub use core::model::EventType;
pub use core::model::Membership;
pub use core::model::MembershipRole;
pub use core::model::Mode;
pub use core::model::PayloadScope;
pub use core::model::RequestContext;
pub use core::model::ResourceKind;
pub use core::model::ResourceRoute;
pub use core::model::Severity;
pub use core::model::StorageClass;
pub use core::model::StreamRecord;
pub use core::model::assert_context_matches;
pub use core::model::normalize_surface_id;
pub use core::model::validate_identity_precedence;
pub use core::time::Timestamp;
pub use interfaces::AdapterError;
pub use interfaces::AnalyticsPage;
pub use interfaces::AnalyticsQuery;
pub use interfaces::AnalyticsStore;
pub use interfaces::AuditSink;
pub use interfaces::Blackboard;
pub use interfaces::EventStream;
pub use interfaces::MemoryStore;
pub use interfaces::ObjectListPage;
pub use interfaces::ObjectStore;
pub use interfaces::RouteFilters;
pub use interfaces::RoutingRegistryStore;
pub use interfaces::TabularPage;
pub use interfaces::TabularStore;
