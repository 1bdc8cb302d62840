// crates/substrate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Substrate Interfaces
// Description: Backend-agnostic adapter and registry interfaces.
// Purpose: Define the contract surfaces every concrete backend must satisfy.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the control plane integrates with durable backends
//! without embedding backend-specific details. Implementations must be
//! concurrency-safe and must fail closed: no interface here is permitted to
//! silently substitute an in-memory or no-op implementation for a missing
//! durable backend.
//!
//! Security posture: implementations consume untrusted inputs routed through
//! the Identity & Context Resolver; every key passed to an `ObjectStore` is
//! already tenant/env-prefixed by the resolver and adapters must not bypass
//! that prefix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::model::AuditEntry;
use crate::core::model::BlackboardEntry;
use crate::core::model::EventEnvelope;
use crate::core::model::ResourceRoute;

// ============================================================================
// SECTION: Adapter Error
// ============================================================================

/// Errors raised by any adapter implementation.
///
/// # Invariants
/// - Variants are stable for programmatic handling; callers map these onto
///   [`crate::core::errors::SubstrateError`] without losing `resource_kind`
///   or scope context.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The backend is unreachable or returned a transient failure.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend rejected the operation as invalid.
    #[error("adapter invalid operation: {0}")]
    Invalid(String),
    /// A write exceeded a configured size limit.
    #[error("payload too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Path or key that was too large.
        path: String,
        /// Maximum allowed size in bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// An optimistic-concurrency check failed.
    #[error("version conflict: expected {expected_version:?}, current {current_version}")]
    VersionConflict {
        /// Version the caller expected.
        expected_version: Option<u64>,
        /// Actual current version.
        current_version: u64,
    },
    /// An append cursor was unknown or invalid.
    #[error("cursor invalid")]
    CursorInvalid,
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// A single page of keys returned by [`ObjectStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ObjectListPage {
    /// Keys found under the requested prefix, in backend order.
    pub keys: Vec<String>,
    /// Opaque cursor for the next page, if more results remain.
    pub next_cursor: Option<String>,
}

/// Backend-agnostic raw object storage.
///
/// Keys passed to every method are already tenant/env-prefixed by the
/// resolver; implementations must not strip or bypass that prefix.
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `key` with an optional content type.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the write fails or exceeds a size limit.
    fn put(&self, key: &str, bytes: &[u8], content_type: Option<&str>) -> Result<(), AdapterError>;

    /// Reads the bytes stored under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the read fails.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AdapterError>;

    /// Returns whether `key` exists.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the existence check fails.
    fn exists(&self, key: &str) -> Result<bool, AdapterError>;

    /// Lists keys under `prefix`, paginated by an opaque cursor.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the listing fails.
    fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ObjectListPage, AdapterError>;

    /// Deletes `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the delete fails.
    fn delete(&self, key: &str) -> Result<(), AdapterError>;
}

// ============================================================================
// SECTION: Event Stream
// ============================================================================

/// Backend-agnostic append-only event stream storage.
pub trait EventStream: Send + Sync {
    /// Appends `envelope`/`payload` to `stream_id`, returning the assigned,
    /// strictly monotonic `event_id`. Duplicate appends carrying the same
    /// `idempotency_key` return the original `event_id` without re-appending.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] when the append cannot be
    /// durably committed; the caller must retry, never fall back.
    fn append(
        &self,
        stream_id: &str,
        envelope: EventEnvelope,
        payload: serde_json::Value,
    ) -> Result<crate::core::identifiers::EventId, AdapterError>;

    /// Returns envelopes strictly after `after_event_id`, in `event_id`
    /// order, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::CursorInvalid`] when `after_event_id` is
    /// unknown to this stream.
    fn list_after(
        &self,
        stream_id: &str,
        after_event_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<crate::core::model::StreamRecord>, AdapterError>;
}

// ============================================================================
// SECTION: Tabular Store
// ============================================================================

/// A single page of tabular records returned by [`TabularStore::list`].
#[derive(Debug, Clone, Default)]
pub struct TabularPage {
    /// Records found under the requested prefix, in key order.
    pub records: Vec<(String, serde_json::Value)>,
    /// Opaque cursor for the next page, if more results remain.
    pub next_cursor: Option<String>,
}

/// Backend-agnostic tabular record storage.
pub trait TabularStore: Send + Sync {
    /// Creates or replaces the record at `(table, key)`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the write fails.
    fn upsert(&self, table: &str, key: &str, record: serde_json::Value) -> Result<(), AdapterError>;

    /// Reads the record at `(table, key)`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the read fails.
    fn get(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>, AdapterError>;

    /// Lists records in `table` under `prefix`, paginated by an opaque cursor.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the listing fails.
    fn list(&self, table: &str, prefix: &str, cursor: Option<&str>) -> Result<TabularPage, AdapterError>;
}

// ============================================================================
// SECTION: Memory Store
// ============================================================================

/// Backend-agnostic simple key/value memory storage.
pub trait MemoryStore: Send + Sync {
    /// Sets `key` to `value`, with an optional TTL in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the write fails.
    fn set(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>) -> Result<(), AdapterError>;

    /// Reads `key`, if present and not expired.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the read fails.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AdapterError>;

    /// Deletes `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the delete fails.
    fn delete(&self, key: &str) -> Result<(), AdapterError>;
}

// ============================================================================
// SECTION: Blackboard
// ============================================================================

/// Backend-agnostic versioned coordination key/value storage.
///
/// Concurrency contract: the check-and-set implied by `expected_version`
/// must be atomic at the backend level; exactly one concurrent writer with a
/// given `expected_version` may succeed.
pub trait Blackboard: Send + Sync {
    /// Writes `key` within `stream_key`. See [`crate::core::errors::SubstrateError::VersionConflict`]
    /// for the optimistic-concurrency contract.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::VersionConflict`] when `expected_version`
    /// does not match the current version, and [`AdapterError::Unavailable`]
    /// on backend failure.
    fn write(
        &self,
        stream_key: &str,
        key: &str,
        value: serde_json::Value,
        expected_version: Option<u64>,
        actor: Option<&crate::core::identifiers::ActorId>,
    ) -> Result<BlackboardEntry, AdapterError>;

    /// Reads the latest or a specific historical version of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the read fails.
    fn read(&self, stream_key: &str, key: &str, version: Option<u64>) -> Result<Option<BlackboardEntry>, AdapterError>;

    /// Lists every key present within `stream_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the listing fails.
    fn list_keys(&self, stream_key: &str) -> Result<Vec<String>, AdapterError>;
}

// ============================================================================
// SECTION: Analytics Store
// ============================================================================

/// A single page of analytics records returned by [`AnalyticsStore::query`].
#[derive(Debug, Clone, Default)]
pub struct AnalyticsPage {
    /// Matching envelopes, in backend order.
    pub records: Vec<crate::core::model::StreamRecord>,
    /// Opaque cursor for the next page, if more results remain.
    pub next_cursor: Option<String>,
}

/// Filters accepted by [`AnalyticsStore::query`].
#[derive(Debug, Clone, Default)]
pub struct AnalyticsQuery {
    /// Restrict to this tenant, if set.
    pub tenant_id: Option<String>,
    /// Restrict to this event type, if set.
    pub event_type: Option<String>,
    /// Maximum records to return in one page.
    pub limit: usize,
}

/// Backend-agnostic analytics ingestion and query storage.
pub trait AnalyticsStore: Send + Sync {
    /// Ingests `envelope`/`payload` for later querying.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when ingestion fails.
    fn ingest(&self, envelope: EventEnvelope, payload: serde_json::Value) -> Result<(), AdapterError>;

    /// Queries ingested records matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the query fails.
    fn query(&self, filters: &AnalyticsQuery, cursor: Option<&str>) -> Result<AnalyticsPage, AdapterError>;
}

// ============================================================================
// SECTION: Routing Registry Storage
// ============================================================================

/// Filters accepted by [`RoutingRegistryStore::list_routes`].
#[derive(Debug, Clone, Default)]
pub struct RouteFilters {
    /// Restrict to this resource kind, if set.
    pub resource_kind: Option<crate::core::model::ResourceKind>,
    /// Restrict to this tenant, if set.
    pub tenant_id: Option<String>,
    /// Restrict to this env, if set.
    pub env: Option<String>,
}

/// Durable storage backing the routing registry itself.
pub trait RoutingRegistryStore: Send + Sync {
    /// Creates or updates a route record.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the write fails.
    fn upsert_route(&self, route: ResourceRoute) -> Result<ResourceRoute, AdapterError>;

    /// Looks up the exact route for `(resource_kind, tenant_id, env, project_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the lookup fails.
    fn get_exact_route(
        &self,
        resource_kind: crate::core::model::ResourceKind,
        tenant_id: &str,
        env: &str,
        project_id: Option<&str>,
    ) -> Result<Option<ResourceRoute>, AdapterError>;

    /// Lists routes matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the listing fails.
    fn list_routes(&self, filters: &RouteFilters) -> Result<Vec<ResourceRoute>, AdapterError>;

    /// Soft-deletes the route identified by `id`, retaining its audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the delete fails.
    fn delete_route(&self, id: &str) -> Result<(), AdapterError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Pluggable sink every gate and registry mutation writes audit entries
/// through. Mirrors the append-only, per-tenant hash chain contract of
/// [`crate::core::model::AuditEntry`].
pub trait AuditSink: Send + Sync {
    /// Appends `entry` to the tenant's audit chain.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the append fails.
    fn record(&self, entry: &AuditEntry) -> Result<(), AdapterError>;

    /// Returns the last entry appended for `tenant_id`, if any, so the
    /// caller can compute the next `prev_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the lookup fails.
    fn last_entry(&self, tenant_id: &str) -> Result<Option<AuditEntry>, AdapterError>;

    /// Returns every entry recorded for `tenant_id`, in append order, for
    /// chain verification.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the listing fails.
    fn list_entries(&self, tenant_id: &str) -> Result<Vec<AuditEntry>, AdapterError>;
}
