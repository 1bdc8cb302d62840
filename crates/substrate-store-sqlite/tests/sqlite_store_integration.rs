// crates/substrate-store-sqlite/tests/sqlite_store_integration.rs
// ============================================================================
// Module: SQLite Substrate Store Integration Tests
// Description: End-to-end coverage of the routing, event stream, blackboard,
//              and audit sink implementations against a real database file.
// Purpose: Exercise the durable backend the way `lab` deployments actually use it.
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;

use substrate_core::ActorId;
use substrate_core::ActorType;
use substrate_core::AdapterError;
use substrate_core::AuditEntry;
use substrate_core::AuditSink;
use substrate_core::Blackboard;
use substrate_core::Env;
use substrate_core::EventEnvelope;
use substrate_core::EventStream;
use substrate_core::EventType;
use substrate_core::HashDigest;
use substrate_core::Mode;
use substrate_core::ProjectId;
use substrate_core::RequestId;
use substrate_core::ResourceKind;
use substrate_core::ResourceRoute;
use substrate_core::RouteFilters;
use substrate_core::RouteId;
use substrate_core::RoutingRegistryStore;
use substrate_core::Severity;
use substrate_core::StorageClass;
use substrate_core::TenantId;
use substrate_core::Timestamp;
use substrate_store_sqlite::SqliteStoreConfig;
use substrate_store_sqlite::SqliteSubstrateStore;

fn open_store(dir: &tempfile::TempDir) -> SqliteSubstrateStore {
    let config = SqliteStoreConfig {
        path: dir.path().join("substrate.sqlite3"),
        busy_timeout_ms: 5_000,
        journal_mode: substrate_store_sqlite::SqliteStoreMode::Wal,
        sync_mode: substrate_store_sqlite::SqliteSyncMode::Normal,
        read_pool_size: 2,
    };
    SqliteSubstrateStore::open(&config).expect("open store")
}

fn sample_route(tenant: &str, backend_type: &str) -> ResourceRoute {
    let now = Timestamp::now();
    ResourceRoute {
        id: RouteId::new(format!("route-{tenant}")),
        resource_kind: ResourceKind::ObjectStore,
        tenant_id: TenantId::parse(tenant).expect("valid tenant"),
        env: Env::Dev,
        project_id: None,
        surface_id: None,
        backend_type: backend_type.to_owned(),
        config: BTreeMap::new(),
        required: true,
        tier: None,
        cost_notes: None,
        health_status: None,
        previous_backend_type: None,
        last_switch_time: None,
        switch_rationale: None,
        created_at: now,
        updated_at: now,
    }
}

fn sample_envelope(tenant: &str) -> EventEnvelope {
    EventEnvelope {
        tenant_id: TenantId::parse(tenant).expect("valid tenant"),
        mode: Mode::Lab,
        env: Env::Dev,
        project_id: ProjectId::new("p1"),
        app_id: None,
        surface_id: None,
        actor_id: ActorId::new("a1"),
        actor_type: ActorType::System,
        thread_id: None,
        canvas_id: None,
        session_id: None,
        event_id: None,
        request_id: RequestId::new("r1"),
        trace_id: None,
        run_id: None,
        step_id: None,
        event_type: EventType::Domain("test".to_owned()),
        timestamp: Timestamp::now(),
        severity: Severity::Info,
        schema_version: 1,
        storage_class: StorageClass::Stream,
        pii_flags: Vec::new(),
        idempotency_key: None,
    }
}

#[test]
fn routing_registry_round_trips_exact_lookup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let route = sample_route("t_acme", "filesystem");
    store.upsert_route(route.clone()).expect("upsert");
    let found = store
        .get_exact_route(ResourceKind::ObjectStore, "t_acme", "dev", None)
        .expect("lookup")
        .expect("route present");
    assert_eq!(found.id, route.id);
    assert_eq!(found.backend_type, "filesystem");
}

#[test]
fn routing_registry_list_filters_by_tenant() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    store.upsert_route(sample_route("t_acme", "filesystem")).expect("upsert");
    store.upsert_route(sample_route("t_beta", "s3")).expect("upsert");
    let filters = RouteFilters {
        tenant_id: Some("t_acme".to_owned()),
        ..RouteFilters::default()
    };
    let routes = store.list_routes(&filters).expect("list");
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].tenant_id.as_str(), "t_acme");
}

#[test]
fn routing_registry_soft_deletes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let route = sample_route("t_acme", "filesystem");
    store.upsert_route(route.clone()).expect("upsert");
    store.delete_route(route.id.as_str()).expect("delete");
    let found = store.get_exact_route(ResourceKind::ObjectStore, "t_acme", "dev", None).expect("lookup");
    assert!(found.is_none());
}

#[test]
fn event_stream_assigns_monotonic_ids_and_dedups() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let mut envelope = sample_envelope("t_acme");
    envelope.idempotency_key = Some(substrate_core::IdempotencyKey::new("dup-1"));
    let first = store.append("s1", envelope.clone(), serde_json::json!({"n": 1})).expect("append");
    let second = store.append("s1", envelope, serde_json::json!({"n": 1})).expect("append");
    assert_eq!(first, second);
    let third = store.append("s1", sample_envelope("t_acme"), serde_json::json!({"n": 2})).expect("append");
    assert!(third.as_str() > first.as_str());
    let all = store.list_after("s1", None, 10).expect("list");
    assert_eq!(all.len(), 2);
}

#[test]
fn event_stream_rejects_unknown_cursor() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    store.append("s1", sample_envelope("t_acme"), serde_json::json!({})).expect("append");
    let err = store.list_after("s1", Some("nonexistent"), 10);
    assert!(matches!(err, Err(AdapterError::CursorInvalid)));
}

#[test]
fn blackboard_enforces_optimistic_concurrency() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let v1 = store.write("sk", "k", serde_json::json!("v1"), None, None).expect("create");
    assert_eq!(v1.version, 1);
    let v2 = store.write("sk", "k", serde_json::json!("v2"), Some(1), None).expect("update");
    assert_eq!(v2.version, 2);
    let conflict = store.write("sk", "k", serde_json::json!("v3"), Some(1), None);
    assert!(matches!(conflict, Err(AdapterError::VersionConflict { current_version: 2, .. })));
}

#[test]
fn blackboard_lists_keys_per_stream() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    store.write("sk", "a", serde_json::json!(1), None, None).expect("create a");
    store.write("sk", "b", serde_json::json!(2), None, None).expect("create b");
    store.write("other", "c", serde_json::json!(3), None, None).expect("create c");
    let keys = store.list_keys("sk").expect("list keys");
    assert_eq!(keys, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn audit_sink_persists_and_replays_hash_chain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    assert!(store.last_entry("t_acme").expect("last entry lookup").is_none());
    let mut envelope = sample_envelope("t_acme");
    envelope.storage_class = StorageClass::Audit;
    let payload = serde_json::json!({"decision": "allow"});
    let hash = HashDigest::from_hex(&"11".repeat(32)).expect("hex");
    let entry = AuditEntry {
        envelope,
        payload,
        prev_hash: HashDigest::GENESIS,
        hash,
    };
    store.record(&entry).expect("record");
    let last = store.last_entry("t_acme").expect("last entry lookup").expect("entry present");
    assert_eq!(last.hash, hash);
    assert_eq!(last.prev_hash, HashDigest::GENESIS);
}
