// crates/substrate-server/tests/health_and_routing.rs
// ============================================================================
// Module: Health and Routing Integration Tests
// Description: Boots a real AppState over a temp SQLite file and exercises
//              the health probes and routing registry handlers directly.
// Purpose: Verify the Startup Validator, readiness probe, and tenant
//          isolation behave correctly end to end, not just at the unit level.
// Dependencies: substrate-server, substrate-core, substrate-store-sqlite
// ============================================================================

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only setup and assertions are permitted.")]

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use substrate_core::Env;
use substrate_core::ResourceKind;
use substrate_core::ResourceRoute;
use substrate_core::RouteId;
use substrate_core::RoutingRegistryStore;
use substrate_core::TenantId;
use substrate_core::Timestamp;
use substrate_server::SubstrateConfig;
use substrate_server::handlers::health;
use substrate_server::handlers::routing;
use substrate_server::state::AppState;
use substrate_store_sqlite::SqliteStoreConfig;
use substrate_store_sqlite::SqliteSubstrateStore;
use tempfile::TempDir;

fn seed_route(store: &SqliteSubstrateStore, resource_kind: ResourceKind, tenant_id: &str, env: Env) {
    let now = Timestamp::now();
    store
        .upsert_route(ResourceRoute {
            id: RouteId::new(format!("seed-{}-{tenant_id}-{}", resource_kind.as_str(), env.as_str())),
            resource_kind,
            tenant_id: TenantId::parse(tenant_id).expect("valid tenant id"),
            env,
            project_id: None,
            surface_id: None,
            backend_type: "sqlite".to_owned(),
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
        })
        .expect("seed route");
}

fn boot_state(dir: &TempDir) -> AppState {
    let sqlite = SqliteStoreConfig {
        path: dir.path().join("substrate.db"),
        busy_timeout_ms: 5_000,
        journal_mode: substrate_store_sqlite::SqliteStoreMode::Wal,
        sync_mode: substrate_store_sqlite::SqliteSyncMode::Full,
        read_pool_size: 1,
    };
    let seeding_store = SqliteSubstrateStore::open(&sqlite).expect("open seeding store");
    for resource_kind in [ResourceKind::RoutingRegistry, ResourceKind::EventStream, ResourceKind::BlackboardStore, ResourceKind::MemoryStore] {
        seed_route(&seeding_store, resource_kind, "t_system", Env::Dev);
    }
    drop(seeding_store);

    let config = SubstrateConfig {
        server: substrate_server::config::ServerConfig::default(),
        deployment: substrate_server::config::DeploymentConfig {
            env: Env::Dev,
            default_mode: substrate_core::Mode::Saas,
        },
        sqlite,
        lab_object_store_root: dir.path().join("object_store"),
        required_resource_kinds: vec![ResourceKind::RoutingRegistry, ResourceKind::EventStream, ResourceKind::BlackboardStore, ResourceKind::MemoryStore],
    };
    AppState::build(&config).expect("boots after required routes are seeded")
}

fn headers_for(tenant_id: &str, project_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("x-tenant-id"), HeaderValue::from_str(tenant_id).unwrap());
    headers.insert(HeaderName::from_static("x-mode"), HeaderValue::from_static("saas"));
    headers.insert(HeaderName::from_static("x-project-id"), HeaderValue::from_str(project_id).unwrap());
    headers
}

#[tokio::test]
async fn readyz_reports_ready_after_seeding_required_routes() {
    let dir = TempDir::new().expect("tempdir");
    let state = boot_state(&dir);
    let (status, Json(body)) = health::readyz(State(state)).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert!(body.ready);
    assert!(body.detail.is_none());
}

#[tokio::test]
async fn routing_list_is_scoped_to_the_resolved_tenant() {
    let dir = TempDir::new().expect("tempdir");
    let state = boot_state(&dir);

    seed_route(&state.store, ResourceKind::ObjectStore, "t_acme", Env::Dev);
    seed_route(&state.store, ResourceKind::ObjectStore, "t_other", Env::Dev);

    let headers = headers_for("t_acme", "proj-1");
    let result = routing::list(State(state), headers, Query(routing::ListRoutesQuery { resource_kind: None, env: None })).await;
    let routes = result.expect("list succeeds").0;

    assert!(routes.iter().all(|route| route.tenant_id.as_str() == "t_acme"));
    assert!(routes.iter().any(|route| route.resource_kind == ResourceKind::ObjectStore));
}

#[tokio::test]
async fn routing_get_exact_rejects_cross_tenant_lookup() {
    let dir = TempDir::new().expect("tempdir");
    let state = boot_state(&dir);

    seed_route(&state.store, ResourceKind::ObjectStore, "t_other", Env::Dev);

    let headers = headers_for("t_acme", "proj-1");
    let path = routing::ExactRoutePath {
        resource_kind: ResourceKind::ObjectStore,
        tenant_id: "t_other".to_owned(),
        env: Env::Dev,
    };
    let result = routing::get_exact(State(state), headers, axum::extract::Path(path)).await;
    assert!(result.is_err());
}
