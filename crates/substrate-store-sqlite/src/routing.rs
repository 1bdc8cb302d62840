// crates/substrate-store-sqlite/src/routing.rs
// ============================================================================
// Module: SQLite Routing Registry Store
// Description: Durable RoutingRegistryStore backed by the shared SQLite store.
// Purpose: Give the routing registry a real, queryable backend for lab and
//          sellable deployments alike.
// Dependencies: rusqlite, substrate-core
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use substrate_core::AdapterError;
use substrate_core::ResourceKind;
use substrate_core::ResourceRoute;
use substrate_core::RouteFilters;
use substrate_core::RoutingRegistryStore;

use crate::store::SqliteSubstrateStore;

fn parse_route_row(record_json: &str) -> Result<ResourceRoute, AdapterError> {
    serde_json::from_str(record_json).map_err(|err| AdapterError::Invalid(format!("corrupt route record: {err}")))
}

impl RoutingRegistryStore for SqliteSubstrateStore {
    fn upsert_route(&self, route: ResourceRoute) -> Result<ResourceRoute, AdapterError> {
        let record_json = serde_json::to_string(&route).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let conn = self.write_connection();
        conn.execute(
            "INSERT INTO routes (id, resource_kind, tenant_id, env, project_id, surface_id, record_json, updated_at, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)
             ON CONFLICT(id) DO UPDATE SET
                resource_kind = excluded.resource_kind,
                tenant_id = excluded.tenant_id,
                env = excluded.env,
                project_id = excluded.project_id,
                surface_id = excluded.surface_id,
                record_json = excluded.record_json,
                updated_at = excluded.updated_at,
                deleted = 0",
            params![
                route.id.as_str(),
                route.resource_kind.as_str(),
                route.tenant_id.as_str(),
                route.env.as_str(),
                route.project_id.as_ref().map(substrate_core::ProjectId::as_str),
                route.surface_id.as_ref().map(substrate_core::SurfaceId::as_str),
                record_json,
                route.updated_at.as_unix_millis(),
            ],
        )
        .map_err(|err| AdapterError::Unavailable(format!("route upsert failed: {err}")))?;
        Ok(route)
    }

    fn get_exact_route(
        &self,
        resource_kind: ResourceKind,
        tenant_id: &str,
        env: &str,
        project_id: Option<&str>,
    ) -> Result<Option<ResourceRoute>, AdapterError> {
        let conn = self.read_connection();
        let record_json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM routes
                 WHERE resource_kind = ?1 AND tenant_id = ?2 AND env = ?3
                   AND COALESCE(project_id, '') = COALESCE(?4, '') AND deleted = 0",
                params![resource_kind.as_str(), tenant_id, env, project_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| AdapterError::Unavailable(format!("route lookup failed: {err}")))?;
        record_json.map(|json| parse_route_row(&json)).transpose()
    }

    fn list_routes(&self, filters: &RouteFilters) -> Result<Vec<ResourceRoute>, AdapterError> {
        let conn = self.read_connection();
        let mut stmt = conn
            .prepare(
                "SELECT record_json FROM routes
                 WHERE deleted = 0
                   AND (?1 IS NULL OR resource_kind = ?1)
                   AND (?2 IS NULL OR tenant_id = ?2)
                   AND (?3 IS NULL OR env = ?3)
                 ORDER BY tenant_id, env, resource_kind",
            )
            .map_err(|err| AdapterError::Unavailable(format!("route list prepare failed: {err}")))?;
        let resource_kind_filter = filters.resource_kind.map(ResourceKind::as_str);
        let rows = stmt
            .query_map(params![resource_kind_filter, filters.tenant_id, filters.env], |row| row.get::<_, String>(0))
            .map_err(|err| AdapterError::Unavailable(format!("route list query failed: {err}")))?;
        let mut routes = Vec::new();
        for row in rows {
            let json = row.map_err(|err| AdapterError::Unavailable(format!("route list row failed: {err}")))?;
            routes.push(parse_route_row(&json)?);
        }
        Ok(routes)
    }

    fn delete_route(&self, id: &str) -> Result<(), AdapterError> {
        let conn = self.write_connection();
        conn.execute("UPDATE routes SET deleted = 1 WHERE id = ?1", params![id])
            .map_err(|err| AdapterError::Unavailable(format!("route delete failed: {err}")))?;
        Ok(())
    }
}
