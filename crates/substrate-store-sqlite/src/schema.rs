// crates/substrate-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Schema
// Description: Connection setup and table initialization for the substrate store.
// Purpose: Centralize pragma application and DDL so every table family agrees
//          on durability settings.
// Dependencies: rusqlite
// ============================================================================

use std::path::Path;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::config::SqliteStoreConfig;
use crate::errors::SqliteStoreError;

/// Current schema version for the substrate store.
const SCHEMA_VERSION: i64 = 1;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Validates that `path` is a safe file path for the database.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] when the path is too long, has an
/// overlong component, or already exists as a directory.
pub fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_str = path.to_string_lossy();
    if path_str.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid(format!("store path too long: {} bytes", path_str.len())));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid("store path component too long".to_owned()));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid("store path must be a file, not a directory".to_owned()));
    }
    Ok(())
}

/// Creates the parent directory of `path` if it does not already exist.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Io`] when the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults and durability pragmas applied.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] when the connection cannot be opened or
/// the pragmas cannot be applied.
pub fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the substrate store schema, a no-op on an already-initialized database.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] when schema creation fails.
pub fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    if version.is_none() {
        tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS routes (
                id TEXT PRIMARY KEY,
                resource_kind TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                env TEXT NOT NULL,
                project_id TEXT,
                surface_id TEXT,
                record_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_routes_scope
                ON routes (resource_kind, tenant_id, env, COALESCE(project_id, ''))
                WHERE deleted = 0;
            CREATE INDEX IF NOT EXISTS idx_routes_tenant_env
                ON routes (tenant_id, env);

            CREATE TABLE IF NOT EXISTS stream_counters (
                stream_id TEXT PRIMARY KEY,
                next_seq INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS stream_records (
                stream_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                envelope_json TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                prev_event_id TEXT,
                idempotency_key TEXT,
                PRIMARY KEY (stream_id, event_id)
            );
            CREATE INDEX IF NOT EXISTS idx_stream_records_seq
                ON stream_records (stream_id, seq);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_stream_records_idempotency
                ON stream_records (stream_id, idempotency_key)
                WHERE idempotency_key IS NOT NULL;

            CREATE TABLE IF NOT EXISTS blackboard_entries (
                stream_key TEXT NOT NULL,
                key TEXT NOT NULL,
                version INTEGER NOT NULL,
                value_json TEXT NOT NULL,
                created_by TEXT,
                created_at INTEGER NOT NULL,
                updated_by TEXT,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (stream_key, key)
            );

            CREATE TABLE IF NOT EXISTS memory_entries (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL,
                expires_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS audit_entries (
                tenant_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                envelope_json TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                prev_hash TEXT NOT NULL,
                hash TEXT NOT NULL,
                PRIMARY KEY (tenant_id, seq)
            );
            CREATE INDEX IF NOT EXISTS idx_audit_entries_tenant
                ON audit_entries (tenant_id, seq DESC);",
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
