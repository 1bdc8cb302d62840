// crates/substrate-store-sqlite/src/memory.rs
// ============================================================================
// Module: SQLite Memory Store
// Description: Durable MemoryStore backed by the shared SQLite store.
// Purpose: Give sellable deployments a real TTL-capable key/value backend
//          instead of the lab-only in-memory adapter.
// Dependencies: rusqlite, substrate-core
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use substrate_core::AdapterError;
use substrate_core::MemoryStore;
use substrate_core::Timestamp;

use crate::store::SqliteSubstrateStore;

impl MemoryStore for SqliteSubstrateStore {
    fn set(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>) -> Result<(), AdapterError> {
        let value_json = serde_json::to_string(&value).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let expires_at = ttl_seconds.map(|ttl| Timestamp::now().as_unix_millis().saturating_add(i64::try_from(ttl.saturating_mul(1000)).unwrap_or(i64::MAX)));
        let conn = self.write_connection();
        conn.execute(
            "INSERT INTO memory_entries (key, value_json, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET value_json = excluded.value_json, expires_at = excluded.expires_at",
            params![key, value_json, expires_at],
        )
        .map_err(|err| AdapterError::Unavailable(format!("memory set failed: {err}")))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AdapterError> {
        let conn = self.read_connection();
        let row: Option<(String, Option<i64>)> = conn
            .query_row("SELECT value_json, expires_at FROM memory_entries WHERE key = ?1", params![key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()
            .map_err(|err| AdapterError::Unavailable(format!("memory get failed: {err}")))?;
        let Some((value_json, expires_at)) = row else {
            return Ok(None);
        };
        if let Some(expires_at) = expires_at
            && expires_at <= Timestamp::now().as_unix_millis()
        {
            drop(conn);
            self.delete(key)?;
            return Ok(None);
        }
        let value = serde_json::from_str(&value_json).map_err(|err| AdapterError::Invalid(format!("corrupt memory value: {err}")))?;
        Ok(Some(value))
    }

    fn delete(&self, key: &str) -> Result<(), AdapterError> {
        let conn = self.write_connection();
        conn.execute("DELETE FROM memory_entries WHERE key = ?1", params![key])
            .map_err(|err| AdapterError::Unavailable(format!("memory delete failed: {err}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::Duration;

    use super::*;
    use crate::config::SqliteStoreConfig;

    fn open_store(dir: &tempfile::TempDir) -> SqliteSubstrateStore {
        let config = SqliteStoreConfig {
            path: dir.path().join("memory_test.db"),
            busy_timeout_ms: 5_000,
            journal_mode: crate::config::SqliteStoreMode::Wal,
            sync_mode: crate::config::SqliteSyncMode::Normal,
            read_pool_size: 2,
        };
        SqliteSubstrateStore::open(&config).expect("open store")
    }

    #[test]
    fn set_then_get_returns_the_stored_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);
        store.set("greeting", serde_json::json!("hello"), None).expect("set");
        let value = store.get("greeting").expect("get");
        assert_eq!(value, Some(serde_json::json!("hello")));
    }

    #[test]
    fn delete_removes_the_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);
        store.set("throwaway", serde_json::json!(1), None).expect("set");
        store.delete("throwaway").expect("delete");
        assert_eq!(store.get("throwaway").expect("get"), None);
    }

    #[test]
    fn expired_entries_read_back_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);
        store.set("short_lived", serde_json::json!(true), Some(0)).expect("set");
        sleep(Duration::from_millis(5));
        assert_eq!(store.get("short_lived").expect("get"), None);
    }

    #[test]
    fn set_overwrites_an_existing_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);
        store.set("counter", serde_json::json!(1), None).expect("set");
        store.set("counter", serde_json::json!(2), None).expect("set");
        assert_eq!(store.get("counter").expect("get"), Some(serde_json::json!(2)));
    }
}
