// crates/substrate-store-sqlite/src/blackboard.rs
// ============================================================================
// Module: SQLite Blackboard
// Description: Durable Blackboard backed by the shared SQLite store.
// Purpose: Give the versioned coordination store a real optimistic-concurrency
//          backend.
// Dependencies: rusqlite, substrate-core
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use substrate_core::ActorId;
use substrate_core::AdapterError;
use substrate_core::Blackboard;
use substrate_core::BlackboardEntry;
use substrate_core::Timestamp;

use crate::store::SqliteSubstrateStore;

struct StoredEntry {
    version: i64,
    value_json: String,
    created_by: Option<String>,
    created_at: i64,
    updated_by: Option<String>,
    updated_at: i64,
}

fn read_entry(conn: &rusqlite::Connection, stream_key: &str, key: &str) -> Result<Option<StoredEntry>, AdapterError> {
    conn.query_row(
        "SELECT version, value_json, created_by, created_at, updated_by, updated_at
         FROM blackboard_entries WHERE stream_key = ?1 AND key = ?2",
        params![stream_key, key],
        |row| {
            Ok(StoredEntry {
                version: row.get(0)?,
                value_json: row.get(1)?,
                created_by: row.get(2)?,
                created_at: row.get(3)?,
                updated_by: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )
    .optional()
    .map_err(|err| AdapterError::Unavailable(format!("blackboard read failed: {err}")))
}

fn to_blackboard_entry(stream_key: &str, key: &str, stored: StoredEntry) -> Result<BlackboardEntry, AdapterError> {
    Ok(BlackboardEntry {
        stream_key: stream_key.to_owned(),
        key: key.to_owned(),
        version: u64::try_from(stored.version).unwrap_or(0),
        value: serde_json::from_str(&stored.value_json).map_err(|err| AdapterError::Invalid(format!("corrupt blackboard value: {err}")))?,
        created_by: stored.created_by.map(ActorId::new),
        created_at: Timestamp::from_unix_millis(stored.created_at),
        updated_by: stored.updated_by.map(ActorId::new),
        updated_at: Timestamp::from_unix_millis(stored.updated_at),
    })
}

impl Blackboard for SqliteSubstrateStore {
    fn write(
        &self,
        stream_key: &str,
        key: &str,
        value: serde_json::Value,
        expected_version: Option<u64>,
        actor: Option<&ActorId>,
    ) -> Result<BlackboardEntry, AdapterError> {
        let mut conn = self.write_connection();
        let tx = conn.transaction().map_err(|err| AdapterError::Unavailable(format!("blackboard tx start failed: {err}")))?;
        let current = read_entry(&tx, stream_key, key)?;
        let now = Timestamp::now();
        let value_json = serde_json::to_string(&value).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let actor_str = actor.map(ActorId::as_str);
        let (next_version, created_by, created_at) = match (&current, expected_version) {
            (None, None) => (1i64, actor_str.map(str::to_owned), now.as_unix_millis()),
            (Some(existing), Some(expected)) if existing.version == i64::try_from(expected).unwrap_or(-1) => {
                (existing.version + 1, existing.created_by.clone(), existing.created_at)
            }
            (Some(existing), _) => {
                return Err(AdapterError::VersionConflict {
                    expected_version,
                    current_version: u64::try_from(existing.version).unwrap_or(0),
                });
            }
            (None, Some(expected)) => {
                return Err(AdapterError::VersionConflict {
                    expected_version: Some(expected),
                    current_version: 0,
                });
            }
        };
        tx.execute(
            "INSERT INTO blackboard_entries (stream_key, key, version, value_json, created_by, created_at, updated_by, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(stream_key, key) DO UPDATE SET
                version = excluded.version,
                value_json = excluded.value_json,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at",
            params![stream_key, key, next_version, value_json, created_by, created_at, actor_str, now.as_unix_millis()],
        )
        .map_err(|err| AdapterError::Unavailable(format!("blackboard write failed: {err}")))?;
        tx.commit().map_err(|err| AdapterError::Unavailable(format!("blackboard tx commit failed: {err}")))?;
        Ok(BlackboardEntry {
            stream_key: stream_key.to_owned(),
            key: key.to_owned(),
            version: u64::try_from(next_version).unwrap_or(0),
            value,
            created_by: created_by.map(ActorId::new),
            created_at: Timestamp::from_unix_millis(created_at),
            updated_by: actor.cloned(),
            updated_at: now,
        })
    }

    fn read(&self, stream_key: &str, key: &str, version: Option<u64>) -> Result<Option<BlackboardEntry>, AdapterError> {
        let conn = self.read_connection();
        let Some(stored) = read_entry(&conn, stream_key, key)? else {
            return Ok(None);
        };
        if let Some(expected) = version
            && stored.version != i64::try_from(expected).unwrap_or(-1)
        {
            return Ok(None);
        }
        to_blackboard_entry(stream_key, key, stored).map(Some)
    }

    fn list_keys(&self, stream_key: &str) -> Result<Vec<String>, AdapterError> {
        let conn = self.read_connection();
        let mut stmt = conn
            .prepare("SELECT key FROM blackboard_entries WHERE stream_key = ?1 ORDER BY key")
            .map_err(|err| AdapterError::Unavailable(format!("list_keys prepare failed: {err}")))?;
        let rows = stmt
            .query_map(params![stream_key], |row| row.get::<_, String>(0))
            .map_err(|err| AdapterError::Unavailable(format!("list_keys query failed: {err}")))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.map_err(|err| AdapterError::Unavailable(format!("list_keys row failed: {err}")))?);
        }
        Ok(keys)
    }
}
