// crates/substrate-store-sqlite/src/event_stream.rs
// ============================================================================
// Module: SQLite Event Stream
// Description: Durable EventStream backed by the shared SQLite store.
// Purpose: Append-only, monotonically ordered event storage with idempotent
//          append semantics.
// Dependencies: rusqlite, substrate-core
// ============================================================================

use rusqlite::OptionalExtension;
use rusqlite::params;
use substrate_core::AdapterError;
use substrate_core::EventEnvelope;
use substrate_core::EventId;
use substrate_core::EventStream;
use substrate_core::StreamRecord;

use crate::store::SqliteSubstrateStore;

impl EventStream for SqliteSubstrateStore {
    fn append(&self, stream_id: &str, mut envelope: EventEnvelope, payload: serde_json::Value) -> Result<EventId, AdapterError> {
        let idempotency_key = envelope.idempotency_key.as_ref().map(|key| key.as_str().to_owned());
        let mut conn = self.write_connection();
        let tx = conn.transaction().map_err(|err| AdapterError::Unavailable(format!("append tx start failed: {err}")))?;
        if let Some(key) = idempotency_key.as_deref() {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT event_id FROM stream_records WHERE stream_id = ?1 AND idempotency_key = ?2",
                    params![stream_id, key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| AdapterError::Unavailable(format!("idempotency lookup failed: {err}")))?;
            if let Some(event_id) = existing {
                tx.commit().map_err(|err| AdapterError::Unavailable(format!("append tx commit failed: {err}")))?;
                return Ok(EventId::new(event_id));
            }
        }
        let next_seq: i64 = tx
            .query_row(
                "INSERT INTO stream_counters (stream_id, next_seq) VALUES (?1, 1)
                 ON CONFLICT(stream_id) DO UPDATE SET next_seq = next_seq + 1
                 RETURNING next_seq",
                params![stream_id],
                |row| row.get(0),
            )
            .map_err(|err| AdapterError::Unavailable(format!("sequence allocation failed: {err}")))?;
        let event_id = EventId::new(format!("{next_seq:020}"));
        envelope.event_id = Some(event_id.clone());
        let prev_event_id: Option<String> = tx
            .query_row(
                "SELECT event_id FROM stream_records WHERE stream_id = ?1 ORDER BY seq DESC LIMIT 1",
                params![stream_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| AdapterError::Unavailable(format!("prev event lookup failed: {err}")))?;
        let envelope_json = serde_json::to_string(&envelope).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let payload_json = serde_json::to_string(&payload).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        tx.execute(
            "INSERT INTO stream_records (stream_id, event_id, seq, envelope_json, payload_json, prev_event_id, idempotency_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![stream_id, event_id.as_str(), next_seq, envelope_json, payload_json, prev_event_id, idempotency_key],
        )
        .map_err(|err| AdapterError::Unavailable(format!("append insert failed: {err}")))?;
        tx.commit().map_err(|err| AdapterError::Unavailable(format!("append tx commit failed: {err}")))?;
        Ok(event_id)
    }

    fn list_after(&self, stream_id: &str, after_event_id: Option<&str>, limit: usize) -> Result<Vec<StreamRecord>, AdapterError> {
        let conn = self.read_connection();
        let after_seq: i64 = match after_event_id {
            None => 0,
            Some(after) => conn
                .query_row(
                    "SELECT seq FROM stream_records WHERE stream_id = ?1 AND event_id = ?2",
                    params![stream_id, after],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| AdapterError::Unavailable(format!("cursor lookup failed: {err}")))?
                .ok_or(AdapterError::CursorInvalid)?,
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn
            .prepare(
                "SELECT envelope_json, payload_json, prev_event_id FROM stream_records
                 WHERE stream_id = ?1 AND seq > ?2 ORDER BY seq ASC LIMIT ?3",
            )
            .map_err(|err| AdapterError::Unavailable(format!("list_after prepare failed: {err}")))?;
        let rows = stmt
            .query_map(params![stream_id, after_seq, limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, Option<String>>(2)?))
            })
            .map_err(|err| AdapterError::Unavailable(format!("list_after query failed: {err}")))?;
        let mut records = Vec::new();
        for row in rows {
            let (envelope_json, payload_json, prev_event_id) = row.map_err(|err| AdapterError::Unavailable(format!("list_after row failed: {err}")))?;
            let envelope: EventEnvelope = serde_json::from_str(&envelope_json).map_err(|err| AdapterError::Invalid(format!("corrupt envelope: {err}")))?;
            let payload: serde_json::Value = serde_json::from_str(&payload_json).map_err(|err| AdapterError::Invalid(format!("corrupt payload: {err}")))?;
            records.push(StreamRecord {
                envelope,
                payload,
                prev_event_id: prev_event_id.map(EventId::new),
            });
        }
        Ok(records)
    }
}
