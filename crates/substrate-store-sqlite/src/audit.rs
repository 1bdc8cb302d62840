// crates/substrate-store-sqlite/src/audit.rs
// ============================================================================
// Module: SQLite Audit Sink
// Description: Durable AuditSink backed by the shared SQLite store.
// Purpose: Append-only per-tenant persistence for the hash-chained audit log.
// Dependencies: rusqlite, substrate-core
// ============================================================================

//! ## Overview
//! The hash chain itself is computed by the caller (see the audit chain
//! builder); this sink only persists and replays `AuditEntry` records in
//! strict per-tenant append order and never rewrites an existing row.

use rusqlite::OptionalExtension;
use rusqlite::params;
use substrate_core::AdapterError;
use substrate_core::AuditEntry;
use substrate_core::AuditSink;

use crate::store::SqliteSubstrateStore;

impl AuditSink for SqliteSubstrateStore {
    fn record(&self, entry: &AuditEntry) -> Result<(), AdapterError> {
        let envelope_json = serde_json::to_string(&entry.envelope).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let payload_json = serde_json::to_string(&entry.payload).map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let conn = self.write_connection();
        let next_seq: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM audit_entries WHERE tenant_id = ?1",
                params![entry.envelope.tenant_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|err| AdapterError::Unavailable(format!("audit sequence lookup failed: {err}")))?;
        conn.execute(
            "INSERT INTO audit_entries (tenant_id, seq, envelope_json, payload_json, prev_hash, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.envelope.tenant_id.as_str(),
                next_seq,
                envelope_json,
                payload_json,
                entry.prev_hash.to_hex(),
                entry.hash.to_hex(),
            ],
        )
        .map_err(|err| AdapterError::Unavailable(format!("audit append failed: {err}")))?;
        Ok(())
    }

    fn last_entry(&self, tenant_id: &str) -> Result<Option<AuditEntry>, AdapterError> {
        let conn = self.read_connection();
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT envelope_json, payload_json, prev_hash, hash FROM audit_entries
                 WHERE tenant_id = ?1 ORDER BY seq DESC LIMIT 1",
                params![tenant_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(|err| AdapterError::Unavailable(format!("audit last_entry lookup failed: {err}")))?;
        let Some((envelope_json, payload_json, prev_hash, hash)) = row else {
            return Ok(None);
        };
        let envelope = serde_json::from_str(&envelope_json).map_err(|err| AdapterError::Invalid(format!("corrupt audit envelope: {err}")))?;
        let payload = serde_json::from_str(&payload_json).map_err(|err| AdapterError::Invalid(format!("corrupt audit payload: {err}")))?;
        let prev_hash = substrate_core::HashDigest::from_hex(&prev_hash).ok_or_else(|| AdapterError::Invalid("corrupt audit prev_hash".to_owned()))?;
        let hash = substrate_core::HashDigest::from_hex(&hash).ok_or_else(|| AdapterError::Invalid("corrupt audit hash".to_owned()))?;
        Ok(Some(AuditEntry {
            envelope,
            payload,
            prev_hash,
            hash,
        }))
    }

    fn list_entries(&self, tenant_id: &str) -> Result<Vec<AuditEntry>, AdapterError> {
        let conn = self.read_connection();
        let mut stmt = conn
            .prepare("SELECT envelope_json, payload_json, prev_hash, hash FROM audit_entries WHERE tenant_id = ?1 ORDER BY seq ASC")
            .map_err(|err| AdapterError::Unavailable(format!("audit list_entries prepare failed: {err}")))?;
        let rows = stmt
            .query_map(params![tenant_id], |row| {
                let envelope_json: String = row.get(0)?;
                let payload_json: String = row.get(1)?;
                let prev_hash: String = row.get(2)?;
                let hash: String = row.get(3)?;
                Ok((envelope_json, payload_json, prev_hash, hash))
            })
            .map_err(|err| AdapterError::Unavailable(format!("audit list_entries query failed: {err}")))?;
        let mut entries = Vec::new();
        for row in rows {
            let (envelope_json, payload_json, prev_hash, hash) = row.map_err(|err| AdapterError::Unavailable(format!("audit list_entries row failed: {err}")))?;
            let envelope = serde_json::from_str(&envelope_json).map_err(|err| AdapterError::Invalid(format!("corrupt audit envelope: {err}")))?;
            let payload = serde_json::from_str(&payload_json).map_err(|err| AdapterError::Invalid(format!("corrupt audit payload: {err}")))?;
            let prev_hash = substrate_core::HashDigest::from_hex(&prev_hash).ok_or_else(|| AdapterError::Invalid("corrupt audit prev_hash".to_owned()))?;
            let hash = substrate_core::HashDigest::from_hex(&hash).ok_or_else(|| AdapterError::Invalid("corrupt audit hash".to_owned()))?;
            entries.push(AuditEntry {
                envelope,
                payload,
                prev_hash,
                hash,
            });
        }
        Ok(entries)
    }
}
