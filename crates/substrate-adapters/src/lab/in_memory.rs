// crates/substrate-adapters/src/lab/in_memory.rs
// ============================================================================
// Module: In-Memory Lab Adapters
// Description: Non-durable adapter implementations for lab mode and tests.
// Purpose: Exercise the control plane without a real durable backend.
// Dependencies: substrate-core, std::sync
// ============================================================================

//! ## Overview
//! Every type in this module is a non-durable backend and is therefore
//! rejected by [`crate::backend_class::ensure_backend_allowed`] outside
//! `lab` mode. There is no code path by which a `saas`/`enterprise` request
//! can reach one of these: the factory refuses to construct them.

use std::collections::BTreeMap;
use std::sync::Mutex;

use substrate_core::ActorId;
use substrate_core::AdapterError;
use substrate_core::Blackboard;
use substrate_core::BlackboardEntry;
use substrate_core::EventEnvelope;
use substrate_core::EventId;
use substrate_core::EventStream;
use substrate_core::MemoryStore;
use substrate_core::ObjectListPage;
use substrate_core::ObjectStore;
use substrate_core::StreamRecord;
use substrate_core::Timestamp;

/// Non-durable in-process object store. `lab` mode / tests only.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Creates an empty in-memory object store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, key: &str, bytes: &[u8], _content_type: Option<&str>) -> Result<(), AdapterError> {
        let mut guard = self.objects.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AdapterError> {
        let guard = self.objects.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.get(key).cloned())
    }

    fn exists(&self, key: &str) -> Result<bool, AdapterError> {
        let guard = self.objects.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.contains_key(key))
    }

    fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ObjectListPage, AdapterError> {
        let guard = self.objects.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let keys = guard
            .keys()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| cursor.is_none_or(|after| k.as_str() > after))
            .cloned()
            .collect();
        Ok(ObjectListPage { keys, next_cursor: None })
    }

    fn delete(&self, key: &str) -> Result<(), AdapterError> {
        let mut guard = self.objects.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.remove(key);
        Ok(())
    }
}

/// Non-durable in-process append-only stream. `lab` mode / tests only.
#[derive(Default)]
pub struct InMemoryEventStream {
    streams: Mutex<BTreeMap<String, Vec<StreamRecord>>>,
    idempotency: Mutex<BTreeMap<(String, String), EventId>>,
    counters: Mutex<BTreeMap<String, u64>>,
}

impl InMemoryEventStream {
    /// Creates an empty in-memory event stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStream for InMemoryEventStream {
    fn append(
        &self,
        stream_id: &str,
        mut envelope: EventEnvelope,
        payload: serde_json::Value,
    ) -> Result<EventId, AdapterError> {
        if let Some(key) = envelope.idempotency_key.as_ref() {
            let mut idem = self.idempotency.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let idem_key = (stream_id.to_owned(), key.as_str().to_owned());
            if let Some(existing) = idem.get(&idem_key) {
                return Ok(existing.clone());
            }
            let mut counters = self.counters.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let next = counters.entry(stream_id.to_owned()).or_insert(0);
            *next += 1;
            let event_id = EventId::new(format!("{:020}", *next));
            envelope.event_id = Some(event_id.clone());
            let mut streams = self.streams.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let records = streams.entry(stream_id.to_owned()).or_default();
            let prev_event_id = records.last().and_then(|r| r.envelope.event_id.clone());
            records.push(StreamRecord {
                envelope,
                payload,
                prev_event_id,
            });
            idem.insert(idem_key, event_id.clone());
            return Ok(event_id);
        }
        let mut counters = self.counters.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let next = counters.entry(stream_id.to_owned()).or_insert(0);
        *next += 1;
        let event_id = EventId::new(format!("{:020}", *next));
        envelope.event_id = Some(event_id.clone());
        let mut streams = self.streams.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let records = streams.entry(stream_id.to_owned()).or_default();
        let prev_event_id = records.last().and_then(|r| r.envelope.event_id.clone());
        records.push(StreamRecord {
            envelope,
            payload,
            prev_event_id,
        });
        Ok(event_id)
    }

    fn list_after(
        &self,
        stream_id: &str,
        after_event_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StreamRecord>, AdapterError> {
        let streams = self.streams.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(records) = streams.get(stream_id) else {
            return if after_event_id.is_some() {
                Err(AdapterError::CursorInvalid)
            } else {
                Ok(Vec::new())
            };
        };
        let start = match after_event_id {
            None => 0,
            Some(after) => {
                let pos = records.iter().position(|r| r.envelope.event_id.as_ref().is_some_and(|id| id.as_str() == after));
                match pos {
                    Some(idx) => idx + 1,
                    None => return Err(AdapterError::CursorInvalid),
                }
            }
        };
        Ok(records.iter().skip(start).take(limit).cloned().collect())
    }
}

/// Non-durable in-process versioned coordination store. `lab` mode / tests only.
#[derive(Default)]
pub struct InMemoryBlackboard {
    entries: Mutex<BTreeMap<(String, String), BlackboardEntry>>,
}

impl InMemoryBlackboard {
    /// Creates an empty in-memory blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Blackboard for InMemoryBlackboard {
    fn write(
        &self,
        stream_key: &str,
        key: &str,
        value: serde_json::Value,
        expected_version: Option<u64>,
        actor: Option<&ActorId>,
    ) -> Result<BlackboardEntry, AdapterError> {
        let mut guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let map_key = (stream_key.to_owned(), key.to_owned());
        let now = Timestamp::now();
        match (guard.get(&map_key), expected_version) {
            (None, None) => {
                let entry = BlackboardEntry {
                    stream_key: stream_key.to_owned(),
                    key: key.to_owned(),
                    version: 1,
                    value,
                    created_by: actor.cloned(),
                    created_at: now,
                    updated_by: actor.cloned(),
                    updated_at: now,
                };
                guard.insert(map_key, entry.clone());
                Ok(entry)
            }
            (Some(current), Some(expected)) if current.version == expected => {
                let entry = BlackboardEntry {
                    stream_key: stream_key.to_owned(),
                    key: key.to_owned(),
                    version: current.version + 1,
                    value,
                    created_by: current.created_by.clone(),
                    created_at: current.created_at,
                    updated_by: actor.cloned(),
                    updated_at: now,
                };
                guard.insert(map_key, entry.clone());
                Ok(entry)
            }
            (Some(current), _) => Err(AdapterError::VersionConflict {
                expected_version,
                current_version: current.version,
            }),
            (None, Some(expected)) => Err(AdapterError::VersionConflict {
                expected_version: Some(expected),
                current_version: 0,
            }),
        }
    }

    fn read(&self, stream_key: &str, key: &str, version: Option<u64>) -> Result<Option<BlackboardEntry>, AdapterError> {
        let guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let map_key = (stream_key.to_owned(), key.to_owned());
        match guard.get(&map_key) {
            Some(entry) if version.is_none_or(|v| v == entry.version) => Ok(Some(entry.clone())),
            _ => Ok(None),
        }
    }

    fn list_keys(&self, stream_key: &str) -> Result<Vec<String>, AdapterError> {
        let guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard
            .keys()
            .filter(|(sk, _)| sk == stream_key)
            .map(|(_, k)| k.clone())
            .collect())
    }
}

/// Non-durable in-process key/value memory store. `lab` mode / tests only.
#[derive(Default)]
pub struct InMemoryMemoryStore {
    values: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl InMemoryMemoryStore {
    /// Creates an empty in-memory memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryMemoryStore {
    fn set(&self, key: &str, value: serde_json::Value, _ttl_seconds: Option<u64>) -> Result<(), AdapterError> {
        let mut guard = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(key.to_owned(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AdapterError> {
        let guard = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), AdapterError> {
        let mut guard = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substrate_core::ActorType;
    use substrate_core::EventType;
    use substrate_core::Mode;
    use substrate_core::ProjectId;
    use substrate_core::RequestId;
    use substrate_core::Env as SubstrateEnv;
    use substrate_core::Severity;
    use substrate_core::StorageClass;
    use substrate_core::TenantId;

    fn sample_envelope() -> EventEnvelope {
        EventEnvelope {
            tenant_id: TenantId::parse("t_acme").expect("valid"),
            mode: Mode::Lab,
            env: SubstrateEnv::Dev,
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
    fn event_stream_assigns_monotonic_ids() {
        let stream = InMemoryEventStream::new();
        let first = stream.append("s1", sample_envelope(), serde_json::json!({})).expect("append");
        let second = stream.append("s1", sample_envelope(), serde_json::json!({})).expect("append");
        assert!(first.as_str() < second.as_str());
        let all = stream.list_after("s1", None, 10).expect("list");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn event_stream_dedups_on_idempotency_key() {
        let stream = InMemoryEventStream::new();
        let mut envelope = sample_envelope();
        envelope.idempotency_key = Some(substrate_core::IdempotencyKey::new("dup"));
        let first = stream.append("s1", envelope.clone(), serde_json::json!({})).expect("append");
        let second = stream.append("s1", envelope, serde_json::json!({})).expect("append");
        assert_eq!(first, second);
        assert_eq!(stream.list_after("s1", None, 10).expect("list").len(), 1);
    }

    #[test]
    fn blackboard_optimistic_concurrency() {
        let board = InMemoryBlackboard::new();
        let v1 = board.write("sk", "k", serde_json::json!("v1"), None, None).expect("create");
        assert_eq!(v1.version, 1);
        let v2 = board.write("sk", "k", serde_json::json!("v2"), Some(1), None).expect("update");
        assert_eq!(v2.version, 2);
        let conflict = board.write("sk", "k", serde_json::json!("v3"), Some(1), None);
        assert!(matches!(conflict, Err(AdapterError::VersionConflict { current_version: 2, .. })));
    }
}
