// crates/substrate-audit/src/chain.rs
// ============================================================================
// Module: Audit Chain
// Description: Appends hash-chained audit entries and verifies chain integrity.
// Purpose: The one place a tenant's tamper-evident audit trail is built and
//          later re-walked to detect the first broken link.
// Dependencies: substrate-core
// ============================================================================

//! ## Overview
//! Writing is append-only: [`AuditChainWriter::append`] looks up the
//! tenant's last entry, computes `hash = SHA256(canonical(payload) ||
//! prev_hash)`, and hands the assembled [`substrate_core::AuditEntry`] to the
//! configured sink. Verification re-walks the stored chain from genesis and
//! reports the first seq at which either the stored `prev_hash` link or the
//! recomputed `hash` disagrees with what the payloads actually hash to; it
//! never trusts a sink's own bookkeeping over the recomputation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use substrate_core::ActorId;
use substrate_core::ActorType;
use substrate_core::AuditEntry;
use substrate_core::AuditSink;
use substrate_core::EventEnvelope;
use substrate_core::EventType;
use substrate_core::HashDigest;
use substrate_core::RequestContext;
use substrate_core::Severity;
use substrate_core::StorageClass;
use substrate_core::SubstrateError;
use substrate_core::Timestamp;
use substrate_core::chain_hash;
use substrate_core::core::model::ENVELOPE_SCHEMA_VERSION;

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Appends hash-chained entries to a tenant's audit trail through a durable
/// [`AuditSink`].
pub struct AuditChainWriter {
    sink: Arc<dyn AuditSink>,
}

impl AuditChainWriter {
    /// Builds a writer over `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
        }
    }

    /// Appends one audit entry derived from `ctx`, chaining it onto the
    /// tenant's last recorded entry.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::StreamWriteFailed`] when the sink lookup or
    /// append fails.
    pub fn append(&self, ctx: &RequestContext, event_type: EventType, severity: Severity, payload: serde_json::Value, pii_flags: Vec<String>) -> Result<AuditEntry, SubstrateError> {
        let prev_hash = self
            .sink
            .last_entry(ctx.tenant_id.as_str())
            .map_err(|err| SubstrateError::StreamWriteFailed(err.to_string()))?
            .map_or(HashDigest::GENESIS, |entry| entry.hash);

        let envelope = EventEnvelope {
            tenant_id: ctx.tenant_id.clone(),
            mode: ctx.mode,
            env: ctx.env,
            project_id: ctx.project_id.clone(),
            app_id: ctx.app_id.clone(),
            surface_id: ctx.surface_id.clone(),
            actor_id: ctx.actor_id.clone().unwrap_or_else(|| ActorId::new("system")),
            actor_type: if ctx.actor_id.is_some() { ActorType::Human } else { ActorType::System },
            thread_id: None,
            canvas_id: None,
            session_id: None,
            event_id: None,
            request_id: ctx.request_id.clone(),
            trace_id: ctx.trace_id.clone(),
            run_id: ctx.run_id.clone(),
            step_id: ctx.step_id.clone(),
            event_type,
            timestamp: Timestamp::now(),
            severity,
            schema_version: ENVELOPE_SCHEMA_VERSION,
            storage_class: StorageClass::Audit,
            pii_flags,
            idempotency_key: None,
        };

        let hash = chain_hash(&payload, prev_hash).map_err(|err| SubstrateError::StreamWriteFailed(err.to_string()))?;
        let entry = AuditEntry {
            envelope,
            payload,
            prev_hash,
            hash,
        };
        self.sink.record(&entry).map_err(|err| SubstrateError::StreamWriteFailed(err.to_string()))?;
        Ok(entry)
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Outcome of re-walking a tenant's audit chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerification {
    /// Every entry's `prev_hash` and `hash` check out.
    Valid {
        /// Number of entries walked.
        entry_count: usize,
    },
    /// A link or hash disagreed with the recomputation at `seq`.
    Broken {
        /// Zero-based position of the first bad entry.
        seq: usize,
        /// What disagreed: `"prev_hash"` or `"hash"`.
        reason: &'static str,
    },
}

/// Re-walks a tenant's stored audit chain to detect tampering.
pub struct AuditChainVerifier {
    sink: Arc<dyn AuditSink>,
}

impl AuditChainVerifier {
    /// Builds a verifier over `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
        }
    }

    /// Verifies the full stored chain for `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SubstrateError::StreamWriteFailed`] when the sink cannot be
    /// read; a detected tamper is reported as `Ok(ChainVerification::Broken)`,
    /// not an error, since the read itself succeeded.
    pub fn verify(&self, tenant_id: &str) -> Result<ChainVerification, SubstrateError> {
        let entries = self.sink.list_entries(tenant_id).map_err(|err| SubstrateError::StreamWriteFailed(err.to_string()))?;
        let mut expected_prev = HashDigest::GENESIS;
        for (seq, entry) in entries.iter().enumerate() {
            if entry.prev_hash != expected_prev {
                return Ok(ChainVerification::Broken {
                    seq,
                    reason: "prev_hash",
                });
            }
            let recomputed = chain_hash(&entry.payload, entry.prev_hash).map_err(|err| SubstrateError::StreamWriteFailed(err.to_string()))?;
            if recomputed != entry.hash {
                return Ok(ChainVerification::Broken {
                    seq,
                    reason: "hash",
                });
            }
            expected_prev = entry.hash;
        }
        Ok(ChainVerification::Valid {
            entry_count: entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use substrate_core::AdapterError;
    use substrate_core::AppId;
    use substrate_core::Env;
    use substrate_core::Mode;
    use substrate_core::ProjectId;
    use substrate_core::RequestId;
    use substrate_core::TenantId;

    use super::*;

    #[derive(Default)]
    struct InMemorySink {
        entries: Mutex<BTreeMap<String, Vec<AuditEntry>>>,
    }

    impl AuditSink for InMemorySink {
        fn record(&self, entry: &AuditEntry) -> Result<(), AdapterError> {
            let mut guard = self.entries.lock().expect("lock");
            guard.entry(entry.envelope.tenant_id.to_string()).or_default().push(entry.clone());
            Ok(())
        }

        fn last_entry(&self, tenant_id: &str) -> Result<Option<AuditEntry>, AdapterError> {
            let guard = self.entries.lock().expect("lock");
            Ok(guard.get(tenant_id).and_then(|v| v.last()).cloned())
        }

        fn list_entries(&self, tenant_id: &str) -> Result<Vec<AuditEntry>, AdapterError> {
            let guard = self.entries.lock().expect("lock");
            Ok(guard.get(tenant_id).cloned().unwrap_or_default())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext {
            tenant_id: TenantId::parse("t_acme").expect("valid"),
            mode: Mode::Saas,
            env: Env::Prod,
            project_id: ProjectId::new("p1"),
            surface_id: None,
            app_id: Some(AppId::new("app1")),
            user_id: None,
            actor_id: None,
            membership_role: None,
            request_id: RequestId::new("r1"),
            trace_id: None,
            run_id: None,
            step_id: None,
        }
    }

    #[test]
    fn appended_entries_form_a_valid_chain() {
        let sink: Arc<dyn AuditSink> = Arc::new(InMemorySink::default());
        let writer = AuditChainWriter::new(Arc::clone(&sink));
        writer.append(&ctx(), EventType::RouteChanged, Severity::Info, serde_json::json!({"n": 1}), Vec::new()).expect("append");
        writer.append(&ctx(), EventType::SafetyDecision, Severity::Warn, serde_json::json!({"n": 2}), Vec::new()).expect("append");

        let verifier = AuditChainVerifier::new(sink);
        let result = verifier.verify("t_acme").expect("verify");
        assert_eq!(result, ChainVerification::Valid {
            entry_count: 2,
        });
    }

    #[test]
    fn tampered_payload_breaks_verification() {
        let concrete = Arc::new(InMemorySink::default());
        let writer = AuditChainWriter::new(Arc::clone(&concrete) as Arc<dyn AuditSink>);
        writer.append(&ctx(), EventType::RouteChanged, Severity::Info, serde_json::json!({"n": 1}), Vec::new()).expect("append");

        concrete.tamper("t_acme");

        let verifier = AuditChainVerifier::new(Arc::clone(&concrete) as Arc<dyn AuditSink>);
        let result = verifier.verify("t_acme").expect("verify");
        assert_eq!(result, ChainVerification::Broken {
            seq: 0,
            reason: "hash",
        });
    }

    impl InMemorySink {
        fn tamper(&self, tenant_id: &str) {
            let mut guard = self.entries.lock().expect("lock");
            if let Some(entries) = guard.get_mut(tenant_id) {
                if let Some(first) = entries.first_mut() {
                    first.payload = serde_json::json!({"n": 999});
                }
            }
        }
    }
}
