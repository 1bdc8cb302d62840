// crates/substrate-audit/src/sink.rs
// ============================================================================
// Module: Gate Chain Audit Bridge
// Description: Adapts an AuditChainWriter into a substrate_gate::GateEventSink.
// Purpose: Land every SAFETY_DECISION gate evaluation in the durable,
//          hash-chained audit trail instead of only a log stream.
// Dependencies: substrate-core, substrate-gate
// ============================================================================

//! ## Overview
//! `GateEventSink::record` has no error return, so a durable-append failure
//! here cannot propagate back to the gate chain; it is reported to stderr as
//! a last resort, mirroring the teacher's own best-effort audit sinks.

use substrate_core::EventType;
use substrate_core::RequestContext;
use substrate_core::Severity;
use substrate_gate::GateAction;
use substrate_gate::GateEventSink;
use substrate_gate::GateOutcome;

use crate::chain::AuditChainWriter;

/// Bridges gate chain evaluations into the durable audit chain.
pub struct AuditChainGateEventSink {
    writer: AuditChainWriter,
}

impl AuditChainGateEventSink {
    /// Builds a bridge over `writer`.
    #[must_use]
    pub fn new(writer: AuditChainWriter) -> Self {
        Self {
            writer,
        }
    }
}

impl GateEventSink for AuditChainGateEventSink {
    fn record(&self, ctx: &RequestContext, action: &GateAction, gate_name: &'static str, outcome: &GateOutcome) {
        let (result, reason) = match outcome {
            GateOutcome::Pass => ("allow", None),
            GateOutcome::Block(err) => ("block", Some(err.to_string())),
        };
        let severity = if result == "block" { Severity::Warn } else { Severity::Info };
        let payload = serde_json::json!({
            "action": action.name,
            "gate": gate_name,
            "result": result,
            "reason": reason,
        });
        if let Err(err) = self.writer.append(ctx, EventType::SafetyDecision, severity, payload, Vec::new()) {
            eprintln!("audit chain append failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::Mutex;

    use substrate_core::AdapterError;
    use substrate_core::AuditEntry;
    use substrate_core::AuditSink;
    use substrate_core::Env;
    use substrate_core::Mode;
    use substrate_core::ProjectId;
    use substrate_core::RequestId;
    use substrate_core::SubstrateError;
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
            app_id: None,
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
    fn block_outcomes_are_recorded_in_the_audit_chain() {
        let sink = Arc::new(InMemorySink::default());
        let writer = AuditChainWriter::new(Arc::clone(&sink) as Arc<dyn AuditSink>);
        let bridge = AuditChainGateEventSink::new(writer);

        let action = GateAction {
            name: "blackboard.write".to_owned(),
            ..GateAction::default()
        };
        bridge.record(&ctx(), &action, "membership", &GateOutcome::Block(SubstrateError::TenantNotMember));

        let stored = sink.entries.lock().expect("lock");
        assert_eq!(stored.get("t_acme").map(Vec::len), Some(1));
    }
}
