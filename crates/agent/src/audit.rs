use tracing::{info, warn};

use tendero_core::audit::{AuditEvent, AuditOutcome, AuditSink};

/// Forwards audit events to the tracing subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let user_id = event.user_id.as_ref().map(|user| user.as_str()).unwrap_or("-");
        let order_number = event.order_number.map(|number| number.to_string()).unwrap_or_default();
        let metadata = event
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");

        match event.outcome {
            AuditOutcome::Success => info!(
                target: "tendero::audit",
                event_name = %event.event_type,
                correlation_id = %event.correlation_id,
                user_id,
                order_number = %order_number,
                category = ?event.category,
                actor = %event.actor,
                metadata = %metadata,
                "audit"
            ),
            AuditOutcome::Rejected | AuditOutcome::Failed => warn!(
                target: "tendero::audit",
                event_name = %event.event_type,
                correlation_id = %event.correlation_id,
                user_id,
                order_number = %order_number,
                category = ?event.category,
                actor = %event.actor,
                outcome = ?event.outcome,
                metadata = %metadata,
                "audit"
            ),
        }
    }
}
