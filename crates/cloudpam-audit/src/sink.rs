use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use cloudpam_context::{ActorKind, Clock, RequestContext};
use cloudpam_domain::{AuditEvent, AuditOutcome};
use cloudpam_errors::{CoreError, CoreResult};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::redact::redact;

/// Append-only audit event stream (`spec.md` §3.1 `AuditEvent`, §4.8). Every mutating operation
/// across the engine emits one event; emission failures must surface, never be swallowed
/// (`spec.md` §4.8: "failures to write audit MUST NOT silently drop the event").
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Builds and appends one event. `detail` is redacted before it is stored or returned.
    async fn record(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource_type: &str,
        resource_id: Option<String>,
        outcome: AuditOutcome,
        detail: Value,
    ) -> CoreResult<AuditEvent>;

    async fn list(&self, limit: usize) -> CoreResult<Vec<AuditEvent>>;
}

/// In-memory sink: an append-only `Vec` guarded by a single lock, mirroring the single-document
/// guard `InMemoryStore` uses for settings (`cloudpam-store`'s `settings.rs`) rather than
/// `DashMap`, since every write here is a single sequential append.
pub struct InMemoryAuditSink {
    clock: std::sync::Arc<dyn Clock>,
    next_id: AtomicI64,
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    #[must_use]
    pub fn new(clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: AtomicI64::new(1),
            events: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource_type: &str,
        resource_id: Option<String>,
        outcome: AuditOutcome,
        detail: Value,
    ) -> CoreResult<AuditEvent> {
        let (actor_kind, actor_id) = match ctx.principal() {
            Some(p) => (actor_kind_str(p.kind), Some(p.id)),
            None => (actor_kind_str(ActorKind::System), None),
        };

        let event = AuditEvent {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            request_id: ctx.request_id(),
            actor_kind,
            actor_id,
            action: action.to_owned(),
            resource_type: resource_type.to_owned(),
            resource_id,
            outcome,
            detail: redact(&detail),
            occurred_at: self.clock.now(),
        };

        debug!(action, resource_type, outcome = ?event.outcome, "audit event recorded");
        self.events.write().push(event.clone());
        Ok(event)
    }

    async fn list(&self, limit: usize) -> CoreResult<Vec<AuditEvent>> {
        let events = self.events.read();
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }
}

fn actor_kind_str(kind: ActorKind) -> String {
    match kind {
        ActorKind::User => "user",
        ActorKind::ApiKey => "api_key",
        ActorKind::Agent => "agent",
        ActorKind::System => "system",
    }
    .to_owned()
}

/// Surface-level helper error an embedding handler can use when it must not proceed without
/// successful audit emission; kept distinct from `CoreError::internal` call sites so the intent
/// reads clearly at the call site.
#[must_use]
pub fn audit_write_failed(reason: impl std::fmt::Display) -> CoreError {
    CoreError::internal(format!("audit emission failed: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_context::{Principal, SystemClock};
    use serde_json::json;

    fn sink() -> InMemoryAuditSink {
        InMemoryAuditSink::new(std::sync::Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn records_actor_from_principal() {
        let sink = sink();
        let principal = Principal {
            kind: ActorKind::ApiKey,
            id: 42,
            role: "operator".to_owned(),
            scopes: vec!["pools:write".to_owned()],
            owner_agent_id: None,
        };
        let ctx = RequestContext::new(Some(principal));

        let event = sink
            .record(
                &ctx,
                "pool.create",
                "pool",
                Some("1".to_owned()),
                AuditOutcome::Success,
                json!({"name": "root"}),
            )
            .await
            .unwrap();

        assert_eq!(event.actor_kind, "api_key");
        assert_eq!(event.actor_id, Some(42));
        assert_eq!(event.action, "pool.create");
    }

    #[tokio::test]
    async fn anonymous_context_is_recorded_as_system() {
        let sink = sink();
        let ctx = RequestContext::new(None);
        let event = sink
            .record(&ctx, "pool.list", "pool", None, AuditOutcome::Success, json!({}))
            .await
            .unwrap();
        assert_eq!(event.actor_kind, "system");
        assert_eq!(event.actor_id, None);
    }

    #[tokio::test]
    async fn detail_is_redacted_before_storage() {
        let sink = sink();
        let ctx = RequestContext::new(None);
        sink.record(
            &ctx,
            "agent.register",
            "agent",
            Some("1".to_owned()),
            AuditOutcome::Success,
            json!({"api_key_secret": "cpam_abc"}),
        )
        .await
        .unwrap();

        let events = sink.list(10).await.unwrap();
        assert_eq!(events[0].detail["api_key_secret"], "[redacted]");
    }

    #[tokio::test]
    async fn list_caps_to_the_most_recent_n_events() {
        let sink = sink();
        let ctx = RequestContext::new(None);
        for i in 0..5 {
            sink.record(
                &ctx,
                "pool.update",
                "pool",
                Some(i.to_string()),
                AuditOutcome::Success,
                json!({}),
            )
            .await
            .unwrap();
        }
        let events = sink.list(2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].resource_id, Some("4".to_owned()));
    }
}
