use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An append-only audit record (`spec.md` §3.1 `AuditEvent`, §4.8 audit sink).
///
/// `detail` should already have gone through redaction by the time it reaches a sink; see
/// `cloudpam-audit::redact`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: i64,
    pub request_id: uuid::Uuid,
    pub actor_kind: String,
    pub actor_id: Option<i64>,
    /// `resource:action`, matching the scope syntax used for authorization (`spec.md` §4.7).
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub outcome: AuditOutcome,
    pub detail: Value,
    pub occurred_at: DateTime<Utc>,
}

/// `spec.md` §3.1 `AuditEvent.outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Denied,
    Error,
}
