use serde::{Deserialize, Serialize};

/// The kind of actor behind a request, per `spec.md` §3.1's `AuditEvent.actor_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    User,
    ApiKey,
    Agent,
    System,
}

/// The resolved identity of an incoming request (`spec.md` §4.7: "Both resolve to a Principal =
/// `{ kind, id, role, scopes }`").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub kind: ActorKind,
    pub id: i64,
    pub role: String,
    pub scopes: Vec<String>,
    /// Set when this principal is an agent-scoped API key; ingest authorization checks this
    /// against the batch's `account_id` (`spec.md` §4.5).
    pub owner_agent_id: Option<i64>,
}

impl Principal {
    #[must_use]
    pub fn system() -> Self {
        Self {
            kind: ActorKind::System,
            id: 0,
            role: "admin".to_owned(),
            scopes: vec!["*".to_owned()],
            owner_agent_id: None,
        }
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == "*" || s == scope)
    }
}
