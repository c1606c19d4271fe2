use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `spec.md` §3.1 `DiscoveryAgent.approval`, §4.5 agent lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentApproval {
    Pending,
    Approved,
    Rejected,
}

/// A remote process authorized to push discovery data for one or more accounts (`spec.md` §3.1
/// `DiscoveryAgent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryAgent {
    pub id: i64,
    pub name: String,
    pub account_id: i64,
    pub api_key_id: Option<i64>,
    pub version: Option<String>,
    pub hostname: Option<String>,
    pub approval: AgentApproval,
    /// Hash of the agent's current credential, set on bootstrap-token redemption.
    pub credential_hash: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DiscoveryAgent {
    #[must_use]
    pub fn can_ingest(&self) -> bool {
        self.approval == AgentApproval::Approved
    }
}

/// Input to `Store::Agent.upsert_agent` (`spec.md` §4.5 registration/heartbeat).
#[derive(Debug, Clone)]
pub struct AgentUpsertInput {
    pub id: Option<i64>,
    pub name: String,
    pub account_id: i64,
    pub api_key_id: Option<i64>,
    pub version: Option<String>,
    pub hostname: Option<String>,
}

/// A single-use credential that lets an agent register itself (`spec.md` §3.1
/// `BootstrapToken`, §4.5 `issue_bootstrap_token` / `redeem_bootstrap_token`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapToken {
    pub id: i64,
    pub account_id: i64,
    /// SHA-256 digest of the bundle bytes (deterministic, so `/register` can recompute it from
    /// the presented bundle and look up this row by equality); the plaintext bundle is returned
    /// once on issuance and never stored (`spec.md` §4.5).
    pub token_hash: String,
    pub issued_by: i64,
    pub max_uses: u32,
    pub uses: u32,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BootstrapToken {
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at && self.uses < self.max_uses
    }
}

/// Input to `Store::Token.create_bootstrap_token` (`spec.md` §4.5 provisioning).
///
/// `token_hash` is computed by the caller (`cloudpam-agents`, SHA-256 over the encoded bundle);
/// the store never sees or generates the plaintext secret.
#[derive(Debug, Clone)]
pub struct BootstrapTokenInput {
    pub account_id: i64,
    pub issued_by: i64,
    pub max_uses: u32,
    pub ttl: chrono::Duration,
    pub token_hash: String,
}
