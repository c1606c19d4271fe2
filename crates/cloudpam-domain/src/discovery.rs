use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `spec.md` §3.1 `DiscoveredResource.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Vpc,
    Subnet,
    ElasticIp,
    Nic,
}

/// `spec.md` §3.1 `DiscoveredResource.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Active,
    Stale,
    Deleted,
}

/// A cloud-native network object observed by discovery ingest (`spec.md` §3.1
/// `DiscoveredResource`, §4.4 ingest reducer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredResource {
    pub id: i64,
    pub account_id: i64,
    /// Provider-native identifier, e.g. `vpc-0123abcd`. Unique within an account.
    pub external_id: String,
    pub resource_type: ResourceType,
    pub cidr: Option<cloudpam_cidr::Ipv4Prefix>,
    pub name: Option<String>,
    pub region: Option<String>,
    /// Pool this resource has been linked into, if any (`spec.md` §4.4 `link_resource`).
    pub linked_pool_id: Option<i64>,
    pub status: ResourceStatus,
    /// Job that last touched this resource; used to detect staleness on the next sync.
    pub last_seen_job_id: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// `spec.md` §3.1 `SyncJob.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// `spec.md` §3.1 `SyncJob.source`: whether the sync was driven locally or reported by a
/// remote discovery agent (`spec.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Local,
    Agent,
}

/// One run of discovery ingest for an account (`spec.md` §3.1 `SyncJob`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: i64,
    pub account_id: i64,
    pub source: SyncSource,
    pub agent_id: Option<i64>,
    pub status: SyncJobStatus,
    pub resources_seen: u32,
    pub resources_created: u32,
    pub resources_updated: u32,
    pub resources_marked_stale: u32,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SyncJobStatus::Completed | SyncJobStatus::Failed)
    }
}

/// One item of an ingest batch, as handed to `Store::Discovery.upsert_resource` (`spec.md`
/// §4.4 step 2).
#[derive(Debug, Clone)]
pub struct DiscoveredResourceInput {
    pub external_id: String,
    pub resource_type: ResourceType,
    pub cidr: Option<cloudpam_cidr::Ipv4Prefix>,
    pub name: Option<String>,
    pub region: Option<String>,
}

/// Terminal/partial update to a `SyncJob` (`spec.md` §4.4 step 4).
#[derive(Debug, Clone, Default)]
pub struct SyncJobPatch {
    pub status: Option<SyncJobStatus>,
    pub resources_seen: Option<u32>,
    pub resources_created: Option<u32>,
    pub resources_updated: Option<u32>,
    pub resources_marked_stale: Option<u32>,
    pub error: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}
