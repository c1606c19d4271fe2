use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudpam_context::RequestContext;
use cloudpam_domain::{
    DiscoveredResource, DiscoveredResourceInput, SyncJob, SyncJobPatch, SyncSource,
};
use cloudpam_errors::CoreResult;
use tokio::sync::OwnedMutexGuard;

use crate::types::{Page, ResourceFilter};

/// Outcome of a single `upsert_resource` call (`spec.md` §4.4 step 2).
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub resource: DiscoveredResource,
    pub created: bool,
}

/// Persistence contract for discovery ingest (`spec.md` §4.4).
#[async_trait]
pub trait DiscoveryRepository: Send + Sync {
    /// Acquires the per-account serialization lock required before running an ingest batch
    /// (`spec.md` §4.4 "Concurrency", §5, §9). Held for the duration of the whole batch.
    async fn ingest_lock(&self, account_id: i64) -> OwnedMutexGuard<()>;

    async fn upsert_resource(
        &self,
        ctx: &RequestContext,
        account_id: i64,
        job_id: i64,
        seen_at: DateTime<Utc>,
        input: DiscoveredResourceInput,
    ) -> CoreResult<UpsertOutcome>;

    /// Marks resources still `active` with `last_seen_at < before` as `stale`. Returns the count
    /// affected (`spec.md` §4.4 step 3).
    async fn mark_stale(
        &self,
        ctx: &RequestContext,
        account_id: i64,
        before: DateTime<Utc>,
    ) -> CoreResult<u32>;

    async fn link_resource(
        &self,
        ctx: &RequestContext,
        id: i64,
        pool_id: i64,
    ) -> CoreResult<DiscoveredResource>;

    async fn unlink_resource(&self, ctx: &RequestContext, id: i64) -> CoreResult<DiscoveredResource>;

    async fn list_resources(
        &self,
        ctx: &RequestContext,
        account_id: i64,
        filter: ResourceFilter,
        page: usize,
        page_size: usize,
    ) -> CoreResult<Page<DiscoveredResource>>;

    async fn create_sync_job(
        &self,
        ctx: &RequestContext,
        account_id: i64,
        source: SyncSource,
        agent_id: Option<i64>,
    ) -> CoreResult<SyncJob>;

    async fn update_sync_job(
        &self,
        ctx: &RequestContext,
        id: i64,
        patch: SyncJobPatch,
    ) -> CoreResult<SyncJob>;

    async fn list_sync_jobs(
        &self,
        ctx: &RequestContext,
        account_id: i64,
        limit: usize,
    ) -> CoreResult<Vec<SyncJob>>;
}
