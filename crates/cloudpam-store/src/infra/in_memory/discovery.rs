use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudpam_context::RequestContext;
use cloudpam_domain::{
    AuditOutcome, DiscoveredResource, DiscoveredResourceInput, ResourceStatus, SyncJob,
    SyncJobPatch, SyncJobStatus, SyncSource,
};
use cloudpam_errors::{CoreError, CoreResult};
use serde_json::json;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::discovery_repo::{DiscoveryRepository, UpsertOutcome};
use crate::types::{Page, ResourceFilter};

use super::InMemoryStore;

#[async_trait]
impl DiscoveryRepository for InMemoryStore {
    async fn ingest_lock(&self, account_id: i64) -> OwnedMutexGuard<()> {
        let mutex = self
            .ingest_locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    async fn upsert_resource(
        &self,
        _ctx: &RequestContext,
        account_id: i64,
        job_id: i64,
        seen_at: DateTime<Utc>,
        input: DiscoveredResourceInput,
    ) -> CoreResult<UpsertOutcome> {
        if input.external_id.trim().is_empty() {
            return Err(CoreError::validation("resource_id must not be empty"));
        }

        let key = (account_id, input.external_id.clone());
        if let Some(existing_id) = self.resource_index.get(&key).map(|r| *r) {
            let mut entry = self
                .resources
                .get_mut(&existing_id)
                .ok_or_else(|| CoreError::internal("resource index out of sync"))?;
            entry.name = input.name;
            entry.cidr = input.cidr;
            entry.region = input.region;
            entry.status = ResourceStatus::Active;
            entry.last_seen_job_id = job_id;
            entry.last_seen_at = seen_at;
            debug!(resource_id = existing_id, account_id, "resource refreshed");
            return Ok(UpsertOutcome {
                resource: entry.clone(),
                created: false,
            });
        }

        let id = self.next_resource_id();
        let resource = DiscoveredResource {
            id,
            account_id,
            external_id: input.external_id.clone(),
            resource_type: input.resource_type,
            cidr: input.cidr,
            name: input.name,
            region: input.region,
            linked_pool_id: None,
            status: ResourceStatus::Active,
            last_seen_job_id: job_id,
            first_seen_at: seen_at,
            last_seen_at: seen_at,
        };
        self.resources.insert(id, resource.clone());
        self.resource_index.insert(key, id);
        debug!(resource_id = id, account_id, "resource discovered");
        Ok(UpsertOutcome {
            resource,
            created: true,
        })
    }

    async fn mark_stale(
        &self,
        _ctx: &RequestContext,
        account_id: i64,
        before: DateTime<Utc>,
    ) -> CoreResult<u32> {
        let mut count = 0u32;
        for mut entry in self.resources.iter_mut() {
            if entry.account_id == account_id
                && entry.status == ResourceStatus::Active
                && entry.last_seen_at < before
            {
                entry.status = ResourceStatus::Stale;
                count += 1;
            }
        }
        if count > 0 {
            debug!(account_id, count, "resources marked stale");
        }
        Ok(count)
    }

    async fn link_resource(
        &self,
        ctx: &RequestContext,
        id: i64,
        pool_id: i64,
    ) -> CoreResult<DiscoveredResource> {
        if self.pools.get(&pool_id).filter(|p| p.is_live()).is_none() {
            return Err(CoreError::validation(format!("pool {pool_id} does not exist")));
        }
        let mut entry = self
            .resources
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("resource {id} not found")))?;
        entry.linked_pool_id = Some(pool_id);
        let updated = entry.clone();
        drop(entry);
        info!(resource_id = updated.id, pool_id, "resource linked to pool");
        self.audit(
            ctx,
            "discovered_resource.link",
            "discovered_resource",
            Some(updated.id.to_string()),
            AuditOutcome::Success,
            json!({"pool_id": pool_id}),
        )
        .await?;
        Ok(updated)
    }

    async fn unlink_resource(&self, ctx: &RequestContext, id: i64) -> CoreResult<DiscoveredResource> {
        let mut entry = self
            .resources
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("resource {id} not found")))?;
        entry.linked_pool_id = None;
        let updated = entry.clone();
        drop(entry);
        info!(resource_id = updated.id, "resource unlinked from pool");
        self.audit(
            ctx,
            "discovered_resource.unlink",
            "discovered_resource",
            Some(updated.id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(updated)
    }

    async fn list_resources(
        &self,
        _ctx: &RequestContext,
        account_id: i64,
        filter: ResourceFilter,
        page: usize,
        page_size: usize,
    ) -> CoreResult<Page<DiscoveredResource>> {
        let mut matching: Vec<DiscoveredResource> = self
            .resources
            .iter()
            .filter(|r| r.account_id == account_id)
            .filter(|r| filter.resource_type.is_none_or(|t| r.resource_type == t))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| {
                filter
                    .linked_only
                    .is_none_or(|linked| r.linked_pool_id.is_some() == linked)
            })
            .map(|r| r.clone())
            .collect();
        matching.sort_by_key(|r| r.id);

        let total = matching.len();
        let page_size = page_size.min(crate::types::MAX_PAGE_SIZE).max(1);
        let start = page.saturating_mul(page_size).min(total);
        let end = (start + page_size).min(total);
        Ok(Page {
            items: matching[start..end].to_vec(),
            total,
        })
    }

    async fn create_sync_job(
        &self,
        ctx: &RequestContext,
        account_id: i64,
        source: SyncSource,
        agent_id: Option<i64>,
    ) -> CoreResult<SyncJob> {
        let id = self.next_job_id();
        let job = SyncJob {
            id,
            account_id,
            source,
            agent_id,
            status: SyncJobStatus::Running,
            resources_seen: 0,
            resources_created: 0,
            resources_updated: 0,
            resources_marked_stale: 0,
            error: None,
            started_at: self.now(),
            finished_at: None,
        };
        self.sync_jobs.insert(id, job.clone());
        info!(job_id = job.id, account_id = job.account_id, source = ?job.source, "sync job created");
        self.audit(
            ctx,
            "sync_job.create",
            "sync_job",
            Some(job.id.to_string()),
            AuditOutcome::Success,
            json!({"account_id": job.account_id, "source": job.source, "agent_id": job.agent_id}),
        )
        .await?;
        Ok(job)
    }

    async fn update_sync_job(
        &self,
        ctx: &RequestContext,
        id: i64,
        patch: SyncJobPatch,
    ) -> CoreResult<SyncJob> {
        let mut entry = self
            .sync_jobs
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("sync job {id} not found")))?;
        if let Some(status) = patch.status {
            entry.status = status;
            let terminal = matches!(status, SyncJobStatus::Completed | SyncJobStatus::Failed);
            if terminal && entry.finished_at.is_none() {
                entry.finished_at = Some(self.now());
            }
        }
        if let Some(v) = patch.resources_seen {
            entry.resources_seen = v;
        }
        if let Some(v) = patch.resources_created {
            entry.resources_created = v;
        }
        if let Some(v) = patch.resources_updated {
            entry.resources_updated = v;
        }
        if let Some(v) = patch.resources_marked_stale {
            entry.resources_marked_stale = v;
        }
        if let Some(error) = patch.error {
            entry.error = Some(error);
        }
        if let Some(finished_at) = patch.finished_at {
            entry.finished_at = Some(finished_at);
        }
        let updated = entry.clone();
        drop(entry);
        let outcome = if updated.status == SyncJobStatus::Failed {
            AuditOutcome::Error
        } else {
            AuditOutcome::Success
        };
        info!(job_id = updated.id, status = ?updated.status, "sync job updated");
        self.audit(
            ctx,
            "sync_job.update",
            "sync_job",
            Some(updated.id.to_string()),
            outcome,
            json!({
                "status": updated.status,
                "resources_seen": updated.resources_seen,
                "resources_created": updated.resources_created,
                "resources_updated": updated.resources_updated,
                "resources_marked_stale": updated.resources_marked_stale,
                "error": updated.error,
            }),
        )
        .await?;
        Ok(updated)
    }

    async fn list_sync_jobs(
        &self,
        _ctx: &RequestContext,
        account_id: i64,
        limit: usize,
    ) -> CoreResult<Vec<SyncJob>> {
        let mut jobs: Vec<SyncJob> = self
            .sync_jobs
            .iter()
            .filter(|j| j.account_id == account_id)
            .map(|j| j.clone())
            .collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs.truncate(limit);
        Ok(jobs)
    }
}
