use std::sync::Arc;

use cloudpam_context::RequestContext;
use cloudpam_domain::{SyncJobPatch, SyncJobStatus};
use cloudpam_errors::CoreResult;
use cloudpam_store::{DiscoveryRepository, Store};
use tracing::{info, warn};

use crate::batch::{IngestBatch, IngestReport};

/// Runs the discovery ingest reducer over a `Store` (`spec.md` §4.4).
pub struct DiscoveryService {
    store: Arc<dyn Store>,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Funnels one batch through create-SyncJob → per-resource upsert → mark-stale → terminal
    /// update, serialized per account (`spec.md` §4.4, §5, §9).
    pub async fn ingest(&self, ctx: &RequestContext, batch: IngestBatch) -> CoreResult<IngestReport> {
        let _guard = self.store.ingest_lock(batch.account_id).await;

        let job = self
            .store
            .create_sync_job(ctx, batch.account_id, batch.source, batch.agent_id)
            .await?;
        let seen_at = job.started_at;

        let mut created = 0u32;
        let mut updated = 0u32;
        let mut seen = 0u32;

        let result: CoreResult<u32> = async {
            for item in batch.resources {
                let validated = item.validate()?;
                seen += 1;
                let outcome = self
                    .store
                    .upsert_resource(ctx, batch.account_id, job.id, seen_at, validated)
                    .await?;
                if outcome.created {
                    created += 1;
                } else {
                    updated += 1;
                }
            }
            let stale = self.store.mark_stale(ctx, batch.account_id, seen_at).await?;
            Ok(stale)
        }
        .await;

        match result {
            Ok(stale) => {
                self.store
                    .update_sync_job(
                        ctx,
                        job.id,
                        SyncJobPatch {
                            status: Some(SyncJobStatus::Completed),
                            resources_seen: Some(seen),
                            resources_created: Some(created),
                            resources_updated: Some(updated),
                            resources_marked_stale: Some(stale),
                            ..Default::default()
                        },
                    )
                    .await?;
                info!(job_id = job.id, created, updated, stale, "ingest completed");
                Ok(IngestReport {
                    job_id: job.id,
                    resources_seen: seen,
                    resources_created: created,
                    resources_updated: updated,
                    resources_marked_stale: stale,
                    failed: false,
                })
            }
            Err(err) => {
                warn!(job_id = job.id, error = %err, "ingest failed partway");
                self.store
                    .update_sync_job(
                        ctx,
                        job.id,
                        SyncJobPatch {
                            status: Some(SyncJobStatus::Failed),
                            resources_seen: Some(seen),
                            resources_created: Some(created),
                            resources_updated: Some(updated),
                            error: Some(err.to_string()),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(IngestReport {
                    job_id: job.id,
                    resources_seen: seen,
                    resources_created: created,
                    resources_updated: updated,
                    resources_marked_stale: 0,
                    failed: true,
                })
            }
        }
    }

}
