use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{Pool, PoolInput, PoolPatch};
use cloudpam_errors::CoreResult;

use crate::types::{PoolHierarchyNode, PoolStats, PoolWithStats};

/// Persistence contract for `Pool` (`spec.md` §4.2, §4.3).
#[async_trait]
pub trait PoolRepository: Send + Sync {
    async fn create(&self, ctx: &RequestContext, input: PoolInput) -> CoreResult<Pool>;

    /// `cidr` and `parent_id` are immutable post-creation; see [`PoolPatch`].
    async fn update(&self, ctx: &RequestContext, id: i64, patch: PoolPatch) -> CoreResult<Pool>;

    /// Soft-deletes. Fails with `Conflict` if any live child exists.
    async fn delete(&self, ctx: &RequestContext, id: i64) -> CoreResult<()>;

    /// Soft-deletes `id` and every live descendant in one atomic step. Returns the ids affected.
    async fn delete_cascade(&self, ctx: &RequestContext, id: i64) -> CoreResult<Vec<i64>>;

    async fn get(&self, ctx: &RequestContext, id: i64) -> CoreResult<Pool>;

    async fn list(&self, ctx: &RequestContext, account_id: Option<i64>) -> CoreResult<Vec<Pool>>;

    async fn get_with_stats(&self, ctx: &RequestContext, id: i64) -> CoreResult<PoolWithStats>;

    /// Forest of live pools rooted at `root`, or every root-level pool if `root` is `None`.
    /// Siblings are ordered by ascending `id` (`spec.md` §4.3).
    async fn get_hierarchy(
        &self,
        ctx: &RequestContext,
        root: Option<i64>,
    ) -> CoreResult<Vec<PoolHierarchyNode>>;

    async fn get_children(&self, ctx: &RequestContext, parent_id: i64) -> CoreResult<Vec<Pool>>;

    async fn calculate_utilization(&self, ctx: &RequestContext, id: i64) -> CoreResult<PoolStats>;
}
