use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{Account, AccountInput, AccountPatch};
use cloudpam_errors::CoreResult;

/// Persistence contract for `Account` (`spec.md` §4.2).
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create(&self, ctx: &RequestContext, input: AccountInput) -> CoreResult<Account>;

    async fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        patch: AccountPatch,
    ) -> CoreResult<Account>;

    /// Fails with `Conflict` if any live pool references this account.
    async fn delete(&self, ctx: &RequestContext, id: i64) -> CoreResult<()>;

    /// Cascade-deletes every pool owned by this account (and their subtrees), then the account.
    async fn delete_cascade(&self, ctx: &RequestContext, id: i64) -> CoreResult<Vec<i64>>;

    async fn get(&self, ctx: &RequestContext, id: i64) -> CoreResult<Account>;

    async fn get_by_key(&self, ctx: &RequestContext, key: &str) -> CoreResult<Account>;

    async fn list(&self, ctx: &RequestContext) -> CoreResult<Vec<Account>>;
}
