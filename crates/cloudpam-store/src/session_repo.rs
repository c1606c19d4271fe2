use async_trait::async_trait;
use cloudpam_domain::{Session, SessionInput};
use cloudpam_errors::CoreResult;

/// Persistence contract for browser `Session` rows (`spec.md` §3.1, §4.7 "Session cookie").
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(
        &self,
        ctx: &cloudpam_context::RequestContext,
        input: SessionInput,
    ) -> CoreResult<Session>;

    async fn get(&self, ctx: &cloudpam_context::RequestContext, id: uuid::Uuid) -> CoreResult<Session>;

    async fn revoke(&self, ctx: &cloudpam_context::RequestContext, id: uuid::Uuid) -> CoreResult<()>;
}
