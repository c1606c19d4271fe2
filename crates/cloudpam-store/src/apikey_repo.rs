use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{ApiKey, ApiKeyInput};
use cloudpam_errors::CoreResult;

/// Persistence contract for `ApiKey` rows (`spec.md` §3.1, §4.7 key format & verification).
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn create(&self, ctx: &RequestContext, input: ApiKeyInput) -> CoreResult<ApiKey>;

    /// Lookup by the plaintext prefix stored alongside the hash (`spec.md` §4.7: "fetch candidate
    /// by prefix, then constant-time compare via Argon2id"). May return several rows if prefixes
    /// collide; the caller verifies each candidate's hash.
    async fn find_by_prefix(&self, ctx: &RequestContext, prefix: &str) -> CoreResult<Vec<ApiKey>>;

    async fn touch_last_used(&self, ctx: &RequestContext, id: i64) -> CoreResult<ApiKey>;

    async fn revoke(&self, ctx: &RequestContext, id: i64) -> CoreResult<ApiKey>;

    async fn list(&self, ctx: &RequestContext, owner_user_id: Option<i64>) -> CoreResult<Vec<ApiKey>>;
}
