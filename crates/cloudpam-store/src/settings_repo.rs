use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_errors::CoreResult;
use serde_json::Value;

/// The single `security` settings document (`spec.md` §4.2 `Settings`).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_security_settings(&self, ctx: &RequestContext) -> CoreResult<Value>;

    async fn upsert_security_settings(&self, ctx: &RequestContext, doc: Value) -> CoreResult<Value>;
}
