use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::AuditOutcome;
use cloudpam_errors::CoreResult;
use serde_json::Value;
use tracing::info;

use crate::settings_repo::SettingsRepository;

use super::InMemoryStore;

#[async_trait]
impl SettingsRepository for InMemoryStore {
    async fn get_security_settings(&self, _ctx: &RequestContext) -> CoreResult<Value> {
        Ok(self.settings.read().clone())
    }

    async fn upsert_security_settings(&self, ctx: &RequestContext, doc: Value) -> CoreResult<Value> {
        *self.settings.write() = doc.clone();
        info!("security settings replaced");
        self.audit(
            ctx,
            "settings.upsert",
            "settings",
            None,
            AuditOutcome::Success,
            doc.clone(),
        )
        .await?;
        Ok(doc)
    }
}
