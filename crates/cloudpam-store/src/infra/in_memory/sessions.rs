use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{AuditOutcome, Session, SessionInput};
use cloudpam_errors::{CoreError, CoreResult};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::session_repo::SessionRepository;

use super::InMemoryStore;

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn create(&self, ctx: &RequestContext, input: SessionInput) -> CoreResult<Session> {
        let now = self.now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            scopes: input.scopes,
            issued_at: now,
            expires_at: now + input.ttl,
        };
        self.sessions.insert(session.id, session.clone());
        info!(session_id = %session.id, user_id = session.user_id, "session created");
        self.audit(
            ctx,
            "session.create",
            "session",
            Some(session.id.to_string()),
            AuditOutcome::Success,
            json!({"user_id": session.user_id}),
        )
        .await?;
        Ok(session)
    }

    async fn get(&self, _ctx: &RequestContext, id: Uuid) -> CoreResult<Session> {
        self.sessions
            .get(&id)
            .map(|s| s.clone())
            .ok_or_else(|| CoreError::not_found(format!("session {id} not found")))
    }

    async fn revoke(&self, ctx: &RequestContext, id: Uuid) -> CoreResult<()> {
        self.sessions
            .remove(&id)
            .ok_or_else(|| CoreError::not_found(format!("session {id} not found")))?;
        info!(session_id = %id, "session revoked");
        self.audit(
            ctx,
            "session.revoke",
            "session",
            Some(id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_store;
    use cloudpam_context::RequestContext;
    use cloudpam_domain::SessionInput;

    fn input() -> SessionInput {
        SessionInput {
            user_id: 1,
            scopes: vec!["pools:read".to_owned()],
            ttl: chrono::Duration::hours(8),
        }
    }

    #[tokio::test]
    async fn created_session_is_retrievable() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let created = store.create(&ctx, input()).await.unwrap();
        let found = store.get(&ctx, created.id).await.unwrap();
        assert_eq!(found.user_id, 1);
    }

    #[tokio::test]
    async fn revoked_session_is_no_longer_found() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let created = store.create(&ctx, input()).await.unwrap();
        store.revoke(&ctx, created.id).await.unwrap();
        let err = store.get(&ctx, created.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn revoking_an_unknown_session_is_not_found() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let err = store.revoke(&ctx, uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
