use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{AuditOutcome, User, UserInput};
use cloudpam_errors::{CoreError, CoreResult};
use serde_json::json;
use tracing::info;

use crate::user_repo::UserRepository;

use super::InMemoryStore;

impl InMemoryStore {
    fn live_user(&self, id: i64) -> CoreResult<User> {
        self.users
            .get(&id)
            .map(|u| u.clone())
            .ok_or_else(|| CoreError::not_found(format!("user {id} not found")))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, ctx: &RequestContext, input: UserInput) -> CoreResult<User> {
        input.validate()?;
        if self.users.iter().any(|u| u.username == input.username) {
            return Err(CoreError::conflict(format!(
                "username {} already in use",
                input.username
            )));
        }
        let id = self.next_user_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let user = User {
            id,
            username: input.username,
            role: input.role,
            password_hash: input.password_hash,
            scopes: input.scopes,
            created_at: self.now(),
            disabled_at: None,
        };
        self.users.insert(id, user.clone());
        info!(user_id = user.id, username = %user.username, "user created");
        self.audit(
            ctx,
            "user.create",
            "user",
            Some(user.id.to_string()),
            AuditOutcome::Success,
            json!({"username": user.username, "role": user.role}),
        )
        .await?;
        Ok(user)
    }

    async fn get(&self, _ctx: &RequestContext, id: i64) -> CoreResult<User> {
        self.live_user(id)
    }

    async fn get_by_username(&self, _ctx: &RequestContext, username: &str) -> CoreResult<User> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone())
            .ok_or_else(|| CoreError::not_found(format!("user {username} not found")))
    }

    async fn set_disabled(
        &self,
        ctx: &RequestContext,
        id: i64,
        disabled: bool,
    ) -> CoreResult<User> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("user {id} not found")))?;
        entry.disabled_at = if disabled { Some(self.now()) } else { None };
        let updated = entry.clone();
        drop(entry);
        info!(user_id = updated.id, disabled, "user disabled state changed");
        self.audit(
            ctx,
            "user.set_disabled",
            "user",
            Some(updated.id.to_string()),
            AuditOutcome::Success,
            json!({"disabled": disabled}),
        )
        .await?;
        Ok(updated)
    }

    async fn list(&self, _ctx: &RequestContext) -> CoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_store;
    use cloudpam_context::RequestContext;
    use cloudpam_domain::{UserInput, UserRole};

    fn input(username: &str) -> UserInput {
        UserInput {
            username: username.to_owned(),
            role: UserRole::Operator,
            password_hash: "hash".to_owned(),
            scopes: vec!["pools:*".to_owned()],
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input("alice")).await.unwrap();
        let err = store.create(&ctx, input("alice")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn disabling_a_user_is_reversible() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let user = store.create(&ctx, input("bob")).await.unwrap();
        let disabled = store.set_disabled(&ctx, user.id, true).await.unwrap();
        assert!(!disabled.is_active());
        let enabled = store.set_disabled(&ctx, user.id, false).await.unwrap();
        assert!(enabled.is_active());
    }

    #[tokio::test]
    async fn get_by_username_finds_row() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let created = store.create(&ctx, input("carol")).await.unwrap();
        let found = store.get_by_username(&ctx, "carol").await.unwrap();
        assert_eq!(found.id, created.id);
    }
}
