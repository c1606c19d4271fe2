use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{User, UserInput};
use cloudpam_errors::CoreResult;

/// Persistence contract for local-auth `User` rows (`spec.md` §3.1, §4.2: "User `username` ...
/// unique among live rows").
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, ctx: &RequestContext, input: UserInput) -> CoreResult<User>;

    async fn get(&self, ctx: &RequestContext, id: i64) -> CoreResult<User>;

    async fn get_by_username(&self, ctx: &RequestContext, username: &str) -> CoreResult<User>;

    async fn set_disabled(&self, ctx: &RequestContext, id: i64, disabled: bool) -> CoreResult<User>;

    async fn list(&self, ctx: &RequestContext) -> CoreResult<Vec<User>>;
}
