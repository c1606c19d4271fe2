use std::sync::Arc;

use chrono::{DateTime, Utc};
use cloudpam_context::{ActorKind, Clock, Principal, RequestContext};
use cloudpam_domain::{ApiKey, ApiKeyInput, Session, SessionInput, User, UserRole};
use cloudpam_errors::{CoreError, CoreResult};
use cloudpam_store::{ApiKeyRepository, SessionRepository, Store, UserRepository};
use tracing::{info, warn};

use crate::cache::ActiveUserCache;
use crate::credential::{generate_api_key_secret, hash_secret, key_lookup_prefix, verify_secret};
use crate::rate_limit::LoginRateLimiter;
use crate::scope::check_elevation;

/// Session TTL (`spec.md` §4.7 "Session cookie"; no literal default given, so this matches
/// common interactive-login practice rather than the short-lived API-key/bootstrap windows
/// elsewhere in the engine).
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 8;

/// A freshly minted API key. The plaintext secret is returned exactly once, mirroring the
/// bootstrap-bundle pattern in `cloudpam-agents`: the store only ever persists the Argon2id hash.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub record: ApiKey,
    pub secret: String,
}

/// Request to mint a new API key (`spec.md` §4.7, §8 property 9 scope-elevation prevention).
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub owner_user_id: i64,
    pub name: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

fn role_str(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "admin",
        UserRole::Operator => "operator",
        UserRole::Viewer => "viewer",
        UserRole::Auditor => "auditor",
    }
}

fn parse_role(role: &str) -> CoreResult<UserRole> {
    match role {
        "admin" => Ok(UserRole::Admin),
        "operator" => Ok(UserRole::Operator),
        "viewer" => Ok(UserRole::Viewer),
        "auditor" => Ok(UserRole::Auditor),
        other => Err(CoreError::internal(format!("unknown role {other}"))),
    }
}

/// Resolves session cookies and bearer API keys to a `Principal`, issues sessions and API keys,
/// and enforces scope-elevation prevention on key creation (`spec.md` §4.7, C8).
pub struct AuthService {
    store: Arc<dyn Store>,
    cache: ActiveUserCache,
    rate_limiter: Arc<dyn LoginRateLimiter>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        rate_limiter: Arc<dyn LoginRateLimiter>,
    ) -> Self {
        Self {
            store,
            cache: ActiveUserCache::with_default_ttl(clock),
            rate_limiter,
        }
    }

    /// Verifies a username/password pair and issues a session, subject to the per-IP login rate
    /// limit (`spec.md` §4.7, §5).
    pub async fn login(
        &self,
        ctx: &RequestContext,
        client_ip: &str,
        username: &str,
        password: &str,
    ) -> CoreResult<Session> {
        self.rate_limiter.check(client_ip)?;

        let user = self
            .store
            .get_by_username(ctx, username)
            .await
            .map_err(|_| CoreError::unauthorized("invalid username or password"))?;
        if !user.is_active() {
            return Err(CoreError::unauthorized("account is disabled"));
        }
        if !verify_secret(password, &user.password_hash)? {
            return Err(CoreError::unauthorized("invalid username or password"));
        }

        self.cache.put(user.id, true);
        let session = SessionRepository::create(
            self.store.as_ref(),
            ctx,
            SessionInput {
                user_id: user.id,
                scopes: user.scopes.clone(),
                ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            },
        )
        .await?;
        info!(user_id = user.id, "session created");
        Ok(session)
    }

    /// Resolves a session cookie's id to the caller's `Principal`.
    pub async fn resolve_session(
        &self,
        ctx: &RequestContext,
        session_id: uuid::Uuid,
    ) -> CoreResult<Principal> {
        let session = SessionRepository::get(self.store.as_ref(), ctx, session_id).await?;
        if !session.is_valid(self.store.now()) {
            return Err(CoreError::unauthorized("session has expired"));
        }
        if !self.is_user_active(ctx, session.user_id).await? {
            return Err(CoreError::unauthorized("user account is disabled"));
        }
        let user = UserRepository::get(self.store.as_ref(), ctx, session.user_id).await?;
        Ok(Principal {
            kind: ActorKind::User,
            id: user.id,
            role: role_str(user.role).to_owned(),
            scopes: session.scopes,
            owner_agent_id: None,
        })
    }

    /// Resolves a presented `cpam_...` bearer secret to the caller's `Principal`
    /// (`spec.md` §4.7: "fetch candidate by prefix, then constant-time compare via Argon2id").
    pub async fn resolve_api_key(
        &self,
        ctx: &RequestContext,
        presented_secret: &str,
    ) -> CoreResult<Principal> {
        let prefix = key_lookup_prefix(presented_secret);
        let candidates = self.store.find_by_prefix(ctx, prefix).await?;
        let now = self.store.now();
        for candidate in candidates {
            if candidate.is_active(now) && verify_secret(presented_secret, &candidate.key_hash)? {
                self.store.touch_last_used(ctx, candidate.id).await?;
                let principal = if let Some(owner_agent_id) = candidate.owner_agent_id {
                    Principal {
                        kind: ActorKind::Agent,
                        id: candidate.id,
                        role: "agent".to_owned(),
                        scopes: candidate.scopes,
                        owner_agent_id: Some(owner_agent_id),
                    }
                } else {
                    let owner_user_id = candidate.owner_user_id.ok_or_else(|| {
                        CoreError::internal("api key has neither owner_user_id nor owner_agent_id")
                    })?;
                    let owner =
                        UserRepository::get(self.store.as_ref(), ctx, owner_user_id).await?;
                    Principal {
                        kind: ActorKind::ApiKey,
                        id: candidate.id,
                        role: role_str(owner.role).to_owned(),
                        scopes: candidate.scopes,
                        owner_agent_id: None,
                    }
                };
                return Ok(principal);
            }
        }
        warn!("bearer key rejected: no matching active candidate");
        Err(CoreError::unauthorized("invalid or revoked API key"))
    }

    /// Mints a new API key on `caller`'s behalf, enforcing scope-elevation prevention
    /// (`spec.md` §8 property 9).
    pub async fn create_api_key(
        &self,
        ctx: &RequestContext,
        caller: &Principal,
        request: NewApiKey,
    ) -> CoreResult<IssuedApiKey> {
        let caller_role = parse_role(&caller.role)?;
        check_elevation(caller_role, &request.scopes)?;

        let secret = generate_api_key_secret();
        let prefix = key_lookup_prefix(&secret).to_owned();
        let key_hash = hash_secret(&secret)?;

        let record = ApiKeyRepository::create(
            self.store.as_ref(),
            ctx,
            ApiKeyInput {
                owner_user_id: Some(request.owner_user_id),
                owner_agent_id: None,
                name: request.name,
                prefix,
                key_hash,
                scopes: request.scopes,
                expires_at: request.expires_at,
            },
        )
        .await?;
        info!(api_key_id = record.id, owner_user_id = request.owner_user_id, "api key issued");
        Ok(IssuedApiKey { record, secret })
    }

    /// Revokes an API key. Idempotent on an already-revoked key.
    pub async fn revoke_api_key(&self, ctx: &RequestContext, id: i64) -> CoreResult<ApiKey> {
        ApiKeyRepository::revoke(self.store.as_ref(), ctx, id).await
    }

    async fn is_user_active(&self, ctx: &RequestContext, user_id: i64) -> CoreResult<bool> {
        if let Some(active) = self.cache.get(user_id) {
            return Ok(active);
        }
        let user = UserRepository::get(self.store.as_ref(), ctx, user_id).await?;
        let active = user.is_active();
        self.cache.put(user_id, active);
        Ok(active)
    }
}
