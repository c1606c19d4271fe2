use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::principal::Principal;

/// Deadline, cancellation, request id and caller identity threaded through every call, per
/// `spec.md` §9 ("Context propagation: pass a deadline + cancellation handle + request id +
/// principal through every call. No module-global state for these.").
#[derive(Clone)]
pub struct RequestContext {
    request_id: Uuid,
    principal: Option<Principal>,
    cancellation_token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    #[must_use]
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            principal,
            cancellation_token: CancellationToken::new(),
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// True if the caller cancelled the request or its deadline has already passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cancellation_token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns a child context, its own independently-cancellable token linked to the parent's,
    /// for sub-operations (e.g. one per resource in a discovery batch).
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id,
            principal: self.principal.clone(),
            cancellation_token: self.cancellation_token.child_token(),
            deadline: self.deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_done() {
        let ctx = RequestContext::new(None);
        assert!(!ctx.is_done());
    }

    #[test]
    fn cancelled_context_is_done() {
        let ctx = RequestContext::new(None);
        ctx.cancellation_token().cancel();
        assert!(ctx.is_done());
    }

    #[test]
    fn expired_deadline_is_done() {
        let past = Instant::now() - std::time::Duration::from_secs(1);
        let ctx = RequestContext::new(None).with_deadline(past);
        assert!(ctx.is_done());
    }

    #[test]
    fn child_inherits_cancellation() {
        let parent = RequestContext::new(None);
        let child = parent.child();
        parent.cancellation_token().cancel();
        assert!(child.is_done());
    }
}
