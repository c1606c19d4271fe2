//! Shared error taxonomy for the CloudPAM core engine.
//!
//! Every fallible operation across the engine's crates returns
//! [`CoreResult<T>`]. `CoreError` carries a [`ErrorKind`] used by an
//! embedding transport layer to pick an HTTP status code (see `spec.md`
//! §7); this crate itself never depends on any transport type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error category, per `spec.md` §7's transport-mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or semantically invalid input (400).
    Validation,
    /// Caller identity could not be established (401).
    Unauthorized,
    /// Caller identity is known but lacks the required permission (403).
    Forbidden,
    /// Referenced entity does not exist or is soft-deleted (404).
    NotFound,
    /// Uniqueness, referential, or child-exists violation (409).
    Conflict,
    /// An OIDC issuer is already bound to a different user (409, distinguished from `Conflict`
    /// only so callers can produce a more specific message).
    DuplicateIssuer,
    /// Caller exceeded a rate limit (429).
    RateLimited,
    /// Unexpected failure; message shown to clients should be generic (500).
    Internal,
}

impl ErrorKind {
    /// The conventional HTTP status this kind maps to, for a transport layer's reference.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict | Self::DuplicateIssuer => 409,
            Self::RateLimited => 429,
            Self::Internal => 500,
        }
    }
}

/// A typed error carrying a [`ErrorKind`] plus a human-readable message and, for validation
/// failures, the offending input string.
///
/// Intermediate layers that add context should use [`CoreError::context`], which keeps `kind`
/// unchanged and prefixes `message` — the deepest producer's `kind` always wins.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
    /// The literal input that failed validation, if applicable (e.g. a malformed CIDR string).
    pub offending_input: Option<String>,
}

impl CoreError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offending_input: None,
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// A validation error that also records the offending input (per `spec.md` §4.1: "any
    /// invalid input returns a typed `ValidationError` carrying the offending string and
    /// reason").
    #[must_use]
    pub fn validation_with_input(input: impl Into<String>, reason: impl Into<String>) -> Self {
        let input = input.into();
        let reason = reason.into();
        Self {
            kind: ErrorKind::Validation,
            message: format!("{input}: {reason}"),
            offending_input: Some(input),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    #[must_use]
    pub fn duplicate_issuer(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateIssuer, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Wraps this error with additional context without changing its `kind`, per the
    /// propagation rule in `spec.md` §7 ("intermediate layers add context but do not change
    /// kind").
    #[must_use]
    pub fn context(self, context: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{context}: {}", self.message),
            offending_input: self.offending_input,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::Conflict | ErrorKind::DuplicateIssuer)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_expected_status() {
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::Conflict.http_status(), 409);
        assert_eq!(ErrorKind::DuplicateIssuer.http_status(), 409);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn context_preserves_kind() {
        let err = CoreError::not_found("pool 42").context("Pool.delete");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Pool.delete: pool 42");
    }

    #[test]
    fn validation_with_input_records_offender() {
        let err = CoreError::validation_with_input("10.0.0.1/24", "address not network-aligned");
        assert_eq!(err.offending_input.as_deref(), Some("10.0.0.1/24"));
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
