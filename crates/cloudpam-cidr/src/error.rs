use std::fmt;

/// Typed validation failure carrying the offending string and the reason it was rejected
/// (`spec.md` §4.1: "Failure mode: any invalid input returns a typed `ValidationError` carrying
/// the offending string and reason. No panics.").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrError {
    pub input: String,
    pub reason: String,
}

impl CidrError {
    pub(crate) fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CidrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid CIDR {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for CidrError {}
