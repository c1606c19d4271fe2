//! Append-only audit sink (`spec.md` §4.8, C9): every mutating operation across the engine emits
//! one redacted event here.

mod redact;
mod sink;

pub use redact::redact;
pub use sink::{audit_write_failed, AuditSink, InMemoryAuditSink};
