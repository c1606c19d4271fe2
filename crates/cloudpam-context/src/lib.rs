//! Cross-cutting request context: clock injection, cancellation/deadline propagation, and
//! caller identity.
//!
//! Modeled on `libs/modkit/src/context.rs`'s `ModuleCtx` from the teacher codebase: a small,
//! explicitly-constructed context threaded through every call instead of module-global state
//! (`spec.md` §9, "Context propagation").

mod clock;
mod principal;
mod request;

pub use clock::{Clock, FrozenClock, SystemClock};
pub use principal::{ActorKind, Principal};
pub use request::RequestContext;
