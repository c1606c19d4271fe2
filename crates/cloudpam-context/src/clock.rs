use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// A monotonic-capable source of wall-clock time, injected into every component that stamps
/// timestamps (`spec.md` §9: "use a single monotonic-capable clock abstraction injected into
/// components; tests must be able to freeze time").
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that returns a fixed instant until explicitly advanced.
pub struct FrozenClock {
    at: RwLock<DateTime<Utc>>,
}

impl FrozenClock {
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at: RwLock::new(at) }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut at = self.at.write();
        *at += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.at.write() = at;
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.at.read()
    }
}
