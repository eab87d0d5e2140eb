//! The clock collaborator (§6)
//!
//! The engine treats "the current instant" as an injected dependency
//! rather than a direct call to the system clock, so the scheduler's
//! start/insert/retire decisions can be driven deterministically in tests
//! instead of relying on real sleeps.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use adengine_core::UnixSeconds;

/// A monotonically increasing source of the current instant, in whole
/// seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> UnixSeconds;
}

/// The real wall clock, backed by [`SystemTime`].
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixSeconds {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs() as UnixSeconds
    }
}

/// A manually-advanced clock for deterministic scheduler tests.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock starting at `now`.
    pub fn new(now: UnixSeconds) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Advances the clock by `seconds`, returning the new instant.
    pub fn advance(&self, seconds: i64) -> UnixSeconds {
        self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
    }

    /// Sets the clock to an absolute instant.
    pub fn set(&self, now: UnixSeconds) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixSeconds {
        self.now.load(Ordering::SeqCst)
    }
}
