//! A time interface that can be replaced by a fake time implementation
//! during testing.
//!
//! The zone cache only ever compares wall-clock timestamps: refresh windows
//! are compared against each other and against the creation time of
//! conflicting entries reported by the provider. So, unlike a monotonic
//! clock, the [`Clock`] here hands out [`OffsetDateTime`] values.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use time::OffsetDateTime;

//------------ Clock ---------------------------------------------------------

/// A source of the current time.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> OffsetDateTime;
}

//------------ SystemClock ---------------------------------------------------

/// Implementation of the [Clock] trait using the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

//------------ FakeClock -----------------------------------------------------

/// Implementation of the [Clock] trait to fake the passing of time, for
/// example for testing.
///
/// Clones share the same time.
#[derive(Clone, Debug)]
pub struct FakeClock {
    /// The current fake time.
    now: Arc<Mutex<OffsetDateTime>>,
}

impl FakeClock {
    /// Creates a clock that stands still at the given time.
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Adjust the current time by adding a [Duration].
    pub fn adjust_time(&self, adjust: Duration) {
        let mut now = self.now.lock();
        *now += adjust;
    }
}

impl Default for FakeClock {
    /// Creates a clock starting at the Unix epoch.
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

//------------ Expiry --------------------------------------------------------

/// The point in time after which a cached value is stale.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Expiry {
    At(OffsetDateTime),

    /// The TTL reaches beyond what the clock can represent.
    Never,
}

impl Expiry {
    /// Returns the expiry of a value stamped at `start` with `ttl`.
    pub(crate) fn after(start: OffsetDateTime, ttl: Duration) -> Self {
        time::Duration::try_from(ttl)
            .ok()
            .and_then(|ttl| start.checked_add(ttl))
            .map_or(Expiry::Never, Expiry::At)
    }

    pub(crate) fn is_expired(self, now: OffsetDateTime) -> bool {
        match self {
            Expiry::At(at) => now > at,
            Expiry::Never => false,
        }
    }
}

//============ Tests =========================================================
