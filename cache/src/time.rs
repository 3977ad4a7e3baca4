use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// The source of "now" for expiry calculations.
///
/// The cache stamps entries and runs its sweep against this clock, so tests
/// can drive expiry deterministically with a [`ManualClock`].
pub trait Clock: Send + Sync + 'static {
  fn now(&self) -> Instant;
}

/// The wall clock, backed by `Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  #[inline]
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// A clock that only moves when told to.
pub struct ManualClock {
  origin: Instant,
  elapsed: Mutex<Duration>,
}

impl ManualClock {
  /// Creates a clock frozen at the current instant.
  pub fn new() -> Self {
    Self {
      origin: Instant::now(),
      elapsed: Mutex::new(Duration::ZERO),
    }
  }

  /// Moves the clock forward by `by`.
  pub fn advance(&self, by: Duration) {
    *self.elapsed.lock() += by;
  }

  /// Time elapsed since the clock was created.
  pub fn elapsed(&self) -> Duration {
    *self.elapsed.lock()
  }
}

impl Default for ManualClock {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for ManualClock {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ManualClock")
      .field("elapsed", &self.elapsed())
      .finish()
  }
}

impl Clock for ManualClock {
  fn now(&self) -> Instant {
    self.origin + self.elapsed()
  }
}
