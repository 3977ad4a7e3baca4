use crate::fetcher::Fetcher;
use crate::metrics::Metrics;
use crate::store::ShardedStore;
use crate::task::janitor::Janitor;
use crate::time::Clock;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Live-tunable settings read by both the lookup path and the janitor.
#[derive(Debug)]
pub(crate) struct Settings {
  time_to_live_nanos: AtomicU64,
  sweep_interval_nanos: AtomicU64,
}

// Callers validate against `MAX_DURATION` first, so this never narrows.
#[inline]
fn to_nanos(duration: Duration) -> u64 {
  duration.as_nanos() as u64
}

impl Settings {
  pub(crate) fn new(time_to_live: Duration, sweep_interval: Duration) -> Self {
    Self {
      time_to_live_nanos: AtomicU64::new(to_nanos(time_to_live)),
      sweep_interval_nanos: AtomicU64::new(to_nanos(sweep_interval)),
    }
  }

  pub(crate) fn time_to_live(&self) -> Duration {
    Duration::from_nanos(self.time_to_live_nanos.load(Ordering::Relaxed))
  }

  pub(crate) fn sweep_interval(&self) -> Duration {
    Duration::from_nanos(self.sweep_interval_nanos.load(Ordering::Relaxed))
  }

  pub(crate) fn update(&self, time_to_live: Duration, sweep_interval: Duration) {
    self
      .time_to_live_nanos
      .store(to_nanos(time_to_live), Ordering::Relaxed);
    self
      .sweep_interval_nanos
      .store(to_nanos(sweep_interval), Ordering::Relaxed);
  }
}

/// The internal core of the cache.
pub(crate) struct CacheShared<T, E> {
  pub(crate) store: Arc<ShardedStore<T, E>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) settings: Arc<Settings>,
  pub(crate) clock: Arc<dyn Clock>,
  pub(crate) fetcher: Option<Fetcher<T, E>>,
  pub(crate) janitor: Option<Janitor>,
}

impl<T, E> fmt::Debug for CacheShared<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("store", &self.store)
      .field("settings", &self.settings)
      .field("has_fetcher", &self.fetcher.is_some())
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<T, E> CacheShared<T, E> {
  /// Stops the janitor and waits for its thread to exit.
  pub(crate) fn stop_janitor(&mut self) {
    if let Some(janitor) = self.janitor.take() {
      janitor.stop_and_join();
    }
  }
}

impl<T, E> Drop for CacheShared<T, E> {
  fn drop(&mut self) {
    if let Some(janitor) = self.janitor.take() {
      janitor.stop();
    }
  }
}
