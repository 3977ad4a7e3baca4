use crate::metrics::Metrics;
use crate::shared::Settings;
use crate::store::ShardedStore;
use crate::time::Clock;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// A context object holding the thread-safe parts of the cache that the
/// janitor needs to access.
pub(crate) struct JanitorContext<T, E> {
  pub(crate) store: Arc<ShardedStore<T, E>>,
  pub(crate) metrics: Arc<Metrics>,
  pub(crate) settings: Arc<Settings>,
  pub(crate) clock: Arc<dyn Clock>,
}

/// The background thread that periodically sweeps expired entries.
pub(crate) struct Janitor {
  handle: JoinHandle<()>,
  stop_flag: Arc<AtomicBool>,
}

impl Janitor {
  /// Spawns a new janitor thread.
  pub(crate) fn spawn<T, E>(context: JanitorContext<T, E>) -> Self
  where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
  {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_flag.clone();

    let handle = thread::spawn(move || {
      tracing::debug!(
        interval = ?context.settings.sweep_interval(),
        "cache janitor started"
      );
      let mut last_sweep = Instant::now();
      while !stop_clone.load(Ordering::Acquire) {
        // The interval is re-read every iteration so reconfiguration takes
        // effect without restarting the thread. Parking lets `stop` and
        // `nudge` cut the wait short; spurious wakeups just loop.
        let due = last_sweep + context.settings.sweep_interval();
        let now = Instant::now();
        if now < due {
          thread::park_timeout(due - now);
          continue;
        }

        evict_expired(&context.store, &context.metrics, context.clock.now());
        last_sweep = Instant::now();
      }
      tracing::debug!("cache janitor stopped");
    });

    Self { handle, stop_flag }
  }

  /// Wakes the janitor early, e.g. after its interval changed.
  pub(crate) fn nudge(&self) {
    self.handle.thread().unpark();
  }

  /// Signals the janitor thread to stop without waiting for it.
  pub(crate) fn stop(self) {
    self.stop_flag.store(true, Ordering::Release);
    self.handle.thread().unpark();
  }

  /// Signals the janitor thread to stop and waits for it to exit.
  pub(crate) fn stop_and_join(self) {
    self.stop_flag.store(true, Ordering::Release);
    self.handle.thread().unpark();
    if self.handle.join().is_err() {
      tracing::warn!("cache janitor thread panicked");
    }
  }
}

/// Removes every entry whose expiry time is at or before `now`.
///
/// Pending resources are dropped from the cache like any other; their
/// operations keep running and settle into handles nobody may hold anymore.
pub(crate) fn evict_expired<T, E>(store: &ShardedStore<T, E>, metrics: &Metrics, now: Instant) -> usize {
  let mut evicted = 0;

  for shard in store.iter_shards() {
    // Most ticks find nothing to do; avoid taking the write lock for them.
    if !shard.read().values().any(|entry| entry.is_expired(now)) {
      continue;
    }

    let mut guard = shard.write();
    let before = guard.len();
    guard.retain(|_, entry| !entry.is_expired(now));
    evicted += before - guard.len();
  }

  metrics.sweeps.fetch_add(1, Ordering::Relaxed);
  if evicted > 0 {
    metrics
      .evicted_by_ttl
      .fetch_add(evicted as u64, Ordering::Relaxed);
    metrics
      .current_entries
      .fetch_sub(evicted as u64, Ordering::Relaxed);
    tracing::debug!(evicted, "evicted expired resources");
  } else {
    tracing::trace!("sweep found no expired resources");
  }

  evicted
}
