use crate::builder::{CacheBuilder, CacheConfig};
use crate::entry::CacheEntry;
use crate::error::{CacheError, ConfigError};
use crate::metrics::MetricsSnapshot;
use crate::resource::Resource;
use crate::shared::CacheShared;
use crate::task::janitor;

use std::fmt;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// A keyed, time-expiring registry of `Resource`s.
///
/// Requests for a key that has a live entry share one resource, so the
/// underlying operation starts at most once per key per expiry window.
/// A background janitor removes expired entries every sweep interval until
/// the cache is shut down or dropped.
pub struct ResourceCache<T, E> {
  pub(crate) shared: CacheShared<T, E>,
}

impl<T, E> fmt::Debug for ResourceCache<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResourceCache")
      .field("shared", &self.shared)
      .finish()
  }
}

impl<T, E> ResourceCache<T, E>
where
  T: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  /// Returns a builder for a new cache.
  pub fn builder() -> CacheBuilder<T, E> {
    CacheBuilder::new()
  }

  /// Builds a cache from a `CacheConfig`, failing on invalid values.
  pub fn with_config(config: CacheConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    CacheBuilder::from_config(config).build()
  }
}

impl<T, E> ResourceCache<T, E> {
  pub fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }

  /// Returns the live resource for `key`, or creates one with `factory`.
  ///
  /// The check and the insert happen under the key's shard write lock, so
  /// concurrent callers for the same key observe a single resource and
  /// `factory` runs once. An entry past its expiry is treated as missing even
  /// if the sweep has not removed it yet.
  ///
  /// `factory` runs while the shard lock is held. It should only start the
  /// operation (e.g. `Resource::spawn`), never wait on it.
  pub fn get_or_create<F>(&self, key: &str, factory: F) -> Resource<T, E>
  where
    F: FnOnce(&str) -> Resource<T, E>,
  {
    let shard = self.shared.store.get_shard(key);

    // Fast path: a live entry only needs the read lock.
    {
      let guard = shard.read();
      if let Some(entry) = guard.get(key) {
        if !entry.is_expired(self.shared.clock.now()) {
          self.shared.metrics.hits.fetch_add(1, Ordering::Relaxed);
          tracing::trace!(key, "resource cache hit");
          return entry.resource();
        }
      }
    }

    let mut guard = shard.write();
    let now = self.shared.clock.now();

    // Another caller may have inserted between the two locks.
    if let Some(entry) = guard.get(key) {
      if !entry.is_expired(now) {
        self.shared.metrics.hits.fetch_add(1, Ordering::Relaxed);
        return entry.resource();
      }
    }

    let resource = factory(key);
    let ttl = self.shared.settings.time_to_live();
    let replaced = guard.insert(key.to_owned(), CacheEntry::new(resource.clone(), now, ttl));

    let metrics = &self.shared.metrics;
    metrics.misses.fetch_add(1, Ordering::Relaxed);
    metrics.resources_created.fetch_add(1, Ordering::Relaxed);
    if replaced.is_some() {
      // An expired entry the sweep had not reached yet.
      metrics.evicted_by_ttl.fetch_add(1, Ordering::Relaxed);
    } else {
      metrics.current_entries.fetch_add(1, Ordering::Relaxed);
    }
    drop(guard);

    tracing::debug!(key, ?ttl, "created resource");
    resource
  }

  /// Returns the live resource for `key`, starting the configured fetcher on
  /// a miss.
  pub fn resource(&self, key: &str) -> Result<Resource<T, E>, CacheError>
  where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
  {
    let fetcher = self.shared.fetcher.as_ref().ok_or(CacheError::NoFetcher)?;
    Ok(self.get_or_create(key, |key| fetcher.start(key)))
  }

  /// Returns the live resource for `key` without creating one.
  ///
  /// Does not count as a hit or a miss.
  pub fn peek(&self, key: &str) -> Option<Resource<T, E>> {
    let guard = self.shared.store.get_shard(key).read();
    let now = self.shared.clock.now();
    guard
      .get(key)
      .filter(|entry| !entry.is_expired(now))
      .map(CacheEntry::resource)
  }

  /// Returns when the live entry for `key` expires.
  pub fn expires_at(&self, key: &str) -> Option<Instant> {
    let guard = self.shared.store.get_shard(key).read();
    let now = self.shared.clock.now();
    guard
      .get(key)
      .filter(|entry| !entry.is_expired(now))
      .map(CacheEntry::expires_at)
  }

  /// Removes the entry for `key`. Returns `true` if one was present.
  ///
  /// The next request for `key` creates a fresh resource.
  pub fn invalidate(&self, key: &str) -> bool {
    let mut guard = self.shared.store.get_shard(key).write();
    if guard.remove(key).is_some() {
      self
        .shared
        .metrics
        .invalidations
        .fetch_add(1, Ordering::Relaxed);
      self
        .shared
        .metrics
        .current_entries
        .fetch_sub(1, Ordering::Relaxed);
      true
    } else {
      false
    }
  }

  /// Removes all entries from the cache.
  pub fn clear(&self) {
    let mut removed = 0;
    for shard in self.shared.store.iter_shards() {
      let mut guard = shard.write();
      removed += guard.len();
      guard.clear();
    }
    self
      .shared
      .metrics
      .current_entries
      .fetch_sub(removed as u64, Ordering::Relaxed);
  }

  /// Removes every entry whose expiry time is at or before `now` and returns
  /// how many were removed.
  ///
  /// The janitor calls this on its own; calling it directly is only needed
  /// to force a sweep at a chosen instant.
  pub fn evict_expired(&self, now: Instant) -> usize {
    janitor::evict_expired(&self.shared.store, &self.shared.metrics, now)
  }

  /// Applies a new configuration to the live cache.
  ///
  /// The time-to-live applies to entries created from now on; existing
  /// entries keep their expiry. The janitor switches to the new sweep
  /// interval right away.
  pub fn configure(&self, config: CacheConfig) -> Result<(), ConfigError> {
    config.validate()?;
    self
      .shared
      .settings
      .update(config.time_to_live(), config.sweep_interval());
    if let Some(janitor) = &self.shared.janitor {
      janitor.nudge();
    }
    tracing::debug!(?config, "reconfigured resource cache");
    Ok(())
  }

  pub fn time_to_live(&self) -> Duration {
    self.shared.settings.time_to_live()
  }

  pub fn sweep_interval(&self) -> Duration {
    self.shared.settings.sweep_interval()
  }

  /// Returns the number of entries currently stored, expired or not.
  pub fn len(&self) -> usize {
    self
      .shared
      .store
      .iter_shards()
      .map(|shard| shard.read().len())
      .sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Stops the eviction sweep, waits for it to exit, and drops all entries.
  ///
  /// Dropping the cache also stops the sweep; `shutdown` additionally waits
  /// for the janitor thread. Pending operations are not cancelled.
  pub fn shutdown(mut self) {
    self.shared.stop_janitor();
    self.clear();
    tracing::info!(
      shards = self.shared.store.num_shards(),
      "resource cache shut down"
    );
  }
}
