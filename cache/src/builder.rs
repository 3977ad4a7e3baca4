use crate::error::{ConfigError, Result};
use crate::fetcher::{BoxFetchFuture, FetchFn, Fetcher};
use crate::handles::ResourceCache;
use crate::metrics::Metrics;
use crate::shared::{CacheShared, Settings};
use crate::store::ShardedStore;
use crate::task::janitor::{Janitor, JanitorContext};
use crate::time::{Clock, SystemClock};
use crate::TaskSpawner;

use core::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How long an entry stays live when nothing else is configured.
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_millis(5_000);

/// How often the janitor sweeps when nothing else is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(1_000);

/// The longest time-to-live or sweep interval a cache accepts.
pub const MAX_DURATION: Duration = Duration::from_nanos(u64::MAX);

fn check_durations(time_to_live: Duration, sweep_interval: Duration) -> Result<()> {
  if time_to_live.is_zero() {
    return Err(ConfigError::ZeroTimeToLive);
  }
  if time_to_live > MAX_DURATION {
    return Err(ConfigError::TimeToLiveTooLarge(time_to_live));
  }
  if sweep_interval.is_zero() {
    return Err(ConfigError::ZeroSweepInterval);
  }
  if sweep_interval > MAX_DURATION {
    return Err(ConfigError::SweepIntervalTooLarge(sweep_interval));
  }
  Ok(())
}

/// The two tunables of a cache, in milliseconds.
///
/// With the `serde` feature this deserializes from any serde format; missing
/// fields take their defaults. Deserializing does not validate; call
/// [`CacheConfig::validate`] or let [`CacheBuilder::build`] do it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
  /// How long an entry remains valid after it is created.
  pub ttl_ms: u64,
  /// How often the background sweep evicts expired entries.
  pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_ms: DEFAULT_TIME_TO_LIVE.as_millis() as u64,
      sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
    }
  }
}

impl CacheConfig {
  /// Creates a validated configuration. Both values must be positive and
  /// no larger than [`MAX_DURATION`].
  pub fn new(ttl_ms: u64, sweep_interval_ms: u64) -> Result<Self> {
    let config = Self {
      ttl_ms,
      sweep_interval_ms,
    };
    config.validate()?;
    Ok(config)
  }

  /// Checks both values are positive and no larger than [`MAX_DURATION`].
  pub fn validate(&self) -> Result<()> {
    check_durations(self.time_to_live(), self.sweep_interval())
  }

  pub fn time_to_live(&self) -> Duration {
    Duration::from_millis(self.ttl_ms)
  }

  pub fn sweep_interval(&self) -> Duration {
    Duration::from_millis(self.sweep_interval_ms)
  }
}

/// A builder for creating `ResourceCache` instances.
pub struct CacheBuilder<T, E> {
  time_to_live: Duration,
  sweep_interval: Duration,
  shards: usize,
  clock: Option<Arc<dyn Clock>>,
  fetcher: Option<FetchFn<T, E>>,
  spawner: Option<Arc<dyn TaskSpawner>>,
}

impl<T, E> fmt::Debug for CacheBuilder<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("time_to_live", &self.time_to_live)
      .field("sweep_interval", &self.sweep_interval)
      .field("shards", &self.shards)
      .field("has_fetcher", &self.fetcher.is_some())
      .field("has_spawner", &self.spawner.is_some())
      .finish_non_exhaustive()
  }
}

impl<T, E> Default for CacheBuilder<T, E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T, E> CacheBuilder<T, E> {
  /// Creates a new `CacheBuilder` with default settings.
  pub fn new() -> Self {
    Self {
      time_to_live: DEFAULT_TIME_TO_LIVE,
      sweep_interval: DEFAULT_SWEEP_INTERVAL,
      shards: (num_cpus::get() * 4).max(1).next_power_of_two(),
      clock: None,
      fetcher: None,
      spawner: None,
    }
  }

  /// Creates a builder from a `CacheConfig`.
  pub fn from_config(config: CacheConfig) -> Self {
    Self::new()
      .time_to_live(config.time_to_live())
      .sweep_interval(config.sweep_interval())
  }

  /// Sets how long an entry remains valid after it is created.
  pub fn time_to_live(mut self, duration: Duration) -> Self {
    self.time_to_live = duration;
    self
  }

  /// Sets the cadence of the background eviction sweep.
  pub fn sweep_interval(mut self, duration: Duration) -> Self {
    self.sweep_interval = duration;
    self
  }

  /// Sets the number of concurrent shards to use.
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = shards;
    self
  }

  /// Sets the clock used to stamp and expire entries.
  ///
  /// Defaults to [`SystemClock`].
  pub fn clock<C>(mut self, clock: Arc<C>) -> Self
  where
    C: Clock,
  {
    self.clock = Some(clock);
    self
  }

  /// Sets the spawner that async fetches run on.
  ///
  /// Without one, async fetchers use the Tokio runtime the cache is built in.
  pub fn spawner(mut self, spawner: Arc<dyn TaskSpawner>) -> Self {
    self.spawner = Some(spawner);
    self
  }

  /// Sets the asynchronous fetch function used by `ResourceCache::resource`.
  ///
  /// The closure is called with the key on a cache miss and its future is
  /// spawned immediately.
  pub fn fetcher<F, Fut>(mut self, f: F) -> Self
  where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
  {
    let fetch_fn = move |key| Box::pin(f(key)) as BoxFetchFuture<T, E>;
    self.fetcher = Some(FetchFn::Async(Arc::new(fetch_fn)));
    self
  }

  /// Sets a blocking fetch function used by `ResourceCache::resource`.
  ///
  /// Each miss runs the closure on its own thread.
  pub fn blocking_fetcher(
    mut self,
    f: impl Fn(String) -> std::result::Result<T, E> + Send + Sync + 'static,
  ) -> Self {
    self.fetcher = Some(FetchFn::Blocking(Arc::new(f)));
    self
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<()> {
    check_durations(self.time_to_live, self.sweep_interval)?;
    if self.shards == 0 {
      return Err(ConfigError::ZeroShards);
    }
    Ok(())
  }
}

impl<T, E> CacheBuilder<T, E>
where
  T: Send + Sync + 'static,
  E: Send + Sync + 'static,
{
  /// Builds the cache and starts its eviction sweep.
  pub fn build(self) -> Result<ResourceCache<T, E>> {
    self.validate()?;

    let fetcher = match self.fetcher {
      Some(fetch) => Some(Fetcher::new(fetch, self.spawner)?),
      None => None,
    };

    let store = Arc::new(ShardedStore::new(self.shards));
    let metrics = Arc::new(Metrics::new());
    let settings = Arc::new(Settings::new(self.time_to_live, self.sweep_interval));
    let clock = self
      .clock
      .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

    let janitor = Janitor::spawn(JanitorContext {
      store: Arc::clone(&store),
      metrics: Arc::clone(&metrics),
      settings: Arc::clone(&settings),
      clock: Arc::clone(&clock),
    });

    tracing::debug!(
      time_to_live = ?self.time_to_live,
      sweep_interval = ?self.sweep_interval,
      shards = self.shards,
      "built resource cache"
    );

    Ok(ResourceCache {
      shared: CacheShared {
        store,
        metrics,
        settings,
        clock,
        fetcher,
        janitor: Some(janitor),
      },
    })
  }
}
