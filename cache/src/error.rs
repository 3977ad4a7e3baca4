use thiserror::Error;

/// Errors that can occur when configuring a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  /// The cache was configured with a time-to-live of zero. Every entry would
  /// be expired the moment it was created.
  #[error("time-to-live must be greater than zero")]
  ZeroTimeToLive,
  /// The eviction sweep was configured with an interval of zero.
  #[error("sweep interval must be greater than zero")]
  ZeroSweepInterval,
  /// The time-to-live does not fit in 2^64 nanoseconds (about 584 years).
  #[error("time-to-live {0:?} exceeds the maximum of {max:?}", max = crate::builder::MAX_DURATION)]
  TimeToLiveTooLarge(std::time::Duration),
  /// The sweep interval does not fit in 2^64 nanoseconds (about 584 years).
  #[error("sweep interval {0:?} exceeds the maximum of {max:?}", max = crate::builder::MAX_DURATION)]
  SweepIntervalTooLarge(std::time::Duration),
  /// The cache was configured with zero shards, which is not allowed.
  #[error("shard count cannot be zero")]
  ZeroShards,
  /// An async fetcher was provided, but no `TaskSpawner` was configured
  /// and the default `tokio` feature is not enabled.
  #[error("an async fetcher requires a task spawner or the 'tokio' feature")]
  SpawnerRequired,
}

/// Errors surfaced when probing a `Resource`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
  /// The operation backing the resource was dropped before it produced a
  /// result, e.g. the task panicked or its runtime shut down.
  #[error("resource operation was dropped before it settled")]
  Abandoned,
}

/// Errors returned by `ResourceCache` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
  /// `ResourceCache::resource` was called on a cache built without a fetcher.
  #[error("no fetcher configured for this cache")]
  NoFetcher,
}

/// A specialized `Result` type for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
