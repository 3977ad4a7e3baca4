use crate::error::ConfigError;
use crate::resource::Resource;
use crate::runtime::TaskSpawner;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(crate) type BoxFetchFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// The fetch function handed to the builder, before a spawner is attached.
pub(crate) enum FetchFn<T, E> {
  Blocking(Arc<dyn Fn(String) -> Result<T, E> + Send + Sync>),
  Async(Arc<dyn Fn(String) -> BoxFetchFuture<T, E> + Send + Sync>),
}

/// A fetch function ready to start resources for cache misses.
///
/// Async fetches carry the spawner they run on, so a configured fetcher can
/// always start its operation eagerly.
pub(crate) enum Fetcher<T, E> {
  Blocking(Arc<dyn Fn(String) -> Result<T, E> + Send + Sync>),
  Async {
    fetch: Arc<dyn Fn(String) -> BoxFetchFuture<T, E> + Send + Sync>,
    spawner: Arc<dyn TaskSpawner>,
  },
}

impl<T, E> Fetcher<T, E> {
  /// Pairs a fetch function with a spawner. Async fetch functions without a
  /// spawner fall back to the ambient Tokio runtime when that feature is on.
  pub(crate) fn new(
    fetch: FetchFn<T, E>,
    spawner: Option<Arc<dyn TaskSpawner>>,
  ) -> Result<Self, ConfigError> {
    match fetch {
      FetchFn::Blocking(f) => Ok(Fetcher::Blocking(f)),
      FetchFn::Async(fetch) => {
        let spawner = match spawner {
          Some(spawner) => spawner,
          None => default_spawner()?,
        };
        Ok(Fetcher::Async { fetch, spawner })
      }
    }
  }

  /// Starts fetching `key` and returns the resource tracking it.
  pub(crate) fn start(&self, key: &str) -> Resource<T, E>
  where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
  {
    match self {
      Fetcher::Blocking(f) => {
        let f = f.clone();
        let key = key.to_owned();
        Resource::spawn_blocking(move || f(key))
      }
      Fetcher::Async { fetch, spawner } => Resource::spawn(spawner.as_ref(), fetch(key.to_owned())),
    }
  }
}

#[cfg(feature = "tokio")]
fn default_spawner() -> Result<Arc<dyn TaskSpawner>, ConfigError> {
  match tokio::runtime::Handle::try_current() {
    Ok(handle) => Ok(Arc::new(crate::runtime::TokioSpawner::with_handle(handle))),
    Err(_) => Err(ConfigError::SpawnerRequired),
  }
}

#[cfg(not(feature = "tokio"))]
fn default_spawner() -> Result<Arc<dyn TaskSpawner>, ConfigError> {
  Err(ConfigError::SpawnerRequired)
}
