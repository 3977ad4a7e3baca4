#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use suspense_cache::{ManualClock, Resource, ResourceCache};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pokemon {
  pub name: String,
  pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError(pub String);

impl std::fmt::Display for FetchError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "unsupported pokemon: {}", self.0)
  }
}

impl std::error::Error for FetchError {}

/// A tiny pokedex. Anything else fails like an unknown name would.
pub fn lookup(name: &str) -> Result<Pokemon, FetchError> {
  let number = match name {
    "bulbasaur" => 1,
    "charmander" => 4,
    "squirtle" => 7,
    "pikachu" => 25,
    "mew" => 151,
    _ => return Err(FetchError(name.to_owned())),
  };
  Ok(Pokemon {
    name: name.to_owned(),
    number,
  })
}

/// Simulates a slow blocking fetch.
pub fn fetch_pokemon_blocking(name: &str, delay: Duration) -> Result<Pokemon, FetchError> {
  thread::sleep(delay);
  lookup(name)
}

/// Simulates a slow async fetch.
pub async fn fetch_pokemon(name: String, delay: Duration) -> Result<Pokemon, FetchError> {
  tokio::time::sleep(delay).await;
  lookup(&name)
}

/// A factory that counts how many resources it created.
#[derive(Clone, Default)]
pub struct CountingFactory {
  calls: Arc<AtomicUsize>,
}

impl CountingFactory {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Creates an already-settled resource for `name`.
  pub fn ready(&self, name: &str) -> Resource<Pokemon, FetchError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    match lookup(name) {
      Ok(pokemon) => Resource::ready(pokemon),
      Err(error) => Resource::failed(error),
    }
  }

  /// Creates a resource backed by a slow blocking fetch.
  pub fn slow(&self, name: &str, delay: Duration) -> Resource<Pokemon, FetchError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let name = name.to_owned();
    Resource::spawn_blocking(move || fetch_pokemon_blocking(&name, delay))
  }
}

/// A cache on a manual clock whose janitor effectively never runs, so the
/// test drives expiry itself.
pub fn build_manual_cache(ttl: Duration) -> (ResourceCache<Pokemon, FetchError>, Arc<ManualClock>) {
  let clock = Arc::new(ManualClock::new());
  let cache = ResourceCache::builder()
    .shards(4)
    .time_to_live(ttl)
    .sweep_interval(Duration::from_secs(3600))
    .clock(clock.clone())
    .build()
    .unwrap();
  (cache, clock)
}
