mod common;

use common::{CountingFactory, FetchError, Pokemon};
use suspense_cache::{CacheBuilder, CacheConfig, ManualClock, Resource, ResourceCache};

use std::sync::Arc;
use std::{thread, time::Duration};

const TINY_TTL: Duration = Duration::from_millis(150);
const JANITOR_TICK: Duration = Duration::from_millis(10);
const SLEEP_MARGIN: Duration = Duration::from_millis(150);

fn build_cache() -> ResourceCache<Pokemon, FetchError> {
  CacheBuilder::new()
    .time_to_live(TINY_TTL)
    .sweep_interval(JANITOR_TICK)
    .build()
    .unwrap()
}

#[test]
fn test_sync_janitor_evicts_after_ttl() {
  let cache = build_cache();
  let factory = CountingFactory::default();

  cache.get_or_create("pikachu", |key| factory.ready(key));
  assert_eq!(cache.len(), 1);

  thread::sleep(TINY_TTL + SLEEP_MARGIN);

  // The janitor removed the entry without any lookup touching it.
  assert_eq!(cache.len(), 0, "Entry should have been swept");
  let metrics = cache.metrics();
  assert_eq!(metrics.evicted_by_ttl, 1);
  assert_eq!(metrics.current_entries, 0);
  assert!(metrics.sweeps > 0);

  cache.get_or_create("pikachu", |key| factory.ready(key));
  assert_eq!(factory.calls(), 2);
}

#[test]
fn test_sync_ttl_is_not_reset_on_access() {
  let cache = build_cache();
  let factory = CountingFactory::default();

  let first = cache.get_or_create("mew", |key| factory.ready(key));
  thread::sleep(TINY_TTL / 2);
  let again = cache.get_or_create("mew", |key| factory.ready(key));
  assert!(Resource::ptr_eq(&first, &again));

  thread::sleep(TINY_TTL / 2 + SLEEP_MARGIN);
  let fresh = cache.get_or_create("mew", |key| factory.ready(key));
  assert!(
    !Resource::ptr_eq(&first, &fresh),
    "Entry should have expired despite access"
  );
  assert_eq!(factory.calls(), 2);
}

#[test]
fn test_sync_janitor_uses_configured_clock() {
  let clock = Arc::new(ManualClock::new());
  let cache = CacheBuilder::<Pokemon, FetchError>::new()
    .time_to_live(Duration::from_millis(1000))
    .sweep_interval(Duration::from_millis(100))
    .clock(clock.clone())
    .build()
    .unwrap();
  let factory = CountingFactory::default();

  let r1 = cache.get_or_create("pikachu", |key| factory.ready(key));

  // Real time passes but the cache clock does not: nothing expires.
  thread::sleep(Duration::from_millis(250));
  assert_eq!(cache.len(), 1);

  clock.advance(Duration::from_millis(500));
  let again = cache.get_or_create("pikachu", |key| factory.ready(key));
  assert!(Resource::ptr_eq(&r1, &again));

  // Past expiry on the cache clock; wait for a sweep tick.
  clock.advance(Duration::from_millis(700));
  thread::sleep(Duration::from_millis(250));
  assert_eq!(cache.len(), 0);

  let r2 = cache.get_or_create("pikachu", |key| factory.ready(key));
  assert!(!Resource::ptr_eq(&r1, &r2));
  assert_eq!(factory.calls(), 2);
}

#[test]
fn test_sync_configure_changes_sweep_cadence() {
  let cache = CacheBuilder::<Pokemon, FetchError>::new()
    .time_to_live(Duration::from_millis(50))
    .sweep_interval(Duration::from_secs(3600))
    .build()
    .unwrap();
  let factory = CountingFactory::default();

  cache.get_or_create("squirtle", |key| factory.ready(key));
  thread::sleep(Duration::from_millis(100));
  // Expired, but the janitor is asleep for an hour.
  assert_eq!(cache.len(), 1);

  cache.configure(CacheConfig::new(50, 10).unwrap()).unwrap();
  thread::sleep(Duration::from_millis(100));
  assert_eq!(cache.len(), 0);
}
