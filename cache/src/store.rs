use crate::entry::CacheEntry;

use core::fmt;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

pub(crate) type ShardMap<T, E> = HashMap<String, CacheEntry<T, E>, ahash::RandomState>;

/// A helper function to hash a key using a `BuildHasher`.
#[inline]
fn hash_key<K: Hash + ?Sized, H: BuildHasher>(hasher: &H, key: &K) -> u64 {
  let mut state = hasher.build_hasher();
  key.hash(&mut state);
  state.finish()
}

/// A resource store that is partitioned into multiple, independently locked shards.
///
/// Requests for different keys rarely contend for the same lock, while every
/// request for one key always lands on the same shard, which is what makes
/// the per-key check-then-insert atomic.
pub(crate) struct ShardedStore<T, E> {
  shards: Box<[CachePadded<RwLock<ShardMap<T, E>>>]>,
  hasher: ahash::RandomState,
}

impl<T, E> fmt::Debug for ShardedStore<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedStore")
      .field("num_shards", &self.shards.len())
      .finish()
  }
}

impl<T, E> ShardedStore<T, E> {
  /// Creates a new `ShardedStore` with the specified number of shards.
  pub(crate) fn new(num_shards: usize) -> Self {
    let hasher = ahash::RandomState::new();
    let mut shards = Vec::with_capacity(num_shards);
    for _ in 0..num_shards {
      let shard_map = HashMap::with_hasher(hasher.clone());
      shards.push(CachePadded::new(RwLock::new(shard_map)));
    }

    Self {
      shards: shards.into_boxed_slice(),
      hasher,
    }
  }

  /// Returns the lock guarding the shard that owns `key`.
  #[inline]
  pub(crate) fn get_shard(&self, key: &str) -> &RwLock<ShardMap<T, E>> {
    let hash = hash_key(&self.hasher, key);
    // Safe because the builder rejects a shard count of zero.
    let index = hash as usize % self.shards.len();
    &self.shards[index]
  }

  /// Returns an iterator over all the shard locks.
  /// Used by whole-cache operations such as the sweep and `clear()`.
  pub(crate) fn iter_shards(&self) -> impl Iterator<Item = &RwLock<ShardMap<T, E>>> {
    self.shards.iter().map(|padded_lock| &**padded_lock)
  }

  pub(crate) fn num_shards(&self) -> usize {
    self.shards.len()
  }
}
