use crate::entry::CacheEntry;

use core::fmt;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

/// A helper function to hash a key using a `BuildHasher`.
#[inline]
pub(crate) fn hash_key<K: Hash + ?Sized, H: BuildHasher>(hasher: &H, key: &K) -> u64 {
  let mut state = hasher.build_hasher();
  key.hash(&mut state);
  state.finish()
}

/// A cache store that is partitioned into multiple, independently locked
/// shards.
///
/// Operations on different keys are unlikely to contend for the same lock.
/// The shard count is a power of two so routing is a mask, not a modulo.
pub(crate) struct ShardedStore<K, V, H> {
  pub(crate) shards: Box<[CachePadded<RwLock<HashMap<K, Arc<CacheEntry<V>>, H>>>]>,
  pub(crate) hasher: H,
}

impl<K, V, H> fmt::Debug for ShardedStore<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedStore")
      .field("num_shards", &self.shards.len())
      .finish()
  }
}

impl<K, V, H> ShardedStore<K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher + Clone,
{
  /// Creates a new store. `num_shards` must be a power of two.
  pub(crate) fn new(num_shards: usize, hasher: H) -> Self {
    debug_assert!(num_shards.is_power_of_two());
    let mut shards = Vec::with_capacity(num_shards);
    for _ in 0..num_shards {
      shards.push(CachePadded::new(RwLock::new(HashMap::with_hasher(
        hasher.clone(),
      ))));
    }

    Self {
      shards: shards.into_boxed_slice(),
      hasher,
    }
  }

  #[inline]
  pub(crate) fn shard_index(&self, key: &K) -> usize {
    hash_key(&self.hasher, key) as usize & (self.shards.len() - 1)
  }

  /// Returns the lock guarding the shard for a given key.
  #[inline]
  pub(crate) fn shard_for(&self, key: &K) -> &RwLock<HashMap<K, Arc<CacheEntry<V>>, H>> {
    &self.shards[self.shard_index(key)]
  }

  /// Iterates over all shard locks, for whole-cache operations such as
  /// `invalidate_all` and the exhaustive maintenance pass.
  pub(crate) fn iter_shards(
    &self,
  ) -> impl Iterator<Item = &RwLock<HashMap<K, Arc<CacheEntry<V>>, H>>> {
    self.shards.iter().map(|padded| &**padded)
  }

  /// Approximate number of physically present entries, including any that
  /// are eligible for removal but not yet purged.
  pub(crate) fn len(&self) -> u64 {
    self.iter_shards().map(|s| s.read().len() as u64).sum()
  }

  /// Number of entries still servable at `now`. Expired or pending-removal
  /// leftovers awaiting a sweep are not counted.
  pub(crate) fn live_len(&self, now: u64) -> u64 {
    self
      .iter_shards()
      .map(|s| s.read().values().filter(|e| e.is_valid(now)).count() as u64)
      .sum()
  }
}
