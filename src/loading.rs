use crate::cache::Cache;
use crate::shared::CacheShared;
use crate::time;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ops::Deref;
use std::sync::Arc;

/// A cache with a loader bound at construction: every miss self-resolves
/// without a per-call loader argument, and reads of entries older than
/// `refresh_after_write` trigger a background reload.
///
/// Dereferences to [`Cache`], so the whole plain-cache API is available.
pub struct LoadingCache<K: Send, V: Send + Sync, H = ahash::RandomState> {
  cache: Cache<K, V, H>,
}

impl<K: Send, V: Send + Sync, H> Clone for LoadingCache<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
    }
  }
}

impl<K: Send, V: Send + Sync, H> fmt::Debug for LoadingCache<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoadingCache")
      .field("cache", &self.cache)
      .finish()
  }
}

impl<K: Send, V: Send + Sync, H> Deref for LoadingCache<K, V, H> {
  type Target = Cache<K, V, H>;

  fn deref(&self) -> &Self::Target {
    &self.cache
  }
}

impl<K, V, H> LoadingCache<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn new(cache: Cache<K, V, H>) -> Self {
    Self { cache }
  }

  /// Returns the cached value, loading it with the bound loader on a miss.
  ///
  /// When `refresh_after_write` is configured and the entry's write
  /// timestamp is old enough, the stale value is returned immediately and
  /// a single background reload is triggered; reads during the in-flight
  /// reload keep seeing the stale value.
  pub fn get(&self, key: &K) -> Option<Arc<V>> {
    let shared = &self.cache.shared;
    let now = time::now_nanos();

    if let Some(entry) = shared.lookup_valid(key, now) {
      shared.on_hit(key, &entry, now);
      if let Some(refresh) = shared.refresh_after_write {
        if now.saturating_sub(entry.write_at) >= refresh.as_nanos() as u64 {
          CacheShared::trigger_refresh(shared, key);
        }
      }
      return Some(entry.value());
    }

    shared.stats.record_miss();
    let Some(loader) = shared.loader.clone() else {
      // Unreachable: the builder only hands out a LoadingCache with a
      // loader bound.
      return None;
    };
    shared.load_sync(key, loader.as_ref())
  }

  /// Asynchronously reloads the value for `key`, replacing the entry when
  /// the load completes. No-op if a load or refresh is already in flight.
  pub fn refresh(&self, key: &K) {
    CacheShared::trigger_refresh(&self.cache.shared, key);
  }
}
