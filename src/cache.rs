use crate::entry::CacheEntry;
use crate::listener::RemovalCause;
use crate::shared::CacheShared;
use crate::stats::CacheStats;
use crate::task::janitor::run_maintenance;
use crate::time;

use std::cell::Cell;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

thread_local! {
  // A simple, fast xorshift generator for the amortized maintenance check.
  // Each thread gets its own state, avoiding contention.
  static RNG: Cell<u32> = Cell::new(1);
}

/// Roughly one write in this many triggers an amortized maintenance pass.
const MAINTENANCE_SAMPLE_DENOMINATOR: u32 = 16;

fn should_sample_maintenance() -> bool {
  RNG.with(|cell| {
    let mut x = cell.get();
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    cell.set(x);
    x % MAINTENANCE_SAMPLE_DENOMINATOR == 0
  })
}

/// A thread-safe cache without a bound loader. Misses either return absent
/// (`get_if_present`) or run a caller-supplied loader (`get_with`).
///
/// Handles are cheap to clone; clones share the same underlying cache.
pub struct Cache<K: Send, V: Send + Sync, H = ahash::RandomState> {
  pub(crate) shared: Arc<CacheShared<K, V, H>>,
}

impl<K: Send, V: Send + Sync, H> Clone for Cache<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<K: Send, V: Send + Sync, H> fmt::Debug for Cache<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cache").field("shared", &self.shared).finish()
  }
}

impl<K, V, H> Cache<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Returns the value for `key` if a live entry is present, without
  /// triggering a load.
  ///
  /// A logically expired entry reads as absent even if maintenance has not
  /// physically removed it yet.
  pub fn get_if_present(&self, key: &K) -> Option<Arc<V>> {
    let now = time::now_nanos();
    match self.shared.lookup_valid(key, now) {
      Some(entry) => {
        self.shared.on_hit(key, &entry, now);
        Some(entry.value())
      }
      None => {
        self.shared.stats.record_miss();
        None
      }
    }
  }

  /// Returns the cached value, or computes it with `loader` on a miss.
  ///
  /// Concurrent calls for the same key collapse to a single loader
  /// invocation; every caller receives that one result. An absent (`None`)
  /// result is returned but never stored, so the next access loads again.
  pub fn get_with<F>(&self, key: &K, loader: F) -> Option<Arc<V>>
  where
    F: Fn(&K) -> Option<V>,
  {
    let now = time::now_nanos();
    if let Some(entry) = self.shared.lookup_valid(key, now) {
      self.shared.on_hit(key, &entry, now);
      return Some(entry.value());
    }

    self.shared.stats.record_miss();
    self.shared.load_sync(key, &loader)
  }

  /// Unconditionally inserts or replaces the value for `key`, resetting
  /// its write timestamp. A displaced live value is reported to the
  /// removal listener with the `Replaced` cause.
  pub fn put(&self, key: K, value: V) {
    let now = time::now_nanos();

    let displaced = {
      let mut guard = self.shared.store.shard_for(&key).write();
      let deadline = match guard.get(&key) {
        Some(old) if old.is_valid(now) => {
          self
            .shared
            .expiry
            .deadline_on_update(&key, &value, now, old.remaining(now))
        }
        _ => self.shared.expiry.deadline_on_create(&key, &value, now),
      };
      guard.insert(key.clone(), Arc::new(CacheEntry::new(value, now, deadline)))
    };

    self.shared.policy.on_admit(&key);
    if let Some(old) = displaced {
      self.shared.retire_displaced(&key, old, now);
    }

    self.maybe_maintain();
  }

  /// Removes the entry for `key`, reporting `Explicit` to the removal
  /// listener. Returns false, with no `Explicit` notification, when the
  /// key was absent or only present as a logically expired leftover.
  pub fn invalidate(&self, key: &K) -> bool {
    let now = time::now_nanos();
    let removed = { self.shared.store.shard_for(key).write().remove(key) };
    let Some(entry) = removed else {
      return false;
    };

    self.shared.policy.on_remove(key);
    let was_live = entry.is_valid(now);
    if entry.try_claim_removal() {
      let cause = if was_live {
        RemovalCause::Explicit
      } else if entry.is_expired(now) {
        RemovalCause::Expired
      } else {
        RemovalCause::Size
      };
      self.shared.dispatch(key.clone(), entry.value(), cause);
    }
    was_live
  }

  /// Removes every entry, shard by shard.
  pub fn invalidate_all(&self) {
    let now = time::now_nanos();
    for shard in self.shared.store.iter_shards() {
      let drained: Vec<(K, Arc<CacheEntry<V>>)> = {
        let mut guard = shard.write();
        guard.drain().collect()
      };
      for (key, entry) in drained {
        self.shared.policy.on_remove(&key);
        let was_live = entry.is_valid(now);
        if entry.try_claim_removal() {
          let cause = if was_live {
            RemovalCause::Explicit
          } else if entry.is_expired(now) {
            RemovalCause::Expired
          } else {
            RemovalCause::Size
          };
          self.shared.dispatch(key, entry.value(), cause);
        }
      }
    }
    self.shared.policy.clear();
  }

  /// Runs a full maintenance pass synchronously: purges everything that is
  /// already eligible and fires the corresponding notifications before
  /// returning.
  pub fn clean_up(&self) {
    run_maintenance(&self.shared.maintenance_context(), true);
  }

  /// Approximate number of entries, including any that are eligible for
  /// removal but not yet purged. `clean_up` first for an exact count.
  pub fn entry_count(&self) -> u64 {
    self.shared.store.len()
  }

  /// A point-in-time snapshot of the cache's statistics. All zeros unless
  /// the cache was built with `record_stats`.
  pub fn stats(&self) -> CacheStats {
    self.shared.stats.snapshot()
  }

  /// Amortizes maintenance into the write path so caches without traffic
  /// spikes converge even between janitor ticks.
  fn maybe_maintain(&self) {
    if self.shared.maximum_size.is_none() && self.shared.expiry.is_none() {
      return;
    }
    if should_sample_maintenance() {
      run_maintenance(&self.shared.maintenance_context(), false);
    }
  }
}
