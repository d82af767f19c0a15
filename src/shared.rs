use crate::entry::CacheEntry;
use crate::executor::Executor;
use crate::expiry::ExpiryPolicy;
use crate::listener::{EvictionListener, RemovalCause};
use crate::loader::{run_loader, LoadFuture, LoaderFn};
use crate::policy::CachePolicy;
use crate::stats::StatsRecorder;
use crate::store::{hash_key, ShardedStore};
use crate::task::janitor::{Janitor, MaintenanceContext};
use crate::task::notifier::{deliver, Notification, Notifier};
use crate::time;

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

/// The internal, thread-safe core of the cache. All handles share one of
/// these behind an `Arc`.
pub(crate) struct CacheShared<K: Send, V: Send + Sync, H> {
  pub(crate) store: Arc<ShardedStore<K, V, H>>,
  pub(crate) stats: Arc<StatsRecorder>,
  pub(crate) policy: Arc<dyn CachePolicy<K>>,
  pub(crate) expiry: ExpiryPolicy<K, V>,
  pub(crate) maximum_size: Option<u64>,
  pub(crate) refresh_after_write: Option<Duration>,
  pub(crate) loader: Option<LoaderFn<K, V>>,
  pub(crate) executor: Arc<dyn Executor>,
  /// Striped singleflight registry: at most one in-flight load or refresh
  /// per key, shared by everyone who wants its result.
  pub(crate) pending_loads: Box<[Mutex<HashMap<K, Arc<LoadFuture<V>>, H>>]>,
  pub(crate) removal_tx: Option<Sender<Notification<K, V>>>,
  pub(crate) eviction_listener: Option<Arc<dyn EvictionListener<K, V>>>,
  pub(crate) maintenance_lock: Arc<Mutex<()>>,
  pub(crate) janitor: Option<Janitor>,
  /// Kept alive so the dispatch thread outlives the last notification.
  pub(crate) _notifier: Option<Notifier>,
}

impl<K: Send, V: Send + Sync, H> fmt::Debug for CacheShared<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheShared")
      .field("maximum_size", &self.maximum_size)
      .field("refresh_after_write", &self.refresh_after_write)
      .field("num_shards", &self.store.shards.len())
      .finish_non_exhaustive()
  }
}

impl<K: Send, V: Send + Sync, H> Drop for CacheShared<K, V, H> {
  fn drop(&mut self) {
    if let Some(janitor) = self.janitor.take() {
      janitor.stop();
    }
    // Dropping `removal_tx` disconnects the notifier's channel; its thread
    // drains what is queued and exits.
  }
}

impl<K, V, H> CacheShared<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn maintenance_context(&self) -> MaintenanceContext<K, V, H> {
    MaintenanceContext {
      store: Arc::clone(&self.store),
      stats: Arc::clone(&self.stats),
      policy: Arc::clone(&self.policy),
      maximum_size: self.maximum_size,
      removal_tx: self.removal_tx.clone(),
      eviction_listener: self.eviction_listener.clone(),
      maintenance_lock: Arc::clone(&self.maintenance_lock),
    }
  }

  #[inline]
  pub(crate) fn pending_stripe(&self, key: &K) -> &Mutex<HashMap<K, Arc<LoadFuture<V>>, H>> {
    let index = hash_key(&self.store.hasher, key) as usize & (self.pending_loads.len() - 1);
    &self.pending_loads[index]
  }

  /// Returns the entry for `key` if it is currently servable. Pure lookup;
  /// hit bookkeeping is the caller's job so the read lock is held only for
  /// the map probe.
  pub(crate) fn lookup_valid(&self, key: &K, now: u64) -> Option<Arc<CacheEntry<V>>> {
    let guard = self.store.shard_for(key).read();
    guard.get(key).filter(|entry| entry.is_valid(now)).cloned()
  }

  /// Hit bookkeeping: read-path expiry updates, recency, statistics.
  pub(crate) fn on_hit(&self, key: &K, entry: &CacheEntry<V>, now: u64) {
    self.expiry.on_read(key, entry, now);
    self.policy.on_access(key);
    self.stats.record_hit();
  }

  /// Routes one claimed terminal transition to the listeners.
  pub(crate) fn dispatch(&self, key: K, value: Arc<V>, cause: RemovalCause) {
    if cause.was_evicted() {
      self.stats.record_eviction();
    }
    deliver(
      self.removal_tx.as_ref(),
      self.eviction_listener.as_ref(),
      key,
      value,
      cause,
    );
  }

  /// Inserts a freshly loaded value and retires whatever it displaced.
  /// Returns the stored value for handing back to callers and waiters.
  pub(crate) fn store_loaded(&self, key: K, value: V, now: u64) -> Arc<V> {
    let deadline = self.expiry.deadline_on_create(&key, &value, now);
    let entry = Arc::new(CacheEntry::new(value, now, deadline));
    let result = entry.value();

    let displaced = {
      let mut guard = self.store.shard_for(&key).write();
      guard.insert(key.clone(), entry)
    };
    self.policy.on_admit(&key);
    if let Some(old) = displaced {
      self.retire_displaced(&key, old, now);
    }
    result
  }

  /// Claims and notifies an entry that was displaced by a newer value.
  /// A displaced entry whose deadline had already elapsed counts as
  /// expired rather than replaced.
  pub(crate) fn retire_displaced(&self, key: &K, old: Arc<CacheEntry<V>>, now: u64) {
    if old.try_claim_removal() {
      let cause = if old.is_expired(now) {
        RemovalCause::Expired
      } else {
        RemovalCause::Replaced
      };
      self.dispatch(key.clone(), old.value(), cause);
    }
  }

  /// The miss path: collapses concurrent loads for one key into a single
  /// loader invocation. The leader runs the loader on its own thread and
  /// blocks; everyone else parks on the shared future and receives the
  /// leader's result.
  pub(crate) fn load_sync<F>(&self, key: &K, loader: &F) -> Option<Arc<V>>
  where
    F: Fn(&K) -> Option<V> + ?Sized,
  {
    let (future, is_leader) = {
      let mut pending = self.pending_stripe(key).lock();
      match pending.get(key) {
        Some(existing) => (existing.clone(), false),
        None => {
          let future = Arc::new(LoadFuture::new());
          pending.insert(key.clone(), future.clone());
          (future, true)
        }
      }
    };

    if !is_leader {
      return future.wait();
    }

    let loaded = run_loader(loader, key, &self.stats);
    // Timestamp after the load so a slow loader does not eat into the
    // entry's expiry and refresh windows.
    let now = time::now_nanos();
    let stored = loaded.map(|value| self.store_loaded(key.clone(), value, now));

    self.pending_stripe(key).lock().remove(key);
    future.complete(stored.clone());
    stored
  }

  /// Submits at most one background refresh for `key` to the executor.
  /// Gives up silently when another load or refresh is already in flight,
  /// or when the singleflight stripe is contended; the other thread's work
  /// covers us either way.
  pub(crate) fn trigger_refresh(shared: &Arc<Self>, key: &K) {
    let Some(loader) = shared.loader.clone() else {
      return;
    };

    let future = {
      let Some(mut pending) = shared.pending_stripe(key).try_lock() else {
        return;
      };
      if pending.contains_key(key) {
        return;
      }
      let future = Arc::new(LoadFuture::new());
      pending.insert(key.clone(), future.clone());
      future
    };

    let executor = Arc::clone(&shared.executor);
    let shared = Arc::clone(shared);
    let key = key.clone();
    executor.execute(Box::new(move || {
      let loaded = run_loader(loader.as_ref(), &key, &shared.stats);
      let now = time::now_nanos();
      // An absent refresh result leaves the current entry untouched.
      let stored = loaded.map(|value| shared.store_loaded(key.clone(), value, now));

      shared.pending_stripe(&key).lock().remove(&key);
      future.complete(stored);
    }));
  }
}
