use crate::cache::Cache;
use crate::error::ConfigError;
use crate::executor::{Executor, ThreadExecutor};
use crate::expiry::{Expiry, ExpiryPolicy};
use crate::listener::{EvictionListener, RemovalListener};
use crate::loader::LoaderFn;
use crate::loading::LoadingCache;
use crate::policy::lru::LruPolicy;
use crate::policy::null::NullPolicy;
use crate::policy::CachePolicy;
use crate::shared::CacheShared;
use crate::stats::StatsRecorder;
use crate::store::ShardedStore;
use crate::task::janitor::Janitor;
use crate::task::notifier::Notifier;

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// How often the janitor thread wakes up for an amortized maintenance pass.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

fn default_num_shards() -> usize {
  (num_cpus::get() * 4).max(1).next_power_of_two()
}

/// Configures and constructs a [`Cache`] or [`LoadingCache`].
///
/// ```
/// use robusta_cache::CacheBuilder;
/// use std::time::Duration;
///
/// let cache = CacheBuilder::new()
///   .maximum_size(10_000)
///   .expire_after_write(Duration::from_secs(300))
///   .record_stats()
///   .build()
///   .unwrap();
///
/// cache.put("alpha", 1u32);
/// assert_eq!(cache.get_if_present(&"alpha").as_deref(), Some(&1));
/// ```
pub struct CacheBuilder<K: Send, V: Send + Sync, H = ahash::RandomState> {
  maximum_size: Option<u64>,
  num_shards: usize,
  expire_after_access: Option<Duration>,
  expire_after_write: Option<Duration>,
  expiry: Option<Arc<dyn Expiry<K, V>>>,
  refresh_after_write: Option<Duration>,
  record_stats: bool,
  removal_listener: Option<Arc<dyn RemovalListener<K, V>>>,
  eviction_listener: Option<Arc<dyn EvictionListener<K, V>>>,
  executor: Option<Arc<dyn Executor>>,
  tick_interval: Duration,
  hasher: H,
}

impl<K: Send, V: Send + Sync> CacheBuilder<K, V, ahash::RandomState> {
  pub fn new() -> Self {
    Self {
      maximum_size: None,
      num_shards: default_num_shards(),
      expire_after_access: None,
      expire_after_write: None,
      expiry: None,
      refresh_after_write: None,
      record_stats: false,
      removal_listener: None,
      eviction_listener: None,
      executor: None,
      tick_interval: DEFAULT_TICK_INTERVAL,
      hasher: ahash::RandomState::new(),
    }
  }
}

impl<K: Send, V: Send + Sync> Default for CacheBuilder<K, V, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V, H> CacheBuilder<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Replaces the default `ahash::RandomState` with an explicit hash
  /// builder, for deterministic shard routing or a different hash function.
  pub fn hasher<H2>(self, hasher: H2) -> CacheBuilder<K, V, H2>
  where
    H2: BuildHasher + Clone + Send + Sync + 'static,
  {
    CacheBuilder {
      maximum_size: self.maximum_size,
      num_shards: self.num_shards,
      expire_after_access: self.expire_after_access,
      expire_after_write: self.expire_after_write,
      expiry: self.expiry,
      refresh_after_write: self.refresh_after_write,
      record_stats: self.record_stats,
      removal_listener: self.removal_listener,
      eviction_listener: self.eviction_listener,
      executor: self.executor,
      tick_interval: self.tick_interval,
      hasher,
    }
  }

  /// Bounds the cache to at most `size` entries. When the bound is
  /// exceeded, least-recently-used entries are evicted with the `Size`
  /// cause. A bound of zero is allowed; such a cache loads and passes
  /// values through but retains nothing for long.
  pub fn maximum_size(mut self, size: u64) -> Self {
    self.maximum_size = Some(size);
    self
  }

  /// Number of independently locked shards. Rounded up to a power of two.
  /// Defaults to four times the number of logical CPUs.
  pub fn num_shards(mut self, num_shards: usize) -> Self {
    self.num_shards = num_shards;
    self
  }

  /// Expires an entry once it has gone unread and unwritten for `d`.
  pub fn expire_after_access(mut self, d: Duration) -> Self {
    self.expire_after_access = Some(d);
    self
  }

  /// Expires an entry a fixed `d` after it was created or last replaced.
  pub fn expire_after_write(mut self, d: Duration) -> Self {
    self.expire_after_write = Some(d);
    self
  }

  /// Computes per-entry deadlines with a custom [`Expiry`] calculator.
  pub fn expire_after(mut self, expiry: impl Expiry<K, V> + 'static) -> Self {
    self.expiry = Some(Arc::new(expiry));
    self
  }

  /// Schedules a background reload for an entry the first time it is read
  /// more than `d` after its last write. The stale value keeps being
  /// served until the reload lands. Only valid with a bound loader.
  pub fn refresh_after_write(mut self, d: Duration) -> Self {
    self.refresh_after_write = Some(d);
    self
  }

  /// Enables hit, miss, load and eviction counters. Off by default; with
  /// stats off, [`Cache::stats`] reports zeros.
  pub fn record_stats(mut self) -> Self {
    self.record_stats = true;
    self
  }

  /// Registers a listener for every terminal removal, whatever the cause.
  /// It is called on a dedicated background thread, in removal order.
  pub fn removal_listener(
    mut self,
    listener: impl RemovalListener<K, V> + 'static,
  ) -> Self {
    self.removal_listener = Some(Arc::new(listener));
    self
  }

  /// Registers a listener for evictions only (`Size` and `Expired`). It is
  /// called synchronously on the thread performing the eviction.
  pub fn eviction_listener(
    mut self,
    listener: impl EvictionListener<K, V> + 'static,
  ) -> Self {
    self.eviction_listener = Some(Arc::new(listener));
    self
  }

  /// Supplies the executor that runs background refresh jobs. Defaults to
  /// [`ThreadExecutor`], one short-lived thread per job.
  pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
    self.executor = Some(Arc::new(executor));
    self
  }

  /// Overrides the janitor's wakeup interval. Exposed for tests that need
  /// maintenance to converge faster than the default one second.
  #[doc(hidden)]
  pub fn tick_interval(mut self, interval: Duration) -> Self {
    self.tick_interval = interval;
    self
  }

  /// Builds a manual cache. Misses return absent or run the loader the
  /// caller passes to [`Cache::get_with`].
  pub fn build(self) -> Result<Cache<K, V, H>, ConfigError> {
    if self.refresh_after_write.is_some() {
      return Err(ConfigError::RefreshRequiresLoader);
    }
    let shared = self.build_shared(None)?;
    Ok(Cache { shared })
  }

  /// Builds a cache with `loader` bound to it. [`LoadingCache::get`]
  /// resolves misses through it, and `refresh_after_write` reloads entries
  /// with it in the background.
  pub fn build_with(
    self,
    loader: impl Fn(&K) -> Option<V> + Send + Sync + 'static,
  ) -> Result<LoadingCache<K, V, H>, ConfigError> {
    let shared = self.build_shared(Some(Arc::new(loader)))?;
    Ok(LoadingCache::new(Cache { shared }))
  }

  fn build_shared(
    self,
    loader: Option<LoaderFn<K, V>>,
  ) -> Result<Arc<CacheShared<K, V, H>>, ConfigError> {
    let strategies = usize::from(self.expire_after_access.is_some())
      + usize::from(self.expire_after_write.is_some())
      + usize::from(self.expiry.is_some());
    if strategies > 1 {
      return Err(ConfigError::ExpiryConflict);
    }
    if self.num_shards == 0 {
      return Err(ConfigError::ZeroShards);
    }

    let expiry = if let Some(custom) = self.expiry {
      ExpiryPolicy::Custom(custom)
    } else if let Some(d) = self.expire_after_access {
      ExpiryPolicy::AfterAccess(d)
    } else if let Some(d) = self.expire_after_write {
      ExpiryPolicy::AfterWrite(d)
    } else {
      ExpiryPolicy::None
    };

    let num_shards = self.num_shards.next_power_of_two();
    let store = Arc::new(ShardedStore::new(num_shards, self.hasher.clone()));
    let stats = Arc::new(StatsRecorder::new(self.record_stats));

    let policy: Arc<dyn CachePolicy<K>> = if self.maximum_size.is_some() {
      Arc::new(LruPolicy::new())
    } else {
      Arc::new(NullPolicy)
    };

    let (notifier, removal_tx) = match self.removal_listener {
      Some(listener) => {
        let (notifier, tx) = Notifier::spawn(listener);
        (Some(notifier), Some(tx))
      }
      None => (None, None),
    };

    let pending_loads: Box<[Mutex<HashMap<K, _, H>>]> = (0..num_shards)
      .map(|_| Mutex::new(HashMap::with_hasher(self.hasher.clone())))
      .collect();

    let maintenance_lock = Arc::new(Mutex::new(()));

    let mut shared = CacheShared {
      store,
      stats,
      policy,
      expiry,
      maximum_size: self.maximum_size,
      refresh_after_write: self.refresh_after_write,
      loader,
      executor: self
        .executor
        .unwrap_or_else(|| Arc::new(ThreadExecutor)),
      pending_loads,
      removal_tx,
      eviction_listener: self.eviction_listener,
      maintenance_lock,
      janitor: None,
      _notifier: notifier,
    };

    // Only caches that can shed entries on their own need the janitor.
    if shared.maximum_size.is_some() || !shared.expiry.is_none() {
      shared.janitor = Some(Janitor::spawn(
        shared.maintenance_context(),
        self.tick_interval,
      ));
    }

    Ok(Arc::new(shared))
  }
}
