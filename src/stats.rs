use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_utils::CachePadded;

/// Internal statistics collector. All fields are atomic for lock-free
/// updates; every recording method is a no-op unless stats were requested
/// at build time, so the disabled path costs a single branch.
#[derive(Debug)]
pub(crate) struct StatsRecorder {
  enabled: bool,
  hits: CachePadded<AtomicU64>,
  misses: CachePadded<AtomicU64>,
  loads: CachePadded<AtomicU64>,
  load_failures: CachePadded<AtomicU64>,
  evictions: CachePadded<AtomicU64>,
  total_load_time_nanos: CachePadded<AtomicU64>,
}

impl StatsRecorder {
  pub(crate) fn new(enabled: bool) -> Self {
    Self {
      enabled,
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      loads: CachePadded::new(AtomicU64::new(0)),
      load_failures: CachePadded::new(AtomicU64::new(0)),
      evictions: CachePadded::new(AtomicU64::new(0)),
      total_load_time_nanos: CachePadded::new(AtomicU64::new(0)),
    }
  }

  #[inline]
  pub(crate) fn record_hit(&self) {
    if self.enabled {
      self.hits.fetch_add(1, Ordering::Relaxed);
    }
  }

  #[inline]
  pub(crate) fn record_miss(&self) {
    if self.enabled {
      self.misses.fetch_add(1, Ordering::Relaxed);
    }
  }

  /// Records one loader invocation, successful or not.
  #[inline]
  pub(crate) fn record_load(&self, elapsed: Duration, success: bool) {
    if !self.enabled {
      return;
    }
    self.loads.fetch_add(1, Ordering::Relaxed);
    self
      .total_load_time_nanos
      .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    if !success {
      self.load_failures.fetch_add(1, Ordering::Relaxed);
    }
  }

  #[inline]
  pub(crate) fn record_eviction(&self) {
    if self.enabled {
      self.evictions.fetch_add(1, Ordering::Relaxed);
    }
  }

  /// Creates a point-in-time snapshot of the counters.
  pub(crate) fn snapshot(&self) -> CacheStats {
    CacheStats {
      hit_count: self.hits.load(Ordering::Relaxed),
      miss_count: self.misses.load(Ordering::Relaxed),
      load_count: self.loads.load(Ordering::Relaxed),
      load_failure_count: self.load_failures.load(Ordering::Relaxed),
      eviction_count: self.evictions.load(Ordering::Relaxed),
      total_load_time: Duration::from_nanos(self.total_load_time_nanos.load(Ordering::Relaxed)),
    }
  }
}

/// A point-in-time, public-facing snapshot of the cache's statistics.
///
/// All counters stay zero unless the cache was built with `record_stats`.
#[derive(Clone, PartialEq, Eq)]
pub struct CacheStats {
  /// Lookups that found a live entry.
  pub hit_count: u64,
  /// Lookups that found nothing servable.
  pub miss_count: u64,
  /// Loader invocations, successful or not. Includes refresh loads.
  pub load_count: u64,
  /// Loader invocations that returned absent or panicked.
  pub load_failure_count: u64,
  /// Entries removed by the size or expiry policies.
  pub eviction_count: u64,
  /// Wall-clock time spent inside the loader, summed over all loads.
  pub total_load_time: Duration,
}

impl CacheStats {
  /// The fraction of lookups that hit, or 0.0 before any lookup.
  pub fn hit_ratio(&self) -> f64 {
    let total = self.hit_count + self.miss_count;
    if total == 0 {
      0.0
    } else {
      self.hit_count as f64 / total as f64
    }
  }

  /// The mean wall-clock cost of a loader invocation.
  pub fn average_load_penalty(&self) -> Duration {
    if self.load_count == 0 {
      Duration::ZERO
    } else {
      self.total_load_time / self.load_count as u32
    }
  }
}

impl fmt::Debug for CacheStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheStats")
      .field("hit_count", &self.hit_count)
      .field("miss_count", &self.miss_count)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio() * 100.0))
      .field("load_count", &self.load_count)
      .field("load_failure_count", &self.load_failure_count)
      .field("eviction_count", &self.eviction_count)
      .field("total_load_time", &self.total_load_time)
      .finish()
  }
}
