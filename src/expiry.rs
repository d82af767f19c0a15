use crate::entry::CacheEntry;

use std::sync::Arc;
use std::time::Duration;

/// A per-entry expiry calculator.
///
/// The cache consults the calculator at three points in an entry's life and
/// stores the returned duration as the entry's deadline. `now` is given as a
/// duration since the cache's internal epoch; `current` is the remaining
/// time on the entry's present deadline. The update and read hooks default
/// to returning `current` unchanged, which leaves the deadline as it was.
pub trait Expiry<K, V>: Send + Sync {
  /// Duration until expiry for a freshly created entry.
  fn expire_after_create(&self, key: &K, value: &V, now: Duration) -> Duration;

  /// Duration until expiry after a value replaced an existing live entry.
  fn expire_after_update(&self, key: &K, value: &V, now: Duration, current: Duration) -> Duration {
    let _ = (key, value, now);
    current
  }

  /// Duration until expiry after the entry was read.
  fn expire_after_read(&self, key: &K, value: &V, now: Duration, current: Duration) -> Duration {
    let _ = (key, value, now);
    current
  }
}

/// The expiry strategy selected at build time. At most one is active.
pub(crate) enum ExpiryPolicy<K, V> {
  /// Entries never expire by time.
  None,
  /// An entry expires once it has not been read or written for the duration.
  AfterAccess(Duration),
  /// An entry expires a fixed duration after its last write.
  AfterWrite(Duration),
  /// Deadlines are computed by a user-supplied calculator.
  Custom(Arc<dyn Expiry<K, V>>),
}

impl<K, V> Clone for ExpiryPolicy<K, V> {
  fn clone(&self) -> Self {
    match self {
      ExpiryPolicy::None => ExpiryPolicy::None,
      ExpiryPolicy::AfterAccess(d) => ExpiryPolicy::AfterAccess(*d),
      ExpiryPolicy::AfterWrite(d) => ExpiryPolicy::AfterWrite(*d),
      ExpiryPolicy::Custom(e) => ExpiryPolicy::Custom(e.clone()),
    }
  }
}

#[inline]
fn duration_nanos(d: Duration) -> u64 {
  d.as_nanos().min(u64::MAX as u128) as u64
}

impl<K, V> ExpiryPolicy<K, V> {
  pub(crate) fn is_none(&self) -> bool {
    matches!(self, ExpiryPolicy::None)
  }

  /// Deadline in epoch nanos for a freshly created entry. 0 means none.
  pub(crate) fn deadline_on_create(&self, key: &K, value: &V, now: u64) -> u64 {
    match self {
      ExpiryPolicy::None => 0,
      ExpiryPolicy::AfterAccess(d) | ExpiryPolicy::AfterWrite(d) => {
        now.saturating_add(duration_nanos(*d))
      }
      ExpiryPolicy::Custom(expiry) => {
        let d = expiry.expire_after_create(key, value, Duration::from_nanos(now));
        now.saturating_add(duration_nanos(d))
      }
    }
  }

  /// Deadline in epoch nanos for a value that replaced a live entry.
  /// `current_remaining` is the nanos left on the displaced entry's deadline.
  pub(crate) fn deadline_on_update(
    &self,
    key: &K,
    value: &V,
    now: u64,
    current_remaining: u64,
  ) -> u64 {
    match self {
      ExpiryPolicy::Custom(expiry) => {
        let d = expiry.expire_after_update(
          key,
          value,
          Duration::from_nanos(now),
          Duration::from_nanos(current_remaining),
        );
        now.saturating_add(duration_nanos(d))
      }
      _ => self.deadline_on_create(key, value, now),
    }
  }

  /// Applies the read-path side of the strategy to a hit entry. Only the
  /// access-sensitive modes touch the entry, which keeps reads contention
  /// free when expiry is write-based or absent.
  pub(crate) fn on_read(&self, key: &K, entry: &CacheEntry<V>, now: u64) {
    match self {
      ExpiryPolicy::None | ExpiryPolicy::AfterWrite(_) => {}
      ExpiryPolicy::AfterAccess(d) => {
        entry.touch(now);
        entry.set_expires_at(now.saturating_add(duration_nanos(*d)));
      }
      ExpiryPolicy::Custom(expiry) => {
        let d = expiry.expire_after_read(
          key,
          entry.value_ref(),
          Duration::from_nanos(now),
          Duration::from_nanos(entry.remaining(now)),
        );
        entry.touch(now);
        entry.set_expires_at(now.saturating_add(duration_nanos(d)));
      }
    }
  }
}
