use std::fmt;
use std::sync::Arc;

/// Describes the reason an entry reached its terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
  /// The entry was manually invalidated.
  Explicit,
  /// The entry was displaced by a `put` or a completed refresh.
  Replaced,
  /// The entry was evicted to bring the cache back under its maximum size.
  Size,
  /// The entry's time-based or custom deadline elapsed.
  Expired,
}

impl RemovalCause {
  /// True for causes that count as evictions (anything the caller did not
  /// do themselves).
  pub fn was_evicted(&self) -> bool {
    matches!(self, RemovalCause::Size | RemovalCause::Expired)
  }
}

impl fmt::Display for RemovalCause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RemovalCause::Explicit => write!(f, "explicitly invalidated"),
      RemovalCause::Replaced => write!(f, "replaced by a newer value"),
      RemovalCause::Size => write!(f, "evicted due to maximum size"),
      RemovalCause::Expired => write!(f, "evicted due to expiry"),
    }
  }
}

/// Observes every terminal transition, whatever its cause.
///
/// Dispatch happens on a dedicated background thread so a slow listener
/// never blocks the operation that removed the entry. Notifications for a
/// given key are delivered in the order the removals happened.
pub trait RemovalListener<K, V>: Send + Sync {
  fn on_removal(&self, key: K, value: Arc<V>, cause: RemovalCause);
}

impl<K, V, F> RemovalListener<K, V> for F
where
  F: Fn(K, Arc<V>, RemovalCause) + Send + Sync,
{
  fn on_removal(&self, key: K, value: Arc<V>, cause: RemovalCause) {
    self(key, value, cause)
  }
}

/// Observes evictions only (`Size` and `Expired` causes).
///
/// Runs synchronously on the thread performing the eviction, typically the
/// maintenance pass, so it must be fast and non-blocking.
pub trait EvictionListener<K, V>: Send + Sync {
  fn on_eviction(&self, key: K, value: Arc<V>, cause: RemovalCause);
}

impl<K, V, F> EvictionListener<K, V> for F
where
  F: Fn(K, Arc<V>, RemovalCause) + Send + Sync,
{
  fn on_eviction(&self, key: K, value: Arc<V>, cause: RemovalCause) {
    self(key, value, cause)
  }
}
