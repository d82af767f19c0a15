pub(crate) mod lru;
pub(crate) mod null;

/// The seam for size-based eviction policies.
///
/// The policy tracks usage order and, when the cache is over its maximum
/// size, names the victims a maintenance pass should remove. It never
/// touches the store itself.
pub(crate) trait CachePolicy<K>: Send + Sync {
  /// Called when an entry is read.
  fn on_access(&self, key: &K);

  /// Called when an entry is inserted or replaced.
  fn on_admit(&self, key: &K);

  /// Called when an entry leaves the store for any reason.
  fn on_remove(&self, key: &K);

  /// Selects up to `count` victims in eviction order and stops tracking
  /// them. The maintenance pass performs the physical removal; keys that
  /// have concurrently vanished from the store are simply skipped there.
  fn pick_victims(&self, count: u64) -> Vec<K>;

  /// Drops all tracked state.
  fn clear(&self);
}
