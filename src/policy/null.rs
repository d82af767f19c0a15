use super::CachePolicy;

/// The policy for unbounded caches: tracks nothing, never names victims.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NullPolicy;

impl<K: Send + Sync> CachePolicy<K> for NullPolicy {
  fn on_access(&self, _key: &K) {}

  fn on_admit(&self, _key: &K) {}

  fn on_remove(&self, _key: &K) {}

  fn pick_victims(&self, _count: u64) -> Vec<K> {
    Vec::new()
  }

  fn clear(&self) {}
}
