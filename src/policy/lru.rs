use super::CachePolicy;

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use parking_lot::Mutex;

/// Tracks recency and evicts the least recently used entries.
///
/// Every entry counts as one unit against the maximum size. The order queue
/// keeps the most recently used key at the front.
#[derive(Debug)]
pub(crate) struct LruPolicy<K> {
  order: Mutex<VecDeque<K>>,
  members: Mutex<HashSet<K>>,
}

impl<K> LruPolicy<K> {
  pub(crate) fn new() -> Self {
    Self {
      order: Mutex::new(VecDeque::new()),
      members: Mutex::new(HashSet::new()),
    }
  }
}

impl<K> CachePolicy<K> for LruPolicy<K>
where
  K: Eq + Hash + Clone + Send + Sync,
{
  /// Move an accessed key to the front of the usage queue.
  fn on_access(&self, key: &K) {
    let mut order = self.order.lock();
    if let Some(pos) = order.iter().position(|k| k == key) {
      if let Some(key) = order.remove(pos) {
        order.push_front(key);
      }
    }
  }

  /// A written key is the most recently used.
  fn on_admit(&self, key: &K) {
    let mut order = self.order.lock();
    let mut members = self.members.lock();

    if members.insert(key.clone()) {
      order.push_front(key.clone());
    } else if let Some(pos) = order.iter().position(|k| k == key) {
      if let Some(key) = order.remove(pos) {
        order.push_front(key);
      }
    }
  }

  fn on_remove(&self, key: &K) {
    let mut order = self.order.lock();
    let mut members = self.members.lock();

    if members.remove(key) {
      order.retain(|k| k != key);
    }
  }

  fn pick_victims(&self, count: u64) -> Vec<K> {
    let mut order = self.order.lock();
    let mut members = self.members.lock();

    let mut victims = Vec::new();
    while (victims.len() as u64) < count {
      match order.pop_back() {
        Some(key) => {
          members.remove(&key);
          victims.push(key);
        }
        None => break,
      }
    }
    victims
  }

  fn clear(&self) {
    self.order.lock().clear();
    self.members.lock().clear();
  }
}
