mod common;

use robusta_cache::{CacheBuilder, Expiry, RemovalCause};

use std::thread;
use std::time::Duration;

#[test]
fn test_clean_up_evicts_least_recently_used() {
  let cache = CacheBuilder::<i32, i32>::new()
    .maximum_size(2)
    .record_stats()
    .build()
    .unwrap();

  cache.put(1, 1);
  cache.put(2, 2);
  // Reading key 1 makes key 2 the least recently used.
  assert!(cache.get_if_present(&1).is_some());
  cache.put(3, 3);

  cache.clean_up();

  assert_eq!(cache.entry_count(), 2);
  assert!(
    cache.get_if_present(&2).is_none(),
    "the least recently used key should have been evicted"
  );
  assert!(cache.get_if_present(&1).is_some());
  assert!(cache.get_if_present(&3).is_some());
  assert_eq!(cache.stats().eviction_count, 1);
}

#[test]
fn test_janitor_evicts_on_capacity() {
  let cache = CacheBuilder::<i32, i32>::new()
    .maximum_size(10)
    .tick_interval(Duration::from_millis(50))
    .build()
    .unwrap();

  for i in 0..20 {
    cache.put(i, i);
  }

  assert!(
    common::wait_until(Duration::from_secs(2), || cache.entry_count() <= 10),
    "the janitor should bring the cache back under its bound"
  );
}

#[test]
fn test_zero_maximum_size_retains_nothing() {
  let cache = CacheBuilder::<i32, i32>::new().maximum_size(0).build().unwrap();

  cache.put(1, 1);
  cache.clean_up();

  assert_eq!(cache.entry_count(), 0);
  assert!(cache.get_if_present(&1).is_none());
}

/// Short-lived scratch keys (>= 100), long-lived working set below that.
struct ScratchExpiry;

impl Expiry<i32, i32> for ScratchExpiry {
  fn expire_after_create(&self, key: &i32, _value: &i32, _now: Duration) -> Duration {
    if *key >= 100 {
      Duration::from_millis(30)
    } else {
      Duration::from_secs(3600)
    }
  }
}

#[test]
fn test_expired_leftovers_do_not_displace_live_entries() {
  let evicted = common::EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .maximum_size(5)
    .num_shards(8)
    .expire_after(ScratchExpiry)
    .eviction_listener(common::recording_listener(&evicted))
    .tick_interval(Duration::from_millis(50))
    .build()
    .unwrap();

  for key in 1..=3 {
    cache.put(key, key);
  }

  // Churn short-lived keys. Each batch is dead before the next begins, so
  // the live count never exceeds the bound even though expired leftovers
  // pile up in shards the sampled passes have not visited yet.
  for batch in 0..10 {
    cache.put(100 + 2 * batch, 0);
    cache.put(101 + 2 * batch, 0);
    thread::sleep(Duration::from_millis(60));
  }

  cache.clean_up();

  for key in 1..=3 {
    assert_eq!(
      cache.get_if_present(&key).as_deref(),
      Some(&key),
      "the long-lived working set must survive the scratch churn"
    );
  }
  let size_evictions = evicted
    .snapshot()
    .into_iter()
    .filter(|(_, _, cause)| *cause == RemovalCause::Size)
    .count();
  assert_eq!(
    size_evictions, 0,
    "nothing may be size-evicted while the live count stays under the bound"
  );
}

#[test]
fn test_invalidated_entries_free_capacity() {
  let cache = CacheBuilder::<i32, i32>::new().maximum_size(2).build().unwrap();

  cache.put(1, 1);
  cache.put(2, 2);
  cache.invalidate(&1);
  cache.put(3, 3);
  cache.clean_up();

  assert_eq!(cache.entry_count(), 2, "no eviction is needed after an invalidation");
  assert!(cache.get_if_present(&2).is_some());
  assert!(cache.get_if_present(&3).is_some());
}
