use robusta_cache::{Cache, CacheBuilder};

use std::thread;
use std::time::Duration;

fn new_tti_cache(tti: Duration) -> Cache<i32, i32> {
  CacheBuilder::new().expire_after_access(tti).build().unwrap()
}

#[test]
fn test_reads_keep_an_entry_alive() {
  let cache = new_tti_cache(Duration::from_millis(300));
  cache.put(1, 1);

  // Each read lands well inside the idle window and pushes it out again.
  for _ in 0..5 {
    thread::sleep(Duration::from_millis(100));
    assert!(
      cache.get_if_present(&1).is_some(),
      "a regularly read entry must stay alive past the original deadline"
    );
  }
}

#[test]
fn test_idle_entries_expire() {
  let cache = new_tti_cache(Duration::from_millis(100));
  cache.put(1, 1);
  assert!(cache.get_if_present(&1).is_some());

  thread::sleep(Duration::from_millis(300));
  assert!(
    cache.get_if_present(&1).is_none(),
    "an idle entry must expire"
  );
}

#[test]
fn test_writes_also_reset_the_idle_window() {
  let cache = new_tti_cache(Duration::from_millis(300));
  cache.put(1, 1);

  thread::sleep(Duration::from_millis(200));
  cache.put(1, 2);

  thread::sleep(Duration::from_millis(200));
  assert_eq!(
    cache.get_if_present(&1).as_deref(),
    Some(&2),
    "the replacement write should have restarted the idle clock"
  );
}
