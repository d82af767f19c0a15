mod common;

use common::{recording_listener, wait_until, EventLog};
use robusta_cache::{Cache, CacheBuilder, RemovalCause};

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const DELIVERY_WAIT: Duration = Duration::from_secs(2);

#[test]
fn test_replaced_and_explicit_causes_in_order() {
  let log = EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .removal_listener(recording_listener(&log))
    .build()
    .unwrap();

  cache.put(1, 10);
  cache.put(1, 11);
  cache.invalidate(&1);

  assert!(wait_until(DELIVERY_WAIT, || log.len() == 2));
  assert_eq!(
    log.snapshot(),
    vec![
      (1, 10, RemovalCause::Replaced),
      (1, 11, RemovalCause::Explicit),
    ],
    "notifications for one key must arrive in removal order"
  );
}

#[test]
fn test_replaced_observed_before_a_later_expired() {
  let log = EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .expire_after_write(Duration::from_millis(50))
    .removal_listener(recording_listener(&log))
    .build()
    .unwrap();

  cache.put(1, 10);
  cache.put(1, 11);
  thread::sleep(Duration::from_millis(150));
  cache.clean_up();

  assert!(wait_until(DELIVERY_WAIT, || log.len() == 2));
  assert_eq!(
    log.snapshot(),
    vec![
      (1, 10, RemovalCause::Replaced),
      (1, 11, RemovalCause::Expired),
    ],
    "the replacement must be observed before the later expiry of the same key"
  );
}

#[test]
fn test_expired_cause() {
  let log = EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .expire_after_write(Duration::from_millis(50))
    .removal_listener(recording_listener(&log))
    .build()
    .unwrap();

  cache.put(1, 10);
  thread::sleep(Duration::from_millis(150));
  cache.clean_up();

  assert!(wait_until(DELIVERY_WAIT, || log.len() == 1));
  assert_eq!(log.snapshot(), vec![(1, 10, RemovalCause::Expired)]);
}

#[test]
fn test_size_cause() {
  let log = EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .maximum_size(1)
    .removal_listener(recording_listener(&log))
    .build()
    .unwrap();

  cache.put(1, 10);
  cache.put(2, 20);
  cache.clean_up();

  assert!(wait_until(DELIVERY_WAIT, || log.len() == 1));
  assert_eq!(log.snapshot(), vec![(1, 10, RemovalCause::Size)]);
}

#[test]
fn test_put_over_expired_entry_reports_expired() {
  let log = EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .expire_after_write(Duration::from_millis(50))
    .removal_listener(recording_listener(&log))
    .build()
    .unwrap();

  cache.put(1, 10);
  thread::sleep(Duration::from_millis(150));
  // The displaced entry was already past its deadline, so this is an
  // expiry, not a replacement.
  cache.put(1, 11);

  assert!(wait_until(DELIVERY_WAIT, || log.len() == 1));
  assert_eq!(log.snapshot(), vec![(1, 10, RemovalCause::Expired)]);
}

#[test]
fn test_invalidate_of_expired_entry_reports_expired() {
  let log = EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .expire_after_write(Duration::from_millis(50))
    .removal_listener(recording_listener(&log))
    .build()
    .unwrap();

  cache.put(1, 10);
  thread::sleep(Duration::from_millis(150));

  assert!(
    !cache.invalidate(&1),
    "invalidating an expired leftover reports absent"
  );
  assert!(wait_until(DELIVERY_WAIT, || log.len() == 1));
  assert_eq!(log.snapshot(), vec![(1, 10, RemovalCause::Expired)]);
}

#[test]
fn test_eviction_listener_only_sees_evictions() {
  let evicted = EventLog::new();
  let removed = EventLog::new();
  let cache = CacheBuilder::<i32, i32>::new()
    .maximum_size(1)
    .removal_listener(recording_listener(&removed))
    .eviction_listener(recording_listener(&evicted))
    .build()
    .unwrap();

  cache.put(1, 10);
  cache.put(1, 11); // Replaced
  cache.put(2, 20);
  cache.clean_up(); // Size eviction of key 1
  cache.invalidate(&2); // Explicit

  // The eviction listener runs synchronously, so clean_up has already
  // delivered its one event.
  assert_eq!(evicted.snapshot(), vec![(1, 11, RemovalCause::Size)]);

  assert!(wait_until(DELIVERY_WAIT, || removed.len() == 3));
  let causes: Vec<_> = removed.snapshot().into_iter().map(|(_, _, c)| c).collect();
  assert_eq!(
    causes,
    vec![
      RemovalCause::Replaced,
      RemovalCause::Size,
      RemovalCause::Explicit,
    ]
  );
}

#[test]
fn test_eviction_listener_may_reenter_the_cache() {
  let slot: Arc<Mutex<Option<Cache<i32, i32>>>> = Arc::new(Mutex::new(None));
  let listener_slot = slot.clone();
  let reentrant_reads = Arc::new(Mutex::new(Vec::new()));
  let listener_reads = reentrant_reads.clone();

  let cache = CacheBuilder::<i32, i32>::new()
    .num_shards(1)
    .expire_after_write(Duration::from_millis(50))
    .eviction_listener(move |key: i32, _value: Arc<i32>, _cause: RemovalCause| {
      // Reads back through the cache from inside the callback; with a
      // single shard this touches the lock the sweep just worked under.
      if let Some(cache) = listener_slot.lock().unwrap().as_ref() {
        listener_reads
          .lock()
          .unwrap()
          .push((key, cache.get_if_present(&key).is_none()));
      }
    })
    .build()
    .unwrap();
  *slot.lock().unwrap() = Some(cache.clone());

  cache.put(1, 10);
  thread::sleep(Duration::from_millis(150));
  cache.clean_up();

  assert_eq!(
    reentrant_reads.lock().unwrap().as_slice(),
    &[(1, true)],
    "the listener ran, read the cache, and saw the entry gone"
  );
}

#[test]
fn test_panicking_listener_does_not_poison_the_cache() {
  let log = EventLog::new();
  let inner = log.clone();
  let cache = CacheBuilder::<i32, i32>::new()
    .removal_listener(move |key: i32, value: Arc<i32>, cause| {
      inner.push(key, *value, cause);
      panic!("listener failure");
    })
    .build()
    .unwrap();

  cache.put(1, 10);
  cache.invalidate(&1);
  cache.put(2, 20);
  cache.invalidate(&2);

  // Both notifications are still attempted, and the cache keeps working.
  assert!(wait_until(DELIVERY_WAIT, || log.len() == 2));
  cache.put(3, 30);
  assert_eq!(cache.get_if_present(&3).as_deref(), Some(&30));
}
