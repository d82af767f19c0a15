mod common;

use robusta_cache::CacheBuilder;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_puts_and_gets_across_keys() {
  let cache = CacheBuilder::<i32, i32>::new().build().unwrap();
  let barrier = Arc::new(Barrier::new(8));

  let mut handles = Vec::new();
  for t in 0..8 {
    let cache = cache.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      for i in 0..100 {
        let key = t * 100 + i;
        cache.put(key, key);
        assert_eq!(cache.get_if_present(&key).as_deref(), Some(&key));
      }
    }));
  }
  for handle in handles {
    handle.join().unwrap();
  }

  assert_eq!(cache.entry_count(), 800);
}

#[test]
fn test_concurrent_writers_on_one_key() {
  let cache = CacheBuilder::<i32, i32>::new().build().unwrap();
  let barrier = Arc::new(Barrier::new(4));

  let mut handles = Vec::new();
  for t in 0..4 {
    let cache = cache.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      for _ in 0..500 {
        cache.put(0, t);
      }
    }));
  }
  for handle in handles {
    handle.join().unwrap();
  }

  // Exactly one entry survives, holding one of the written values.
  assert_eq!(cache.entry_count(), 1);
  let value = cache.get_if_present(&0).expect("the key should be present");
  assert!((0..4).contains(&*value));
}

#[test]
fn test_concurrent_puts_converge_under_bound() {
  let cache = CacheBuilder::<i32, i32>::new()
    .maximum_size(50)
    .tick_interval(Duration::from_millis(50))
    .build()
    .unwrap();
  let barrier = Arc::new(Barrier::new(4));

  let mut handles = Vec::new();
  for t in 0..4 {
    let cache = cache.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      for i in 0..200 {
        cache.put(t * 200 + i, i);
      }
    }));
  }
  for handle in handles {
    handle.join().unwrap();
  }

  assert!(
    common::wait_until(Duration::from_secs(2), || cache.entry_count() <= 50),
    "maintenance should bring the cache under its bound after the write burst"
  );
}
