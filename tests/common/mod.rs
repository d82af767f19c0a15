#![allow(dead_code)]

use robusta_cache::RemovalCause;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One recorded listener callback: key, value, cause.
pub type Event = (i32, i32, RemovalCause);

/// Collects listener callbacks for later inspection.
#[derive(Clone, Default)]
pub struct EventLog {
  events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, key: i32, value: i32, cause: RemovalCause) {
    self.events.lock().unwrap().push((key, value, cause));
  }

  pub fn snapshot(&self) -> Vec<Event> {
    self.events.lock().unwrap().clone()
  }

  pub fn len(&self) -> usize {
    self.events.lock().unwrap().len()
  }
}

/// A removal or eviction listener that records into `log`.
pub fn recording_listener(
  log: &EventLog,
) -> impl Fn(i32, Arc<i32>, RemovalCause) + Send + Sync + 'static {
  let log = log.clone();
  move |key, value: Arc<i32>, cause| log.push(key, *value, cause)
}

/// Polls `pred` until it holds or `timeout` elapses. Returns the final
/// verdict so callers can assert on it.
pub fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  loop {
    if pred() {
      return true;
    }
    if Instant::now() >= deadline {
      return pred();
    }
    std::thread::sleep(Duration::from_millis(5));
  }
}
