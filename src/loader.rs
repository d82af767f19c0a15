use crate::stats::StatsRecorder;

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::Instant;

use parking_lot::Mutex;

/// A loader computes the value for a missing key, or `None` for absent.
/// Absent results are returned to the caller but never stored.
pub(crate) type LoaderFn<K, V> = Arc<dyn Fn(&K) -> Option<V> + Send + Sync>;

/// The state of a value being computed.
enum State<V> {
  Computing,
  Complete(Option<Arc<V>>),
}

struct Inner<V> {
  state: State<V>,
  waiters: VecDeque<Thread>,
}

/// A one-shot cell shared by every caller interested in the same in-flight
/// load. The leader completes it; waiters park until then. This is what
/// collapses concurrent misses for one key into a single loader invocation.
pub(crate) struct LoadFuture<V> {
  inner: Mutex<Inner<V>>,
}

impl<V> LoadFuture<V> {
  pub(crate) fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        state: State::Computing,
        waiters: VecDeque::new(),
      }),
    }
  }

  /// Completes the load, waking all parked waiters.
  pub(crate) fn complete(&self, value: Option<Arc<V>>) {
    let mut inner = self.inner.lock();
    inner.state = State::Complete(value);
    for waiter in inner.waiters.drain(..) {
      waiter.unpark();
    }
  }

  /// Blocks the current thread until the leader completes the load.
  pub(crate) fn wait(&self) -> Option<Arc<V>> {
    let mut inner = self.inner.lock();
    loop {
      match &inner.state {
        State::Complete(value) => return value.clone(),
        State::Computing => {
          inner.waiters.push_back(thread::current());
          // Unlock before parking; `complete` takes the same lock.
          drop(inner);
          thread::park();
          inner = self.inner.lock();
        }
      }
    }
  }
}

/// Invokes a loader at the cache boundary: panics are caught and treated as
/// an absent result, and the invocation is timed and recorded whether it
/// succeeded or not.
pub(crate) fn run_loader<K, V, F>(loader: &F, key: &K, stats: &StatsRecorder) -> Option<V>
where
  F: Fn(&K) -> Option<V> + ?Sized,
{
  let started = Instant::now();
  let result = match catch_unwind(AssertUnwindSafe(|| loader(key))) {
    Ok(value) => value,
    Err(_) => {
      log::warn!("cache loader panicked; treating the load as failed");
      None
    }
  };
  stats.record_load(started.elapsed(), result.is_some());
  result
}
