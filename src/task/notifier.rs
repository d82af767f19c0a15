use crate::listener::{EvictionListener, RemovalCause, RemovalListener};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

/// A message queued for the removal listener.
pub(crate) type Notification<K, V> = (K, Arc<V>, RemovalCause);

/// The background thread that calls the user's removal listener.
///
/// A single consumer draining a FIFO channel gives per-key causal ordering
/// for free: a REPLACED for key K queued before an EXPIRED for K is
/// delivered first. The channel is unbounded so the triggering operation
/// never blocks and no terminal notification is dropped.
pub(crate) struct Notifier {
  _handle: JoinHandle<()>,
}

impl Notifier {
  /// Spawns the dispatch thread. The thread exits once every `Sender`
  /// clone has been dropped, which happens when the cache is dropped.
  pub(crate) fn spawn<K, V>(
    listener: Arc<dyn RemovalListener<K, V>>,
  ) -> (Self, Sender<Notification<K, V>>)
  where
    K: Send + 'static,
    V: Send + Sync + 'static,
  {
    let (tx, rx): (Sender<Notification<K, V>>, Receiver<Notification<K, V>>) =
      crossbeam_channel::unbounded();

    let handle = thread::spawn(move || {
      while let Ok((key, value, cause)) = rx.recv() {
        let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_removal(key, value, cause)));
        if outcome.is_err() {
          log::warn!("removal listener panicked for cause {cause}; ignoring");
        }
      }
    });

    (Self { _handle: handle }, tx)
  }
}

/// Routes one terminal transition to the configured listeners. The caller
/// must have claimed the entry's removal first, so this fires at most once
/// per entry.
///
/// The eviction listener runs synchronously right here, on the evicting
/// thread; the removal listener is queued for the notifier thread.
pub(crate) fn deliver<K, V>(
  removal_tx: Option<&Sender<Notification<K, V>>>,
  eviction_listener: Option<&Arc<dyn EvictionListener<K, V>>>,
  key: K,
  value: Arc<V>,
  cause: RemovalCause,
) where
  K: Clone,
{
  if cause.was_evicted() {
    if let Some(listener) = eviction_listener {
      let outcome =
        catch_unwind(AssertUnwindSafe(|| {
          listener.on_eviction(key.clone(), value.clone(), cause)
        }));
      if outcome.is_err() {
        log::warn!("eviction listener panicked for cause {cause}; ignoring");
      }
    }
  }
  if let Some(tx) = removal_tx {
    let _ = tx.send((key, value, cause));
  }
}
