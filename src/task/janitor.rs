use crate::entry::{CacheEntry, EntryState};
use crate::listener::{EvictionListener, RemovalCause};
use crate::policy::CachePolicy;
use crate::stats::StatsRecorder;
use crate::store::ShardedStore;
use crate::task::notifier::{deliver, Notification};
use crate::time;

use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rand::Rng;

/// The number of entries sampled from a shard on a periodic tick.
const TICK_EXPIRE_SAMPLE_SIZE: usize = 10;

/// The number of random shards checked on each periodic tick.
const TICK_SHARD_CHECKS: usize = 2;

/// The thread-safe parts of the cache a maintenance pass needs.
pub(crate) struct MaintenanceContext<K: Send, V: Send + Sync, H> {
  pub(crate) store: Arc<ShardedStore<K, V, H>>,
  pub(crate) stats: Arc<StatsRecorder>,
  pub(crate) policy: Arc<dyn CachePolicy<K>>,
  pub(crate) maximum_size: Option<u64>,
  pub(crate) removal_tx: Option<Sender<Notification<K, V>>>,
  pub(crate) eviction_listener: Option<Arc<dyn EvictionListener<K, V>>>,
  /// Serializes maintenance passes. `clean_up` blocks on it; periodic and
  /// amortized passes skip their turn if it is contended.
  pub(crate) maintenance_lock: Arc<Mutex<()>>,
}

/// The background thread for periodic cleanup of the cache.
pub(crate) struct Janitor {
  stop_flag: Arc<AtomicBool>,
  _handle: JoinHandle<()>,
}

impl Janitor {
  /// Spawns the janitor thread, ticking at `tick_interval`.
  pub(crate) fn spawn<K, V, H>(
    context: MaintenanceContext<K, V, H>,
    tick_interval: Duration,
  ) -> Self
  where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
    H: BuildHasher + Clone + Send + Sync + 'static,
  {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_clone = stop_flag.clone();

    let handle = thread::spawn(move || {
      while !stop_clone.load(Ordering::Relaxed) {
        let tick_start = std::time::Instant::now();

        run_maintenance(&context, false);

        // Sleep for whatever is left of the tick interval.
        if let Some(remaining) = tick_interval.checked_sub(tick_start.elapsed()) {
          thread::sleep(remaining);
        }
      }
    });

    Self {
      stop_flag,
      _handle: handle,
    }
  }

  /// Signals the janitor thread to stop after its current tick.
  pub(crate) fn stop(self) {
    self.stop_flag.store(true, Ordering::Relaxed);
  }
}

/// One maintenance pass: purge entries that are no longer servable, then
/// bring the cache back under its maximum size.
///
/// The exhaustive form (backing `clean_up`) scans every shard fully and
/// waits for the maintenance lock. The amortized form, used by the janitor
/// tick and the opportunistic write-path trigger, samples a couple of
/// random shards and gives up immediately if another pass is running.
pub(crate) fn run_maintenance<K, V, H>(context: &MaintenanceContext<K, V, H>, exhaustive: bool)
where
  K: Eq + Hash + Clone + Send + Sync,
  V: Send + Sync,
  H: BuildHasher + Clone,
{
  let _guard = if exhaustive {
    context.maintenance_lock.lock()
  } else {
    match context.maintenance_lock.try_lock() {
      Some(guard) => guard,
      None => return,
    }
  };

  let num_shards = context.store.shards.len();
  if exhaustive {
    for index in 0..num_shards {
      sweep_shard(context, index, None);
    }
  } else {
    let mut rng = rand::rng();
    for _ in 0..TICK_SHARD_CHECKS.min(num_shards) {
      let index = rng.random_range(0..num_shards);
      sweep_shard(context, index, Some(TICK_EXPIRE_SAMPLE_SIZE));
    }
  }

  enforce_capacity(context);
}

/// Physically removes no-longer-servable entries from one shard and fires
/// their notifications. `limit` bounds how many entries are inspected so
/// the amortized passes stay cheap.
fn sweep_shard<K, V, H>(
  context: &MaintenanceContext<K, V, H>,
  shard_index: usize,
  limit: Option<usize>,
) where
  K: Eq + Hash + Clone + Send + Sync,
  V: Send + Sync,
  H: BuildHasher + Clone,
{
  let now = time::now_nanos();
  let shard = &context.store.shards[shard_index];

  // Claim victims under the lock, notify after releasing it. The eviction
  // listener may re-enter the cache, so it must never run while a shard
  // guard is held.
  let mut claimed: Vec<(K, Arc<CacheEntry<V>>, RemovalCause)> = Vec::new();
  {
    let mut guard = shard.write();
    match limit {
      None => {
        guard.retain(|key, entry| {
          if entry.is_valid(now) {
            return true;
          }
          context.policy.on_remove(key);
          let was_pending = entry.state() == EntryState::PendingRemoval;
          if entry.try_claim_removal() {
            let cause = if was_pending {
              RemovalCause::Size
            } else {
              RemovalCause::Expired
            };
            claimed.push((key.clone(), entry.clone(), cause));
          }
          false
        });
      }
      Some(limit) => {
        let victims: Vec<K> = guard
          .iter()
          .take(limit)
          .filter(|(_, entry)| !entry.is_valid(now))
          .map(|(key, _)| key.clone())
          .collect();

        for key in victims {
          if let Some(entry) = guard.remove(&key) {
            context.policy.on_remove(&key);
            let was_pending = entry.state() == EntryState::PendingRemoval;
            if entry.try_claim_removal() {
              let cause = if was_pending {
                RemovalCause::Size
              } else {
                RemovalCause::Expired
              };
              claimed.push((key, entry, cause));
            }
          }
        }
      }
    }
  }

  for (key, entry, cause) in claimed {
    context.stats.record_eviction();
    deliver(
      context.removal_tx.as_ref(),
      context.eviction_listener.as_ref(),
      key,
      entry.value(),
      cause,
    );
  }
}

/// Evicts least-recently-used entries until the live count is back under
/// `maximum_size`. Victims are first marked PENDING_REMOVAL, which makes
/// them invisible to readers, then purged and notified.
fn enforce_capacity<K, V, H>(context: &MaintenanceContext<K, V, H>)
where
  K: Eq + Hash + Clone + Send + Sync,
  V: Send + Sync,
  H: BuildHasher + Clone,
{
  let Some(maximum_size) = context.maximum_size else {
    return;
  };

  loop {
    let now = time::now_nanos();
    // Only servable entries count against the bound. Expired leftovers a
    // sampled pass has not purged yet must not push live entries out.
    let live = context.store.live_len(now);
    if live <= maximum_size {
      return;
    }

    let victims = context.policy.pick_victims(live - maximum_size);
    if victims.is_empty() {
      // The policy has nothing left to offer; entries it never tracked
      // (if any) will be reconsidered on their next admit.
      return;
    }

    for key in &victims {
      if let Some(entry) = context.store.shard_for(key).read().get(key) {
        entry.mark_pending_removal();
      }
    }

    for key in victims {
      let removed = context.store.shard_for(&key).write().remove(&key);
      if let Some(entry) = removed {
        if entry.try_claim_removal() {
          // The policy can hand back a key whose deadline has already
          // elapsed; that removal is an expiry, not a size eviction.
          let cause = if entry.is_expired(now) {
            RemovalCause::Expired
          } else {
            RemovalCause::Size
          };
          context.stats.record_eviction();
          deliver(
            context.removal_tx.as_ref(),
            context.eviction_listener.as_ref(),
            key,
            entry.value(),
            cause,
          );
        }
      }
    }
  }
}
