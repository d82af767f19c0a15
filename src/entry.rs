use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of an entry in the store.
///
/// Entries are created ALIVE, may be marked PENDING_REMOVAL by the size
/// policy ahead of a maintenance pass, and end REMOVED. The transition to
/// REMOVED is claimed with a CAS so the terminal notification for an entry
/// fires exactly once no matter which path removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum EntryState {
  Alive = 0,
  PendingRemoval = 1,
  Removed = 2,
}

/// A container for a value in the cache, holding all necessary metadata.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  /// The user's value, wrapped in an Arc for shared ownership.
  value: Arc<V>,
  /// Nanoseconds since the cache epoch at which this entry was written.
  /// Writes replace the whole entry, so this never changes after creation.
  pub(crate) write_at: u64,
  /// The last access timestamp in nanoseconds. Only maintained on reads
  /// when an access-sensitive expiry mode is configured.
  pub(crate) accessed_at: AtomicU64,
  /// The expiration deadline in nanoseconds. 0 means no expiry.
  pub(crate) expires_at: AtomicU64,
  state: AtomicU8,
}

impl<V> CacheEntry<V> {
  /// Creates a new ALIVE entry written at `now` with the given deadline
  /// (0 for none).
  pub(crate) fn new(value: V, now: u64, expires_at: u64) -> Self {
    Self {
      value: Arc::new(value),
      write_at: now,
      accessed_at: AtomicU64::new(now),
      expires_at: AtomicU64::new(expires_at),
      state: AtomicU8::new(EntryState::Alive as u8),
    }
  }

  /// Returns a clone of the `Arc` containing the value.
  #[inline]
  pub(crate) fn value(&self) -> Arc<V> {
    self.value.clone()
  }

  #[inline]
  pub(crate) fn value_ref(&self) -> &V {
    &self.value
  }

  /// Updates the last accessed timestamp. A cheap atomic store.
  #[inline]
  pub(crate) fn touch(&self, now: u64) {
    self.accessed_at.store(now, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn set_expires_at(&self, deadline: u64) {
    self.expires_at.store(deadline, Ordering::Relaxed);
  }

  /// Nanoseconds until the deadline, saturating at zero. Returns 0 when no
  /// deadline is set, which only custom expiry callers care about.
  #[inline]
  pub(crate) fn remaining(&self, now: u64) -> u64 {
    self.expires_at.load(Ordering::Relaxed).saturating_sub(now)
  }

  /// The logical-visibility predicate: an entry is only served while it is
  /// ALIVE and its deadline (if any) has not elapsed. Eligible-but-unpurged
  /// entries read as absent even though physical removal is deferred.
  #[inline]
  pub(crate) fn is_valid(&self, now: u64) -> bool {
    if self.state.load(Ordering::Acquire) != EntryState::Alive as u8 {
      return false;
    }
    let expires_at = self.expires_at.load(Ordering::Relaxed);
    expires_at == 0 || now < expires_at
  }

  /// True once the entry's deadline has elapsed, regardless of state.
  #[inline]
  pub(crate) fn is_expired(&self, now: u64) -> bool {
    let expires_at = self.expires_at.load(Ordering::Relaxed);
    expires_at != 0 && now >= expires_at
  }

  /// Marks the entry as selected for size eviction. Reads treat it as
  /// absent from this point on; physical removal follows in the same
  /// maintenance pass.
  pub(crate) fn mark_pending_removal(&self) {
    let _ = self.state.compare_exchange(
      EntryState::Alive as u8,
      EntryState::PendingRemoval as u8,
      Ordering::AcqRel,
      Ordering::Acquire,
    );
  }

  /// Attempts to claim the terminal transition to REMOVED. Exactly one
  /// caller wins; only the winner may emit notifications for this entry.
  pub(crate) fn try_claim_removal(&self) -> bool {
    loop {
      let current = self.state.load(Ordering::Acquire);
      if current == EntryState::Removed as u8 {
        return false;
      }
      if self
        .state
        .compare_exchange(
          current,
          EntryState::Removed as u8,
          Ordering::AcqRel,
          Ordering::Acquire,
        )
        .is_ok()
      {
        return true;
      }
    }
  }

  pub(crate) fn state(&self) -> EntryState {
    match self.state.load(Ordering::Acquire) {
      0 => EntryState::Alive,
      1 => EntryState::PendingRemoval,
      _ => EntryState::Removed,
    }
  }
}
