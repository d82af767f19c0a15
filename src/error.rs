use std::fmt;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  /// More than one of `expire_after_access`, `expire_after_write` and
  /// `expire_after` was configured. At most one expiry strategy may be
  /// active on a cache.
  ExpiryConflict,
  /// `refresh_after_write` was configured on a cache built without a bound
  /// loader. Refresh needs a loader to recompute values; use `build_with`.
  RefreshRequiresLoader,
  /// The cache was configured with zero shards, which is not allowed.
  ZeroShards,
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::ExpiryConflict => write!(
        f,
        "at most one of expire_after_access, expire_after_write and expire_after may be set"
      ),
      ConfigError::RefreshRequiresLoader => write!(
        f,
        "refresh_after_write requires a bound loader; build the cache with build_with"
      ),
      ConfigError::ZeroShards => write!(f, "shard count cannot be zero"),
    }
  }
}

impl std::error::Error for ConfigError {}
