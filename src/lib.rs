//! A high-performance, concurrent, in-process cache with loader support.
//!
//! # Features
//! - **High Concurrency**: Built with a sharded architecture to minimize lock contention.
//! - **Non-Clone Support**: Stores values in an `Arc<V>`, avoiding `V: Clone` bounds.
//! - **Bounded Size**: `maximum_size` with least-recently-used eviction.
//! - **Time-Based Expiry**: `expire_after_write`, `expire_after_access`, or a
//!   custom per-entry [`Expiry`] calculator.
//! - **Loading & Refresh**: A bound loader collapses concurrent misses into a
//!   single load, and `refresh_after_write` reloads stale entries in the
//!   background while the old value keeps being served.
//! - **Listeners & Stats**: Removal and eviction listeners with causes, and
//!   opt-in hit/miss/load/eviction counters.

// Public modules that form the API
pub mod builder;
pub mod error;
pub mod executor;
pub mod expiry;
pub mod listener;
pub mod stats;

// Internal, crate-only modules
mod cache;
mod entry;
mod loader;
mod loading;
mod policy;
mod shared;
mod store;
mod task;
mod time;

// Re-export the primary user-facing types for convenience
pub use builder::CacheBuilder;
pub use cache::Cache;
pub use error::ConfigError;
pub use executor::{Executor, ThreadExecutor};
pub use expiry::Expiry;
pub use listener::{EvictionListener, RemovalCause, RemovalListener};
pub use loading::LoadingCache;
pub use stats::CacheStats;
