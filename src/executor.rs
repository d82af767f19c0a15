use std::thread;

/// An execution context for the cache's background work.
///
/// Refresh computations are submitted here so they never run on the thread
/// that observed the stale entry. The default is [`ThreadExecutor`]; callers
/// embedded in a runtime with its own worker pool can pass an adapter
/// through `CacheBuilder::executor`.
pub trait Executor: Send + Sync {
  /// Runs a type-erased job, off the caller's thread.
  fn execute(&self, job: Box<dyn FnOnce() + Send>);
}

/// The default executor: one short-lived thread per job.
///
/// Refresh jobs are rare (at most one in flight per key) and bounded by the
/// loader's own runtime, so per-job threads are adequate without pulling in
/// a pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
  fn execute(&self, job: Box<dyn FnOnce() + Send>) {
    thread::spawn(job);
  }
}
