//! Shared worker pool for metric computation.
//!
//! One [`WorkerPool`] lives for the whole run and is shared (behind an `Arc`)
//! by every metric call. The underlying threads are joined when the last
//! handle is dropped.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// A fixed-size thread pool exposing a parallel `map`.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Create a pool with `n_jobs` worker threads.
    pub fn new(n_jobs: usize) -> Result<Self> {
        if n_jobs == 0 {
            bail!("Worker pool needs at least one thread");
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_jobs)
            .thread_name(|i| format!("organ-metrics-{i}"))
            .build()
            .context("Failed to build metric worker pool")?;
        tracing::debug!(n_jobs, "Created metric worker pool");
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn n_jobs(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every item on the pool, preserving input order.
    pub fn map<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Send + Sync,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Like [`WorkerPool::map`] but stops at the first error.
    pub fn try_map<T, U, F>(&self, items: &[T], f: F) -> Result<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> Result<U> + Send + Sync,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("n_jobs", &self.n_jobs())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        tracing::debug!(n_jobs = self.n_jobs(), "Shutting down metric worker pool");
    }
}
