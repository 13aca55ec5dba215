//! Supervised Task Set
//!
//! Owns the join handles of background tasks so that shutdown can wait for
//! every one of them. Task bodies call into the pool layer, which blocks, so
//! they run on the runtime's blocking pool.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A collection of named, joinable blocking tasks
#[derive(Debug)]
pub struct TaskSet {
    runtime: Handle,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl TaskSet {
    /// Tasks are spawned on `runtime`'s blocking pool
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Vec::new(),
        }
    }

    /// Run `f` in the background and track it
    pub fn spawn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let handle = self.runtime.spawn_blocking(f);
        debug!("spawned task {}", name);
        self.tasks.push((name, handle));
    }

    /// Number of tracked tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Block until every tracked task has finished, then forget them.
    /// Returns how many were joined.
    ///
    /// Must not be called from inside an async task; wrap it in
    /// `block_in_place` there.
    pub fn join_all(&mut self) -> usize {
        if self.tasks.is_empty() {
            return 0;
        }

        let tasks: Vec<_> = self.tasks.drain(..).collect();
        let count = tasks.len();
        self.runtime.block_on(async move {
            for (name, handle) in tasks {
                match handle.await {
                    Ok(()) => debug!("task {} finished", name),
                    Err(e) if e.is_panic() => error!("task {} panicked", name),
                    Err(e) => error!("task {} did not complete: {}", name, e),
                }
            }
        });
        count
    }
}

/// Multi-threaded runtime for tests that drive a [`TaskSet`] from plain
/// test threads
#[cfg(test)]
pub(crate) fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
}
