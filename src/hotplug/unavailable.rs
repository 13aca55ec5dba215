//! Unavailable Pool Registry
//!
//! Pools found below DEGRADED at startup are kept open here. When a later
//! scan sees one of them healthy again, its datasets are enabled on a
//! background task. Entries live until shutdown.

use crate::domain::ports::{Pool, PoolHandle};
use crate::error::Result;
use crate::hotplug::tasks::TaskSet;
use crate::metrics::AgentMetrics;
use crate::pool::vdev::VdevState;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// A pool that was unavailable at startup
#[derive(Debug)]
struct UnavailablePool {
    name: String,
    /// Held until handed to the enable task
    handle: Option<PoolHandle>,
    /// An enable task was started for this pool
    enabling: bool,
}

/// What shutdown released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryShutdown {
    /// Dataset-enable tasks joined
    pub tasks_joined: usize,
    /// Handles of pools that never became available
    pub handles_closed: usize,
}

/// Registry of pools that were unavailable at startup
#[derive(Debug)]
pub struct UnavailablePools {
    entries: Vec<UnavailablePool>,
    enumerated: bool,
    tasks: TaskSet,
}

impl UnavailablePools {
    /// Dataset-enable tasks run on `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            entries: Vec::new(),
            enumerated: false,
            tasks: TaskSet::new(runtime),
        }
    }

    /// Take ownership of an unavailable pool's handle
    pub fn track(&mut self, handle: PoolHandle) {
        info!("tracking unavailable pool '{}'", handle.name());
        self.entries.push(UnavailablePool {
            name: handle.name().to_string(),
            handle: Some(handle),
            enabling: false,
        });
    }

    /// Mark startup enumeration complete; promotion is only attempted after
    pub fn finish_enumeration(&mut self) {
        self.enumerated = true;
    }

    pub fn is_enumerated(&self) -> bool {
        self.enumerated
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of tracked pools
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Number of dataset-enable tasks started and not yet joined
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// If `pool` is a tracked pool that is usable again, enable its datasets
    /// in the background. At most one pool is promoted per call.
    pub fn promote_if_available(&mut self, pool: &dyn Pool, metrics: &AgentMetrics) -> Result<bool> {
        if !self.enumerated {
            return Ok(false);
        }

        for entry in self.entries.iter_mut() {
            if entry.enabling || entry.handle.is_none() {
                continue;
            }
            if entry.name != pool.name() {
                continue;
            }
            if pool.toplevel_state()? < VdevState::Degraded {
                continue;
            }

            let Some(handle) = entry.handle.take() else {
                continue;
            };
            let name = entry.name.clone();
            self.tasks.spawn(format!("enable-ds-{}", name), move || {
                match handle.enable_datasets() {
                    Ok(()) => info!("enabled datasets on pool '{}'", handle.name()),
                    Err(e) => warn!("enable datasets on pool '{}' failed: {}", handle.name(), e),
                }
                drop(handle);
            });

            entry.enabling = true;
            AgentMetrics::incr(&metrics.pools_promoted);
            debug!("pool '{}' promoted", name);
            return Ok(true);
        }
        Ok(false)
    }

    /// Join every enable task and close handles of pools that never came
    /// back. The registry is empty afterwards.
    pub fn shutdown(&mut self) -> RegistryShutdown {
        let tasks_joined = self.tasks.join_all();
        let mut handles_closed = 0;
        for entry in self.entries.drain(..) {
            if let Some(handle) = entry.handle {
                debug!("closing unavailable pool '{}'", entry.name);
                drop(handle);
                handles_closed += 1;
            }
        }
        RegistryShutdown {
            tasks_joined,
            handles_closed,
        }
    }
}
