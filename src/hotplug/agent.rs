//! Hotplug Agent
//!
//! The single entry point the event transport calls into. Every delivery
//! runs from classification to reconciliation under one lock, so label and
//! replace sequences never interleave. Under bursty arrivals events queue on
//! that lock.
//!
//! # Lifecycle
//!
//! 1. [`HotplugAgent::init`] checks the pool manager and starts the
//!    enumeration task that records pools unavailable at startup.
//!    Background tasks run on the blocking pool of the runtime passed in.
//! 2. [`HotplugAgent::deliver`] handles one event at a time.
//! 3. [`HotplugAgent::shutdown`] joins every background task, closes
//!    tracked pools and drops outstanding label requests.

use crate::domain::ports::{ByPathResolver, DeviceResolverRef, PoolManagerRef};
use crate::error::{Error, Result};
use crate::hotplug::classifier::{classify, EventKind};
use crate::hotplug::event::{DeviceAdded, DeviceLifecycle, EventPayload, VdevCheck};
use crate::hotplug::matcher::MatchCriteria;
use crate::hotplug::pending::PendingLabels;
use crate::hotplug::reconciler::{self, AddOutcome, ExpandOutcome, Reconciler};
use crate::hotplug::scanner::{self, PoolScanner};
use crate::hotplug::tasks::TaskSet;
use crate::hotplug::unavailable::UnavailablePools;
use crate::hotplug::DEV_BYPATH_PATH;
use crate::metrics::AgentMetrics;
use crate::pool::vdev::{VdevProperty, VdevState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Directory of by-path symlinks used to resolve physical paths
    pub by_path_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            by_path_dir: PathBuf::from(DEV_BYPATH_PATH),
        }
    }
}

// =============================================================================
// Delivery Results
// =============================================================================

/// What a handler did with a recognized event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Add(AddOutcome),
    Expand(ExpandOutcome),
}

/// Result of one [`HotplugAgent::deliver`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Unrecognized class/subclass; nothing was touched
    Ignored,
    /// Recognized, but the payload was unusable
    Malformed { kind: EventKind, reason: String },
    /// Handled; `outcome` is `None` when no vdev matched
    Handled {
        kind: EventKind,
        outcome: Option<Outcome>,
    },
}

impl Delivery {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Delivery::Ignored)
    }
}

/// What shutdown released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    /// Background tasks joined, including startup enumeration
    pub tasks_joined: usize,
    /// Handles of pools that never became available
    pub handles_closed: usize,
    /// Label requests whose partition never appeared
    pub pending_discarded: usize,
}

// =============================================================================
// Agent
// =============================================================================

#[derive(Debug)]
struct AgentState {
    pending: PendingLabels,
    unavailable: UnavailablePools,
}

struct AgentInner {
    manager: PoolManagerRef,
    resolver: DeviceResolverRef,
    state: Mutex<AgentState>,
    metrics: Arc<AgentMetrics>,
}

/// Device hotplug agent
pub struct HotplugAgent {
    inner: Arc<AgentInner>,
    enumeration: Mutex<TaskSet>,
    /// Enumeration tasks joined so far
    enumeration_joined: AtomicUsize,
}

impl HotplugAgent {
    /// Start the agent, resolving physical paths under `config.by_path_dir`
    pub fn init(manager: PoolManagerRef, config: AgentConfig, runtime: Handle) -> Result<Self> {
        let resolver: DeviceResolverRef = Arc::new(ByPathResolver::new(config.by_path_dir));
        Self::with_resolver(manager, resolver, runtime)
    }

    /// Start the agent with an explicit device resolver
    pub fn with_resolver(
        manager: PoolManagerRef,
        resolver: DeviceResolverRef,
        runtime: Handle,
    ) -> Result<Self> {
        manager
            .pool_names()
            .map_err(|e| Error::Initialization(format!("pool manager unavailable: {}", e)))?;

        let inner = Arc::new(AgentInner {
            manager,
            resolver,
            state: Mutex::new(AgentState {
                pending: PendingLabels::new(),
                unavailable: UnavailablePools::new(runtime.clone()),
            }),
            metrics: Arc::new(AgentMetrics::new()),
        });

        let mut enumeration = TaskSet::new(runtime);
        let worker = Arc::clone(&inner);
        enumeration.spawn("pool-enum", move || worker.enumerate());

        info!("hotplug agent started");
        Ok(Self {
            inner,
            enumeration: Mutex::new(enumeration),
            enumeration_joined: AtomicUsize::new(0),
        })
    }

    /// Handle one event. Never fails the caller; problems are logged and
    /// reported in the returned [`Delivery`].
    pub fn deliver(&self, class: &str, subclass: &str, payload: &EventPayload) -> Delivery {
        let inner = &*self.inner;
        let mut state = inner.state.lock();
        let _in_flight = inner.metrics.enter();
        AgentMetrics::incr(&inner.metrics.events_received);

        let Some(kind) = classify(class, subclass) else {
            AgentMetrics::incr(&inner.metrics.events_ignored);
            debug!("ignoring {}.{}", class, subclass);
            return Delivery::Ignored;
        };

        let AgentState {
            pending,
            unavailable,
        } = &mut *state;

        let outcome = match kind {
            EventKind::DeviceAdded { loopback } => DeviceAdded::from_payload(payload, loopback)
                .map(|event| inner.deliver_add(&event, pending, unavailable).map(Outcome::Add)),
            EventKind::VdevCheck => VdevCheck::from_payload(payload)
                .map(|check| inner.deliver_check(check, pending, unavailable).map(Outcome::Add)),
            EventKind::DeviceLifecycle => DeviceLifecycle::from_payload(payload)
                .map(|dle| inner.deliver_dle(&dle).map(Outcome::Expand)),
        };

        match outcome {
            Ok(outcome) => Delivery::Handled { kind, outcome },
            Err(e) => {
                AgentMetrics::incr(&inner.metrics.events_malformed);
                warn!("{} event rejected: {}", kind, e);
                Delivery::Malformed {
                    kind,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Block until startup enumeration has finished. Not for use inside an
    /// async task.
    pub fn wait_for_enumeration(&self) {
        let joined = self.enumeration.lock().join_all();
        self.enumeration_joined.fetch_add(joined, Ordering::AcqRel);
    }

    /// Startup enumeration has completed
    pub fn is_enumerated(&self) -> bool {
        self.inner.state.lock().unavailable.is_enumerated()
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<AgentMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Physical paths with an outstanding label request
    pub fn pending_labels(&self) -> Vec<String> {
        self.inner.state.lock().pending.phys_paths()
    }

    /// Pools that were unavailable at startup
    pub fn unavailable_pools(&self) -> Vec<String> {
        self.inner.state.lock().unavailable.names()
    }

    /// Join every background task and release everything the agent holds.
    /// Blocks for as long as the slowest task takes, so async callers run it
    /// under `block_in_place`.
    pub fn shutdown(self) -> ShutdownSummary {
        self.wait_for_enumeration();
        let enumerated = self.enumeration_joined.load(Ordering::Acquire);

        let mut state = self.inner.state.lock();
        let registry = state.unavailable.shutdown();
        let discarded = state.pending.drain();
        if !discarded.is_empty() {
            info!("discarding {} pending label request(s)", discarded.len());
        }

        let summary = ShutdownSummary {
            tasks_joined: enumerated + registry.tasks_joined,
            handles_closed: registry.handles_closed,
            pending_discarded: discarded.len(),
        };
        info!(
            "hotplug agent stopped: {} task(s) joined, {} pool handle(s) closed",
            summary.tasks_joined, summary.handles_closed
        );
        summary
    }
}

impl std::fmt::Debug for HotplugAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotplugAgent")
            .field("metrics", &self.inner.metrics.snapshot())
            .finish()
    }
}

impl AgentInner {
    /// Record every pool below DEGRADED. Marking enumeration done is the
    /// last thing this task does, under the delivery lock.
    fn enumerate(&self) {
        let mut unavailable = Vec::new();
        match self.manager.pool_names() {
            Ok(names) => {
                for name in names {
                    let pool = match self.manager.open(&name) {
                        Ok(pool) => pool,
                        Err(e) if e.is_reportable() => {
                            warn!("cannot open pool '{}': {}", name, e);
                            continue;
                        }
                        Err(e) => {
                            debug!("pool '{}' went away: {}", name, e);
                            continue;
                        }
                    };
                    match pool.toplevel_state() {
                        Ok(state) if state < VdevState::Degraded => {
                            info!("pool '{}' is {} at startup", name, state);
                            unavailable.push(pool);
                        }
                        Ok(_) => {}
                        Err(e) => warn!("cannot read state of '{}': {}", name, e),
                    }
                }
            }
            Err(e) => warn!("pool enumeration failed: {}", e),
        }

        let mut state = self.state.lock();
        for pool in unavailable {
            state.unavailable.track(pool);
        }
        state.unavailable.finish_enumeration();
    }

    /// Match by device id, then by physical path for raw disks only
    fn deliver_add(
        &self,
        event: &DeviceAdded,
        pending: &mut PendingLabels,
        unavailable: &mut UnavailablePools,
    ) -> Option<AddOutcome> {
        info!(
            "adding {} ({}){}",
            event.devid,
            event.phys_path.as_deref().unwrap_or("NULL"),
            if event.loopback { " [loop]" } else { "" }
        );

        let mut scanner = PoolScanner::new(self.manager.as_ref(), unavailable, &self.metrics);
        let mut reconciler = Reconciler::new(pending, self.resolver.as_ref(), &self.metrics);

        let by_devid = MatchCriteria::by_property(VdevProperty::Devid, &event.devid, event.is_partition)
            .with_new_device(Some(event.devid.clone()), event.dev_name.clone());
        if let Some(outcome) = scanner.scan(&by_devid, |pool, m| reconciler.process_add(pool, m)) {
            return Some(outcome);
        }

        match event.phys_path.as_deref() {
            Some(phys_path) if !event.is_partition => {
                let by_phys = MatchCriteria::by_property(VdevProperty::PhysPath, phys_path, false)
                    .with_new_device(Some(event.devid.clone()), event.dev_name.clone());
                scanner.scan(&by_phys, |pool, m| reconciler.process_add(pool, m))
            }
            _ => None,
        }
    }

    /// A vdev failed to open at pool load with autoreplace set; treated as
    /// if it had just been added
    fn deliver_check(
        &self,
        check: VdevCheck,
        pending: &mut PendingLabels,
        unavailable: &mut UnavailablePools,
    ) -> Option<AddOutcome> {
        info!("vdev check: pool '{}', vdev {}", check.pool_guid, check.vdev_guid);

        let mut scanner = PoolScanner::new(self.manager.as_ref(), unavailable, &self.metrics);
        let mut reconciler = Reconciler::new(pending, self.resolver.as_ref(), &self.metrics);
        let criteria = MatchCriteria::by_guid(check.pool_guid, check.vdev_guid);
        scanner.scan(&criteria, |pool, m| reconciler.process_add(pool, m))
    }

    fn deliver_dle(&self, dle: &DeviceLifecycle) -> Option<ExpandOutcome> {
        let outcome = scanner::scan_phys_path(self.manager.as_ref(), &dle.phys_path, |pool, leaf| {
            reconciler::expand(pool, leaf, &self.metrics)
        });
        if outcome.is_none() {
            info!("device '{}' not found", dle.phys_path);
        }
        outcome
    }
}
