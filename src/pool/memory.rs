//! In-Memory Pool Manager
//!
//! A pool-management backend that keeps pool configurations in memory and
//! records every mutating call. Used by tests, benches and the daemon's
//! simulation mode. Inventories load from YAML or JSON.

use crate::domain::ports::{OnlineFlags, Pool, PoolHandle, PoolManager};
use crate::error::{Error, Result};
use crate::hotplug::normalize::strip_partition;
use crate::pool::vdev::{PoolConfig, PoolProperty, PoolState, Vdev, VdevState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Simulated Pool
// =============================================================================

/// A pool held by the in-memory manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedPool {
    /// Pool name
    pub name: String,
    /// Pool GUID
    pub pool_guid: u64,
    /// autoreplace property
    #[serde(default)]
    pub autoreplace: bool,
    /// autoexpand property
    #[serde(default)]
    pub autoexpand: bool,
    /// Make label requests fail
    #[serde(default)]
    pub fail_label: bool,
    /// Make attach requests fail
    #[serde(default)]
    pub fail_attach: bool,
    /// State a leaf reaches when onlined, keyed by leaf GUID.
    /// Leaves without an entry keep an available state or become CANT_OPEN.
    #[serde(default)]
    pub online_results: BTreeMap<u64, VdevState>,
    /// Configuration tree
    pub vdev_tree: Vdev,
}

impl SimulatedPool {
    pub fn new(name: impl Into<String>, pool_guid: u64, vdev_tree: Vdev) -> Self {
        Self {
            name: name.into(),
            pool_guid,
            autoreplace: false,
            autoexpand: false,
            fail_label: false,
            fail_attach: false,
            online_results: BTreeMap::new(),
            vdev_tree,
        }
    }

    pub fn with_autoreplace(mut self, autoreplace: bool) -> Self {
        self.autoreplace = autoreplace;
        self
    }

    pub fn with_autoexpand(mut self, autoexpand: bool) -> Self {
        self.autoexpand = autoexpand;
        self
    }

    pub fn with_online_result(mut self, guid: u64, state: VdevState) -> Self {
        self.online_results.insert(guid, state);
        self
    }

    fn find_target(&mut self, target: &str) -> Option<&mut Vdev> {
        match target.parse::<u64>() {
            Ok(guid) => self.vdev_tree.find_leaf_mut(&|v: &Vdev| v.guid == guid),
            Err(_) => self.vdev_tree.find_leaf_mut(&|v: &Vdev| match v.path.as_deref() {
                Some(path) if path == target => true,
                Some(path) if v.whole_disk => strip_partition(path) == target,
                _ => false,
            }),
        }
    }
}

/// Top-level inventory document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub pools: Vec<SimulatedPool>,
}

// =============================================================================
// Recorded Operations
// =============================================================================

/// A mutating call received by the in-memory manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolOp {
    Online {
        pool: String,
        target: String,
        flags: OnlineFlags,
    },
    Attach {
        pool: String,
        target: String,
        new_disk: String,
        new_root: Vdev,
        replace: bool,
    },
    Label {
        pool: String,
        leaf: String,
    },
    Reopen {
        pool: String,
    },
    EnableDatasets {
        pool: String,
    },
}

impl PoolOp {
    pub fn pool(&self) -> &str {
        match self {
            PoolOp::Online { pool, .. }
            | PoolOp::Attach { pool, .. }
            | PoolOp::Label { pool, .. }
            | PoolOp::Reopen { pool }
            | PoolOp::EnableDatasets { pool } => pool,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    pools: Vec<SimulatedPool>,
    ops: Vec<PoolOp>,
    opens: HashMap<String, u64>,
    closes: HashMap<String, u64>,
}

impl SimState {
    fn pool_mut(&mut self, name: &str) -> Result<&mut SimulatedPool> {
        self.pools
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::PoolNotFound {
                pool: name.to_string(),
            })
    }

    fn pool(&self, name: &str) -> Result<&SimulatedPool> {
        self.pools
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::PoolNotFound {
                pool: name.to_string(),
            })
    }
}

// =============================================================================
// Memory Pool Manager
// =============================================================================

/// Pool manager backed by in-memory configurations
#[derive(Debug, Clone)]
pub struct MemoryPoolManager {
    state: Arc<Mutex<SimState>>,
    enable_delay: Duration,
}

impl MemoryPoolManager {
    /// Create a manager holding the given pools
    pub fn new(pools: Vec<SimulatedPool>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                pools,
                ..Default::default()
            })),
            enable_delay: Duration::ZERO,
        }
    }

    /// Make every dataset-enable call take `delay`
    pub fn with_enable_delay(mut self, delay: Duration) -> Self {
        self.enable_delay = delay;
        self
    }

    /// Parse a YAML inventory
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let inventory: Inventory = serde_yaml::from_str(yaml)?;
        Ok(Self::new(inventory.pools))
    }

    /// Load an inventory file (JSON when the extension is `.json`, YAML otherwise)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let inventory: Inventory = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(Self::new(inventory.pools))
    }

    /// All recorded operations, oldest first
    pub fn ops(&self) -> Vec<PoolOp> {
        self.state.lock().ops.clone()
    }

    /// Number of times a pool was opened
    pub fn open_count(&self, pool: &str) -> u64 {
        self.state.lock().opens.get(pool).copied().unwrap_or(0)
    }

    /// Handles that were opened and not yet closed, across all pools
    pub fn outstanding_handles(&self) -> u64 {
        let state = self.state.lock();
        let opened: u64 = state.opens.values().sum();
        let closed: u64 = state.closes.values().sum();
        opened.saturating_sub(closed)
    }

    /// Set the root vdev state of a pool
    pub fn set_toplevel_state(&self, pool: &str, vdev_state: VdevState) -> Result<()> {
        let mut state = self.state.lock();
        state.pool_mut(pool)?.vdev_tree.state = vdev_state;
        Ok(())
    }

    /// Snapshot of a leaf by GUID
    pub fn leaf(&self, pool: &str, guid: u64) -> Option<Vdev> {
        let state = self.state.lock();
        let pool = state.pool(pool).ok()?;
        pool.vdev_tree
            .leaves()
            .into_iter()
            .find(|v| v.guid == guid)
            .cloned()
    }
}

impl PoolManager for MemoryPoolManager {
    fn pool_names(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().pools.iter().map(|p| p.name.clone()).collect())
    }

    fn open(&self, name: &str) -> Result<PoolHandle> {
        let mut state = self.state.lock();
        state.pool(name)?;
        *state.opens.entry(name.to_string()).or_default() += 1;
        Ok(Box::new(MemoryPool {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            enable_delay: self.enable_delay,
        }))
    }
}

// =============================================================================
// Memory Pool Handle
// =============================================================================

/// Open handle onto a simulated pool
#[derive(Debug)]
pub struct MemoryPool {
    name: String,
    state: Arc<Mutex<SimState>>,
    enable_delay: Duration,
}

impl Pool for MemoryPool {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> Result<PoolConfig> {
        let state = self.state.lock();
        let pool = state.pool(&self.name)?;
        Ok(PoolConfig {
            name: pool.name.clone(),
            pool_guid: pool.pool_guid,
            vdev_tree: pool.vdev_tree.clone(),
        })
    }

    fn state(&self) -> PoolState {
        let state = self.state.lock();
        match state.pool(&self.name) {
            Ok(pool) if pool.vdev_tree.state.is_available() => PoolState::Active,
            _ => PoolState::Unavailable,
        }
    }

    fn property(&self, prop: PoolProperty) -> bool {
        let state = self.state.lock();
        match state.pool(&self.name) {
            Ok(pool) => match prop {
                PoolProperty::Autoreplace => pool.autoreplace,
                PoolProperty::Autoexpand => pool.autoexpand,
            },
            Err(_) => false,
        }
    }

    fn vdev_online(&self, target: &str, flags: OnlineFlags) -> Result<VdevState> {
        let mut state = self.state.lock();
        state.ops.push(PoolOp::Online {
            pool: self.name.clone(),
            target: target.to_string(),
            flags,
        });

        let pool = state.pool_mut(&self.name)?;
        let pool_name = pool.name.clone();
        let scripted = pool.online_results.clone();
        let leaf = pool.find_target(target).ok_or_else(|| Error::VdevNotFound {
            pool: pool_name,
            target: target.to_string(),
        })?;

        let mut new_state = match scripted.get(&leaf.guid) {
            Some(s) => *s,
            None if leaf.state.is_available() => leaf.state,
            None => VdevState::CantOpen,
        };
        if flags.contains(OnlineFlags::FORCE_FAULT) && !new_state.is_available() {
            new_state = VdevState::Faulted;
        }
        leaf.state = new_state;
        debug!("simulated online of {} -> {}", target, new_state);
        Ok(new_state)
    }

    fn vdev_attach(
        &self,
        target: &str,
        new_disk: &str,
        new_root: &Vdev,
        replace: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.ops.push(PoolOp::Attach {
            pool: self.name.clone(),
            target: target.to_string(),
            new_disk: new_disk.to_string(),
            new_root: new_root.clone(),
            replace,
        });

        let pool = state.pool_mut(&self.name)?;
        if pool.fail_attach {
            return Err(Error::pool_op(&self.name, "attach", "device is too small"));
        }
        let new_leaf = new_root
            .children
            .first()
            .cloned()
            .ok_or_else(|| Error::pool_op(&self.name, "attach", "empty root vdev"))?;
        let pool_name = pool.name.clone();
        let leaf = pool.find_target(target).ok_or_else(|| Error::VdevNotFound {
            pool: pool_name,
            target: target.to_string(),
        })?;
        leaf.path = new_leaf.path;
        leaf.devid = new_leaf.devid;
        leaf.phys_path = new_leaf.phys_path;
        leaf.whole_disk = new_leaf.whole_disk;
        leaf.state = VdevState::Healthy;
        Ok(())
    }

    fn label_disk(&self, leaf_name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.ops.push(PoolOp::Label {
            pool: self.name.clone(),
            leaf: leaf_name.to_string(),
        });
        if state.pool(&self.name)?.fail_label {
            return Err(Error::LabelFailed {
                device: leaf_name.to_string(),
                reason: "device is busy".into(),
            });
        }
        Ok(())
    }

    fn find_vdev_by_phys_path(&self, phys_path: &str) -> Option<Vdev> {
        let state = self.state.lock();
        let pool = state.pool(&self.name).ok()?;
        pool.vdev_tree
            .leaves()
            .into_iter()
            .find(|v| v.phys_path.as_deref() == Some(phys_path))
            .cloned()
    }

    fn reopen(&self) -> Result<()> {
        self.state.lock().ops.push(PoolOp::Reopen {
            pool: self.name.clone(),
        });
        Ok(())
    }

    fn enable_datasets(&self) -> Result<()> {
        if !self.enable_delay.is_zero() {
            std::thread::sleep(self.enable_delay);
        }
        self.state.lock().ops.push(PoolOp::EnableDatasets {
            pool: self.name.clone(),
        });
        Ok(())
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        *state.closes.entry(self.name.clone()).or_default() += 1;
    }
}
