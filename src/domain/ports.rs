//! Domain Ports - Boundaries to the pool-management layer and the host OS
//!
//! The agent never talks to a pool library or the device tree directly.
//! Adapters implement these traits to provide concrete functionality.

use crate::error::{Error, Result};
use crate::pool::vdev::{PoolConfig, PoolProperty, PoolState, Vdev, VdevState};
use bitflags::bitflags;
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// Online Flags
// =============================================================================

bitflags! {
    /// Flags accepted by [`Pool::vdev_online`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OnlineFlags: u32 {
        /// Detach a hot spare once resilvering completes
        const UNSPARE = 0x1;
        /// Treat a device that fails to open as removed
        const CHECK_REMOVE = 0x2;
        /// Fault the device if it cannot be opened
        const FORCE_FAULT = 0x4;
    }
}

impl std::fmt::Display for OnlineFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "{}", names.join("|"))
    }
}

// =============================================================================
// Pool Handle Port
// =============================================================================

/// An open pool.
///
/// Dropping the handle closes the pool, so every exit path releases it exactly
/// once.
pub trait Pool: Send {
    /// Pool name
    fn name(&self) -> &str;

    /// Current configuration tree
    fn config(&self) -> Result<PoolConfig>;

    /// Pool-level state
    fn state(&self) -> PoolState;

    /// Read a boolean pool property
    fn property(&self, prop: PoolProperty) -> bool;

    /// Bring a vdev online. `target` is a vdev GUID (decimal) or device path.
    fn vdev_online(&self, target: &str, flags: OnlineFlags) -> Result<VdevState>;

    /// Attach `new_root` to `target`. With `replace` set, the new device
    /// replaces the old one in place instead of forming a mirror.
    fn vdev_attach(&self, target: &str, new_disk: &str, new_root: &Vdev, replace: bool)
        -> Result<()>;

    /// Write a whole-disk label onto `leaf_name` (e.g., "sdb")
    fn label_disk(&self, leaf_name: &str) -> Result<()>;

    /// Find the leaf vdev at the given physical path
    fn find_vdev_by_phys_path(&self, phys_path: &str) -> Option<Vdev>;

    /// Reopen all vdevs so the kernel picks up size changes
    fn reopen(&self) -> Result<()>;

    /// Mount and share the pool's datasets
    fn enable_datasets(&self) -> Result<()>;

    /// State of the root vdev
    fn toplevel_state(&self) -> Result<VdevState> {
        Ok(self.config()?.toplevel_state())
    }
}

impl std::fmt::Debug for dyn Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("name", &self.name()).finish()
    }
}

/// Owned pool handle
pub type PoolHandle = Box<dyn Pool>;

// =============================================================================
// Pool Manager Port
// =============================================================================

/// Port for enumerating and opening pools
pub trait PoolManager: Send + Sync {
    /// Names of all pools known to the system, in iteration order
    fn pool_names(&self) -> Result<Vec<String>>;

    /// Open a pool by name
    fn open(&self, name: &str) -> Result<PoolHandle>;
}

// =============================================================================
// Device Resolver Port
// =============================================================================

/// Port mapping a physical path onto the device node currently behind it
pub trait DeviceResolver: Send + Sync {
    /// Resolve a physical path to a device node (e.g., /dev/sdb)
    fn resolve(&self, phys_path: &str) -> Result<PathBuf>;
}

/// Resolves physical paths through a udev-style by-path directory of symlinks
#[derive(Debug, Clone)]
pub struct ByPathResolver {
    root: PathBuf,
}

impl ByPathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ByPathResolver {
    fn default() -> Self {
        Self::new(crate::hotplug::DEV_BYPATH_PATH)
    }
}

impl DeviceResolver for ByPathResolver {
    fn resolve(&self, phys_path: &str) -> Result<PathBuf> {
        let raw = self.root.join(phys_path);
        std::fs::canonicalize(&raw).map_err(|source| Error::PathResolution {
            path: raw.display().to_string(),
            source,
        })
    }
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type PoolManagerRef = Arc<dyn PoolManager>;
pub type DeviceResolverRef = Arc<dyn DeviceResolver>;
