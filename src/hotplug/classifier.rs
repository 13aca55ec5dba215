//! Event Classifier
//!
//! Maps an incoming (class, subclass) pair onto the handler that owns it.

use serde::{Deserialize, Serialize};

/// Device added
pub const EC_DEV_ADD: &str = "EC_dev_add";
/// Device status changed
pub const EC_DEV_STATUS: &str = "EC_dev_status";
/// Pool event
pub const EC_ZFS: &str = "EC_zfs";

/// Disk arrival
pub const ESC_DISK: &str = "disk";
/// Loop device arrival
pub const ESC_LOFI: &str = "lofi";
/// Device lifecycle (e.g., resize) event
pub const ESC_DEV_DLE: &str = "dev_dle";
/// Vdev failed to open during pool load with autoreplace set
pub const ESC_ZFS_VDEV_CHECK: &str = "ESC_ZFS_vdev_check";

/// Recognized event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A disk or loop device appeared
    DeviceAdded { loopback: bool },
    /// Deferred fault from pool load, handled as an add
    VdevCheck,
    /// Device lifecycle change (re-expand)
    DeviceLifecycle,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::DeviceAdded { loopback: false } => write!(f, "device_added"),
            EventKind::DeviceAdded { loopback: true } => write!(f, "device_added(loop)"),
            EventKind::VdevCheck => write!(f, "vdev_check"),
            EventKind::DeviceLifecycle => write!(f, "device_lifecycle"),
        }
    }
}

/// Classify an event; `None` means ignore it
pub fn classify(class: &str, subclass: &str) -> Option<EventKind> {
    match (class, subclass) {
        (EC_DEV_ADD, ESC_DISK) => Some(EventKind::DeviceAdded { loopback: false }),
        // Loop devices are accepted to simplify testing
        (EC_DEV_ADD, ESC_LOFI) => Some(EventKind::DeviceAdded { loopback: true }),
        (EC_ZFS, ESC_ZFS_VDEV_CHECK) => Some(EventKind::VdevCheck),
        (EC_DEV_STATUS, ESC_DEV_DLE) => Some(EventKind::DeviceLifecycle),
        _ => None,
    }
}
