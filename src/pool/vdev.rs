//! Vdev Configuration Model
//!
//! Typed view of a pool's configuration tree as read from the
//! pool-management layer. Interior nodes (root, mirror, raidz, ...) only
//! carry children; leaves carry the path, physical path and device id.

use serde::{Deserialize, Serialize};

// =============================================================================
// Vdev State
// =============================================================================

/// Vdev state, ordered from least to most usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VdevState {
    Unknown,
    Closed,
    Offline,
    Removed,
    CantOpen,
    Faulted,
    Degraded,
    Healthy,
}

impl VdevState {
    /// HEALTHY and DEGRADED vdevs can serve I/O
    #[inline]
    pub fn is_available(&self) -> bool {
        *self >= VdevState::Degraded
    }
}

impl Default for VdevState {
    fn default() -> Self {
        VdevState::Unknown
    }
}

impl std::fmt::Display for VdevState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VdevState::Unknown => write!(f, "UNKNOWN"),
            VdevState::Closed => write!(f, "CLOSED"),
            VdevState::Offline => write!(f, "OFFLINE"),
            VdevState::Removed => write!(f, "REMOVED"),
            VdevState::CantOpen => write!(f, "CANT_OPEN"),
            VdevState::Faulted => write!(f, "FAULTED"),
            VdevState::Degraded => write!(f, "DEGRADED"),
            VdevState::Healthy => write!(f, "HEALTHY"),
        }
    }
}

// =============================================================================
// Vdev Type
// =============================================================================

/// Vdev node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VdevType {
    Root,
    Mirror,
    Raidz,
    Draid,
    Replacing,
    Spare,
    Disk,
    File,
}

impl VdevType {
    /// Backed by a device rather than grouping other vdevs
    pub fn is_device(self) -> bool {
        matches!(self, VdevType::Disk | VdevType::File)
    }
}

impl std::fmt::Display for VdevType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VdevType::Root => write!(f, "root"),
            VdevType::Mirror => write!(f, "mirror"),
            VdevType::Raidz => write!(f, "raidz"),
            VdevType::Draid => write!(f, "draid"),
            VdevType::Replacing => write!(f, "replacing"),
            VdevType::Spare => write!(f, "spare"),
            VdevType::Disk => write!(f, "disk"),
            VdevType::File => write!(f, "file"),
        }
    }
}

// =============================================================================
// Leaf Properties
// =============================================================================

/// String properties a leaf can be matched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VdevProperty {
    /// Platform-stable device identifier
    Devid,
    /// Hardware-topology location
    PhysPath,
}

impl std::fmt::Display for VdevProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VdevProperty::Devid => write!(f, "devid"),
            VdevProperty::PhysPath => write!(f, "phys_path"),
        }
    }
}

// =============================================================================
// Vdev
// =============================================================================

/// A node in a pool's vdev tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vdev {
    /// Node type
    #[serde(rename = "type")]
    pub vdev_type: VdevType,
    /// Vdev GUID. Zero means "not known".
    #[serde(default)]
    pub guid: u64,
    /// Device path (e.g., /dev/sda1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Physical path (e.g., pci-0000:04:00.0-sas-0x4433221106000000-lun-0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phys_path: Option<String>,
    /// Device identifier (e.g., ata-SAMSUNG_HD204UI_S2HGJD2Z805891-part1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devid: Option<String>,
    /// Vdev occupies an entire disk
    #[serde(default)]
    pub whole_disk: bool,
    /// Administratively offline
    #[serde(default)]
    pub offline: bool,
    /// Current state
    #[serde(default)]
    pub state: VdevState,
    /// Child vdevs (empty for leaves)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Vdev>,
}

impl Vdev {
    /// Create an interior node
    pub fn interior(vdev_type: VdevType, guid: u64, children: Vec<Vdev>) -> Self {
        Self {
            vdev_type,
            guid,
            path: None,
            phys_path: None,
            devid: None,
            whole_disk: false,
            offline: false,
            state: VdevState::Healthy,
            children,
        }
    }

    /// Create a disk leaf
    pub fn disk(guid: u64, path: impl Into<String>) -> Self {
        Self {
            vdev_type: VdevType::Disk,
            guid,
            path: Some(path.into()),
            phys_path: None,
            devid: None,
            whole_disk: false,
            offline: false,
            state: VdevState::Healthy,
            children: Vec::new(),
        }
    }

    pub fn with_devid(mut self, devid: impl Into<String>) -> Self {
        self.devid = Some(devid.into());
        self
    }

    pub fn with_phys_path(mut self, phys_path: impl Into<String>) -> Self {
        self.phys_path = Some(phys_path.into());
        self
    }

    pub fn with_whole_disk(mut self, whole_disk: bool) -> Self {
        self.whole_disk = whole_disk;
        self
    }

    pub fn with_state(mut self, state: VdevState) -> Self {
        self.state = state;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// A device node without children. Grouping nodes are never leaves,
    /// even with an empty child list.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.vdev_type.is_device() && self.children.is_empty()
    }

    /// Look up a string property on this node
    pub fn property(&self, prop: VdevProperty) -> Option<&str> {
        match prop {
            VdevProperty::Devid => self.devid.as_deref(),
            VdevProperty::PhysPath => self.phys_path.as_deref(),
        }
    }

    /// All leaves, depth-first in child order
    pub fn leaves(&self) -> Vec<&Vdev> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Vdev>) {
        if self.is_leaf() {
            out.push(self);
        } else {
            for child in &self.children {
                child.collect_leaves(out);
            }
        }
    }

    /// First leaf satisfying `pred`, depth-first
    pub fn find_leaf_mut<F>(&mut self, pred: &F) -> Option<&mut Vdev>
    where
        F: Fn(&Vdev) -> bool,
    {
        if self.is_leaf() {
            return if pred(self) { Some(self) } else { None };
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_leaf_mut(pred))
    }

    /// Build the minimal root vdev handed to a replace:
    /// a root container holding a single disk leaf.
    pub fn replacement_root(
        path: &str,
        devid: &str,
        phys_path: Option<&str>,
        whole_disk: bool,
    ) -> Self {
        let leaf = Self {
            vdev_type: VdevType::Disk,
            guid: 0,
            path: Some(path.to_string()),
            phys_path: phys_path.map(str::to_string),
            devid: Some(devid.to_string()),
            whole_disk,
            offline: false,
            state: VdevState::Unknown,
            children: Vec::new(),
        };
        Self::interior(VdevType::Root, 0, vec![leaf])
    }
}

// =============================================================================
// Pool Configuration
// =============================================================================

/// Pool-level state reported by the management layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolState {
    Active,
    Unavailable,
}

/// Boolean pool properties consulted by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolProperty {
    Autoreplace,
    Autoexpand,
}

impl std::fmt::Display for PoolProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolProperty::Autoreplace => write!(f, "autoreplace"),
            PoolProperty::Autoexpand => write!(f, "autoexpand"),
        }
    }
}

/// Snapshot of a pool's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool name
    pub name: String,
    /// Pool GUID
    pub pool_guid: u64,
    /// Root of the vdev tree
    pub vdev_tree: Vdev,
}

impl PoolConfig {
    /// State of the root vdev
    #[inline]
    pub fn toplevel_state(&self) -> VdevState {
        self.vdev_tree.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror_tree() -> Vdev {
        Vdev::interior(
            VdevType::Root,
            1,
            vec![
                Vdev::interior(
                    VdevType::Mirror,
                    2,
                    vec![Vdev::disk(10, "/dev/sda1"), Vdev::disk(11, "/dev/sdb1")],
                ),
                Vdev::disk(12, "/dev/sdc1"),
            ],
        )
    }

    #[test]
    fn test_state_ordering() {
        assert!(VdevState::Healthy > VdevState::Degraded);
        assert!(VdevState::Degraded > VdevState::Faulted);
        assert!(VdevState::CantOpen < VdevState::Degraded);
        assert!(VdevState::Healthy.is_available());
        assert!(VdevState::Degraded.is_available());
        assert!(!VdevState::Faulted.is_available());
        assert!(!VdevState::Unknown.is_available());
    }

    #[test]
    fn test_leaves_in_tree_order() {
        let tree = mirror_tree();
        let guids: Vec<u64> = tree.leaves().iter().map(|v| v.guid).collect();
        assert_eq!(guids, vec![10, 11, 12]);
    }

    #[test]
    fn test_find_leaf_mut() {
        let mut tree = mirror_tree();
        let leaf = tree.find_leaf_mut(&|v: &Vdev| v.guid == 11).unwrap();
        leaf.state = VdevState::Faulted;
        assert_eq!(tree.leaves()[1].state, VdevState::Faulted);

        // Interior GUIDs are never matched
        assert!(tree.find_leaf_mut(&|v: &Vdev| v.guid == 2).is_none());
    }

    #[test]
    fn test_childless_group_is_not_a_leaf() {
        let empty_mirror = Vdev::interior(VdevType::Mirror, 7, Vec::new());
        assert!(!empty_mirror.is_leaf());

        let mut tree = Vdev::interior(VdevType::Root, 1, vec![empty_mirror, Vdev::disk(12, "/dev/sdc1")]);
        assert_eq!(tree.leaves().len(), 1);
        assert!(tree.find_leaf_mut(&|v: &Vdev| v.guid == 7).is_none());
        assert!(Vdev::disk(12, "/dev/sdc1").is_leaf());
    }

    #[test]
    fn test_replacement_root() {
        let root = Vdev::replacement_root("/dev/sdd", "ata-NEW-part1", Some("pci-0:1"), true);
        assert_eq!(root.vdev_type, VdevType::Root);
        assert_eq!(root.children.len(), 1);
        let leaf = &root.children[0];
        assert_eq!(leaf.vdev_type, VdevType::Disk);
        assert_eq!(leaf.path.as_deref(), Some("/dev/sdd"));
        assert_eq!(leaf.devid.as_deref(), Some("ata-NEW-part1"));
        assert_eq!(leaf.phys_path.as_deref(), Some("pci-0:1"));
        assert!(leaf.whole_disk);
    }

    #[test]
    fn test_vdev_yaml() {
        let yaml = r#"
type: root
guid: 1
state: DEGRADED
children:
  - type: disk
    guid: 42
    path: /dev/sda1
    devid: ata-DISK-part1
    whole_disk: true
"#;
        let tree: Vdev = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(tree.state, VdevState::Degraded);
        let leaf = &tree.children[0];
        assert!(leaf.is_leaf());
        assert_eq!(leaf.property(VdevProperty::Devid), Some("ata-DISK-part1"));
        assert_eq!(leaf.property(VdevProperty::PhysPath), None);
        assert_eq!(leaf.state, VdevState::Unknown);
    }
}
