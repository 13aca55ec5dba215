//! Vdev Matcher
//!
//! Finds the first leaf vdev in a configuration tree that corresponds to a
//! newly observed device.

use crate::pool::vdev::{Vdev, VdevProperty};
use tracing::info;

// =============================================================================
// Match Key
// =============================================================================

/// What a leaf is compared against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKey {
    /// Vdev GUID. Zero is the "not provided" sentinel and matches nothing;
    /// a real vdev GUID of zero is not representable.
    Guid(u64),
    /// Exact string equality on a leaf property
    Property { prop: VdevProperty, value: String },
}

impl MatchKey {
    /// Test a single leaf
    pub fn matches(&self, leaf: &Vdev) -> bool {
        match self {
            MatchKey::Guid(guid) => *guid != 0 && leaf.guid == *guid,
            MatchKey::Property { prop, value } => leaf.property(*prop) == Some(value.as_str()),
        }
    }

    fn describe(&self) -> String {
        match self {
            MatchKey::Guid(_) => "GUID".to_string(),
            MatchKey::Property { prop, .. } => prop.to_string(),
        }
    }
}

/// Depth-first search for the first matching leaf.
///
/// Children are visited in order and a node with children is never itself
/// tested. The search stops at the first hit.
pub fn find_leaf<'a>(tree: &'a Vdev, key: &MatchKey) -> Option<&'a Vdev> {
    if !tree.is_leaf() {
        return tree.children.iter().find_map(|child| find_leaf(child, key));
    }
    key.matches(tree).then_some(tree)
}

// =============================================================================
// Match Criteria
// =============================================================================

/// Identity of the device that will replace the matched vdev
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementIdentity {
    /// Device identifier of the newly labeled device
    pub devid: String,
    /// Device node name (e.g., /dev/sdb), if the event carried one
    pub devname: Option<String>,
}

/// A leaf matched against a criteria, ready for reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedVdev {
    /// Copy of the matched leaf
    pub leaf: Vdev,
    /// This match completes an earlier label request
    pub labeled: bool,
    /// Set on property matches of labeled events carrying a device id
    pub replacement: Option<ReplacementIdentity>,
}

/// Single-use description of what to look for during a pool scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    /// Leaf comparison key
    pub key: MatchKey,
    /// Only consider the pool with this GUID (zero means any pool)
    pub pool_guid: u64,
    /// The event is the partition that appeared after a label request
    pub labeled: bool,
    /// Device id to hand to the replace step
    pub new_devid: Option<String>,
    /// Device name to hand to the replace step
    pub new_devname: Option<String>,
}

impl MatchCriteria {
    /// Match a specific vdev in a specific pool
    pub fn by_guid(pool_guid: u64, vdev_guid: u64) -> Self {
        Self {
            key: MatchKey::Guid(vdev_guid),
            pool_guid,
            labeled: false,
            new_devid: None,
            new_devname: None,
        }
    }

    /// Match a leaf property across all pools
    pub fn by_property(prop: VdevProperty, value: impl Into<String>, labeled: bool) -> Self {
        Self {
            key: MatchKey::Property {
                prop,
                value: value.into(),
            },
            pool_guid: 0,
            labeled,
            new_devid: None,
            new_devname: None,
        }
    }

    pub fn with_new_device(mut self, devid: Option<String>, devname: Option<String>) -> Self {
        self.new_devid = devid;
        self.new_devname = devname;
        self
    }

    /// Describe the key for logging ("GUID", "devid", "phys_path")
    pub fn key_name(&self) -> String {
        self.key.describe()
    }

    /// Accept a pool by its GUID
    #[inline]
    pub fn accepts_pool(&self, pool_guid: u64) -> bool {
        self.pool_guid == 0 || self.pool_guid == pool_guid
    }

    /// Find the first matching leaf in `tree`
    pub fn match_tree(&self, tree: &Vdev) -> Option<MatchedVdev> {
        let leaf = find_leaf(tree, &self.key)?;

        let replacement = match &self.key {
            MatchKey::Guid(guid) => {
                info!("  matched vdev on guid {}", guid);
                None
            }
            MatchKey::Property { prop, value } => {
                info!("  matched vdev {} on {}", prop, value);
                match (&self.new_devid, self.labeled) {
                    (Some(devid), true) => Some(ReplacementIdentity {
                        devid: devid.clone(),
                        devname: self.new_devname.clone(),
                    }),
                    _ => None,
                }
            }
        };

        Some(MatchedVdev {
            leaf: leaf.clone(),
            labeled: self.labeled,
            replacement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::vdev::VdevType;

    fn raidz_tree() -> Vdev {
        Vdev::interior(
            VdevType::Root,
            1,
            vec![
                Vdev::interior(
                    VdevType::Raidz,
                    2,
                    vec![
                        Vdev::disk(10, "/dev/sda1")
                            .with_devid("ata-A-part1")
                            .with_phys_path("pci-0:0"),
                        Vdev::disk(11, "/dev/sdb1")
                            .with_devid("ata-B-part1")
                            .with_phys_path("pci-0:1"),
                    ],
                ),
                Vdev::interior(
                    VdevType::Mirror,
                    3,
                    vec![
                        // Same phys path as guid 11: tree order decides
                        Vdev::disk(12, "/dev/sdc1").with_phys_path("pci-0:1"),
                        Vdev::disk(13, "/dev/sdd1").with_devid("ata-D-part1"),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_match_by_guid() {
        let tree = raidz_tree();
        let leaf = find_leaf(&tree, &MatchKey::Guid(13)).unwrap();
        assert_eq!(leaf.path.as_deref(), Some("/dev/sdd1"));
    }

    #[test]
    fn test_interior_nodes_never_tested() {
        let tree = raidz_tree();
        assert!(find_leaf(&tree, &MatchKey::Guid(1)).is_none());
        assert!(find_leaf(&tree, &MatchKey::Guid(3)).is_none());
    }

    #[test]
    fn test_childless_group_never_matches() {
        let tree = Vdev::interior(
            VdevType::Root,
            1,
            vec![
                Vdev::interior(VdevType::Mirror, 7, Vec::new()),
                Vdev::disk(8, "/dev/sde1"),
            ],
        );
        assert!(find_leaf(&tree, &MatchKey::Guid(7)).is_none());
        assert_eq!(find_leaf(&tree, &MatchKey::Guid(8)).map(|v| v.guid), Some(8));
    }

    #[test]
    fn test_zero_guid_matches_nothing() {
        let mut tree = raidz_tree();
        tree.children[0].children[0].guid = 0;
        assert!(find_leaf(&tree, &MatchKey::Guid(0)).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let tree = raidz_tree();
        let key = MatchKey::Property {
            prop: VdevProperty::PhysPath,
            value: "pci-0:1".into(),
        };
        assert_eq!(find_leaf(&tree, &key).unwrap().guid, 11);
    }

    #[test]
    fn test_exact_string_match_only() {
        let tree = raidz_tree();
        let key = MatchKey::Property {
            prop: VdevProperty::Devid,
            value: "ata-A".into(),
        };
        assert!(find_leaf(&tree, &key).is_none());
    }

    #[test]
    fn test_guid_criteria_never_falls_back() {
        let tree = raidz_tree();
        let mut criteria = MatchCriteria::by_guid(0, 99);
        criteria.new_devid = Some("ata-A-part1".into());
        assert!(criteria.match_tree(&tree).is_none());
    }

    #[test]
    fn test_replacement_identity_on_labeled_property_match() {
        let tree = raidz_tree();

        let criteria = MatchCriteria::by_property(VdevProperty::Devid, "ata-B-part1", true)
            .with_new_device(Some("ata-B-part1".into()), Some("/dev/sdq".into()));
        let matched = criteria.match_tree(&tree).unwrap();
        assert_eq!(matched.leaf.guid, 11);
        assert!(matched.labeled);
        assert_eq!(
            matched.replacement,
            Some(ReplacementIdentity {
                devid: "ata-B-part1".into(),
                devname: Some("/dev/sdq".into()),
            })
        );

        // First sightings carry no replacement identity
        let criteria = MatchCriteria::by_property(VdevProperty::Devid, "ata-B-part1", false)
            .with_new_device(Some("ata-B-part1".into()), None);
        assert_eq!(criteria.match_tree(&tree).unwrap().replacement, None);
    }

    #[test]
    fn test_match_does_not_mutate_tree() {
        let tree = raidz_tree();
        let before = tree.clone();
        let criteria = MatchCriteria::by_property(VdevProperty::PhysPath, "pci-0:0", true)
            .with_new_device(Some("ata-NEW".into()), Some("/dev/sdz".into()));
        assert!(criteria.match_tree(&tree).is_some());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_pool_filter() {
        assert!(MatchCriteria::by_guid(0, 5).accepts_pool(77));
        assert!(MatchCriteria::by_guid(77, 5).accepts_pool(77));
        assert!(!MatchCriteria::by_guid(78, 5).accepts_pool(77));
    }
}
