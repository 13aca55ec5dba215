//! Add-Device Reconciler
//!
//! Decides what to do with a vdev whose device just (re)appeared:
//! online it, fault it, or run the two-stage label/replace sequence.
//!
//! ```text
//! disk-add --> label disk + record pending --> partition-add --> replace
//! ```
//!
//! The first sighting of a raw disk labels it and returns. Labeling is
//! asynchronous on the host, so the protocol resumes when the new
//! partition is announced by a separate event.

use crate::domain::ports::{DeviceResolver, OnlineFlags, Pool};
use crate::error::Error;
use crate::hotplug::matcher::MatchedVdev;
use crate::hotplug::normalize::strip_partition;
use crate::hotplug::pending::PendingLabels;
use crate::metrics::AgentMetrics;
use crate::pool::vdev::{PoolProperty, PoolState, Vdev, VdevState};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info, warn};

// =============================================================================
// Outcomes
// =============================================================================

/// Why a device was force-faulted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    /// Pool has autoreplace off
    NoAutoreplace,
    /// Vdev is a partition, not a whole disk
    NotWholeDisk,
    /// No physical path is known for the vdev
    NoPhysPath,
    /// Physical path did not resolve to a device node
    PathResolution,
    /// Label write failed
    LabelFailed,
    /// A partition appeared with no label request outstanding
    UnexpectedPartition,
}

/// Why a labeled replace was abandoned without action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    MissingDevid,
    MissingDevname,
}

/// Result of one add-device reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Matched leaf has no path
    NoPath,
    /// Vdev is administratively offline; nothing was touched
    Offline,
    /// Device came back on its own
    Onlined(VdevState),
    /// A fault was surfaced to the operator
    ForceFaulted(FaultReason),
    /// Disk labeled; waiting for its partition to be announced
    LabelPending { leaf: String },
    /// Labeled event lacked the new device identity
    Aborted(AbortReason),
    /// Replace issued and accepted
    Replaced { new_disk: String },
    /// Replace issued and rejected by the pool layer
    ReplaceFailed { reason: String },
}

/// Result of a device-lifecycle (re-expand) pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Leaf has no path to online
    NoPath,
    /// Autoexpand is off; only the reopen (if any) happened
    AutoexpandDisabled,
    /// Pool is unavailable; online skipped
    PoolUnavailable,
    /// Device onlined at its new size
    Onlined(VdevState),
    /// Online rejected
    OnlineFailed { reason: String },
}

// =============================================================================
// Reconciler
// =============================================================================

/// Runs the add-device state machine against one matched vdev
pub struct Reconciler<'a> {
    pending: &'a mut PendingLabels,
    resolver: &'a dyn DeviceResolver,
    metrics: &'a AgentMetrics,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        pending: &'a mut PendingLabels,
        resolver: &'a dyn DeviceResolver,
        metrics: &'a AgentMetrics,
    ) -> Self {
        Self {
            pending,
            resolver,
            metrics,
        }
    }

    /// Reconcile a matched vdev. Failures are logged and folded into the
    /// outcome; nothing is propagated.
    pub fn process_add(&mut self, pool: &dyn Pool, matched: &MatchedVdev) -> AddOutcome {
        let leaf = &matched.leaf;
        let Some(path) = leaf.path.as_deref() else {
            return AddOutcome::NoPath;
        };
        if leaf.offline {
            debug!("vdev {} is offline, not intervening", path);
            return AddOutcome::Offline;
        }

        info!("process add: pool '{}' vdev '{}' ({})", pool.name(), path, leaf.guid);

        // GUID is the preferred target; otherwise the whole-disk path
        let target = if leaf.guid != 0 {
            leaf.guid.to_string()
        } else if leaf.whole_disk {
            strip_partition(path).to_string()
        } else {
            path.to_string()
        };

        match pool.vdev_online(&target, OnlineFlags::CHECK_REMOVE | OnlineFlags::UNSPARE) {
            Ok(state) if state.is_available() => {
                info!("  vdev_online: vdev {} is {}", target, state);
                AgentMetrics::incr(&self.metrics.devices_onlined);
                return AddOutcome::Onlined(state);
            }
            Ok(state) => debug!("  vdev_online: vdev {} is {}", target, state),
            Err(e) => debug!("  vdev_online: {} failed ({})", target, e),
        }

        // Only whole disks of autoreplace pools at a known slot are relabeled
        if !pool.property(PoolProperty::Autoreplace) {
            return self.force_fault(pool, &target, FaultReason::NoAutoreplace);
        }
        if !leaf.whole_disk {
            return self.force_fault(pool, &target, FaultReason::NotWholeDisk);
        }
        let Some(phys_path) = leaf.phys_path.as_deref() else {
            return self.force_fault(pool, &target, FaultReason::NoPhysPath);
        };

        let devpath = match self.resolver.resolve(phys_path) {
            Ok(devpath) => devpath,
            Err(e) => {
                info!("  resolve: {}", e);
                return self.force_fault(pool, &target, FaultReason::PathResolution);
            }
        };

        if !matched.labeled {
            // Resumes when the partition is announced
            return self.label(pool, &target, leaf, phys_path, &devpath);
        }

        let Some(request) = self.pending.take(phys_path) else {
            violation(format!("no label request outstanding for '{}'", phys_path));
            return self.force_fault(pool, &target, FaultReason::UnexpectedPartition);
        };
        let waited = Utc::now().signed_duration_since(request.requested_at);
        info!(
            "  label_disk: resume '{}' ({}) after {}ms",
            phys_path,
            leaf.guid,
            waited.num_milliseconds()
        );

        let Some(identity) = matched.replacement.as_ref() else {
            violation(format!("auto replace of {}: missing devid", target));
            return AddOutcome::Aborted(AbortReason::MissingDevid);
        };
        let Some(devname) = identity.devname.as_deref() else {
            violation(format!("auto replace of {}: missing name", target));
            return AddOutcome::Aborted(AbortReason::MissingDevname);
        };

        let new_disk = devname.to_string();
        let root = Vdev::replacement_root(devname, &identity.devid, Some(phys_path), leaf.whole_disk);
        match pool.vdev_attach(&target, &new_disk, &root, true) {
            Ok(()) => {
                info!("  vdev_replace: {} with {} (no errors)", target, new_disk);
                AgentMetrics::incr(&self.metrics.replacements_succeeded);
                AddOutcome::Replaced { new_disk }
            }
            Err(e) => {
                info!("  vdev_replace: {} with {} ({})", target, new_disk, e);
                AgentMetrics::incr(&self.metrics.replacements_failed);
                AddOutcome::ReplaceFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// First sighting of a raw disk: write a whole-disk label and remember
    /// the physical path until the partition shows up.
    fn label(
        &mut self,
        pool: &dyn Pool,
        target: &str,
        leaf: &Vdev,
        phys_path: &str,
        devpath: &Path,
    ) -> AddOutcome {
        let Some(leaf_name) = devpath.file_name().and_then(|n| n.to_str()) else {
            info!("  resolve: {} has no device name", devpath.display());
            return self.force_fault(pool, target, FaultReason::PathResolution);
        };

        if let Err(e) = pool.label_disk(leaf_name) {
            info!("  label_disk: could not label '{}' ({})", leaf_name, e);
            return self.force_fault(pool, target, FaultReason::LabelFailed);
        }

        self.pending.insert(phys_path);
        AgentMetrics::incr(&self.metrics.labels_requested);
        info!("  label_disk: async '{}' ({})", leaf_name, leaf.guid);
        AddOutcome::LabelPending {
            leaf: leaf_name.to_string(),
        }
    }

    fn force_fault(&self, pool: &dyn Pool, target: &str, reason: FaultReason) -> AddOutcome {
        let result = pool.vdev_online(target, OnlineFlags::FORCE_FAULT);
        AgentMetrics::incr(&self.metrics.force_faults);
        match result {
            Ok(state) => info!("  vdev_online: {} FORCEFAULT ({:?}, now {})", target, reason, state),
            Err(e) => info!("  vdev_online: {} FORCEFAULT ({:?}: {})", target, reason, e),
        }
        AddOutcome::ForceFaulted(reason)
    }
}

/// Handle a size change on `leaf`: reopen the pool for whole disks, then
/// online the device if the pool wants autoexpand.
pub fn expand(pool: &dyn Pool, leaf: &Vdev, metrics: &AgentMetrics) -> ExpandOutcome {
    let Some(path) = leaf.path.as_deref() else {
        return ExpandOutcome::NoPath;
    };

    let fullpath = if leaf.whole_disk {
        // Reopen so the kernel picks up the new size
        if let Err(e) = pool.reopen() {
            warn!("reopen of '{}' failed: {}", pool.name(), e);
        }
        strip_partition(path)
    } else {
        path
    };

    if !pool.property(PoolProperty::Autoexpand) {
        return ExpandOutcome::AutoexpandDisabled;
    }

    info!("setting device '{}' to ONLINE state in pool '{}'", fullpath, pool.name());
    if pool.state() == PoolState::Unavailable {
        return ExpandOutcome::PoolUnavailable;
    }

    match pool.vdev_online(fullpath, OnlineFlags::empty()) {
        Ok(state) => {
            AgentMetrics::incr(&metrics.expansions);
            ExpandOutcome::Onlined(state)
        }
        Err(e) => {
            warn!("online of '{}' failed: {}", fullpath, e);
            ExpandOutcome::OnlineFailed {
                reason: describe(&e),
            }
        }
    }
}

/// The label/replace sequence cannot continue for this event
fn violation(detail: String) {
    warn!("  {}", Error::ProtocolViolation(detail));
}

fn describe(e: &Error) -> String {
    match e {
        Error::PoolOperation { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ByPathResolver, PoolManager};
    use crate::hotplug::matcher::MatchCriteria;
    use crate::pool::memory::{MemoryPoolManager, PoolOp, SimulatedPool};
    use crate::pool::vdev::{VdevProperty, VdevType};
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    const PHYS: &str = "pci-0000:04:00.0-sas-0x4433221106000000-lun-0";

    /// by-path directory with `PHYS` pointing at a device node named `sdq`
    fn by_path() -> (TempDir, ByPathResolver) {
        let tmp = TempDir::new().unwrap();
        let dev = tmp.path().join("sdq");
        std::fs::write(&dev, b"").unwrap();
        let dir = tmp.path().join("by-path");
        std::fs::create_dir(&dir).unwrap();
        std::os::unix::fs::symlink(&dev, dir.join(PHYS)).unwrap();
        (tmp, ByPathResolver::new(dir))
    }

    fn leaf() -> Vdev {
        Vdev::disk(42, "/dev/sdc1")
            .with_devid("ata-OLD-part1")
            .with_phys_path(PHYS)
            .with_whole_disk(true)
            .with_state(VdevState::Removed)
    }

    fn manager(leaf: Vdev, autoreplace: bool) -> MemoryPoolManager {
        let tree = Vdev::interior(VdevType::Root, 1, vec![leaf]).with_state(VdevState::Degraded);
        MemoryPoolManager::new(vec![SimulatedPool::new("tank", 9, tree).with_autoreplace(autoreplace)])
    }

    fn matched(leaf: Vdev, labeled: bool) -> MatchedVdev {
        let criteria = MatchCriteria::by_property(VdevProperty::PhysPath, PHYS, labeled)
            .with_new_device(Some("ata-NEW-part1".into()), Some("/dev/sdq1".into()));
        let tree = Vdev::interior(VdevType::Root, 1, vec![leaf]);
        criteria.match_tree(&tree).unwrap()
    }

    #[test]
    fn test_offline_vdev_untouched() {
        let (_tmp, resolver) = by_path();
        let manager = manager(leaf().with_offline(true), true);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        let outcome = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf().with_offline(true), false));

        assert_eq!(outcome, AddOutcome::Offline);
        assert!(manager.ops().is_empty());
    }

    #[test]
    fn test_reinserted_device_only_onlined() {
        let (_tmp, resolver) = by_path();
        let healthy = leaf().with_state(VdevState::Healthy);
        let manager = manager(healthy.clone(), true);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        let outcome = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(healthy, false));

        assert_eq!(outcome, AddOutcome::Onlined(VdevState::Healthy));
        assert_eq!(
            manager.ops(),
            vec![PoolOp::Online {
                pool: "tank".into(),
                target: "42".into(),
                flags: OnlineFlags::CHECK_REMOVE | OnlineFlags::UNSPARE,
            }]
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_degraded_online_ends_reconciliation() {
        let (_tmp, resolver) = by_path();
        let tree = Vdev::interior(VdevType::Root, 1, vec![leaf()]);
        let sim = SimulatedPool::new("tank", 9, tree)
            .with_autoreplace(true)
            .with_online_result(42, VdevState::Degraded);
        let manager = MemoryPoolManager::new(vec![sim]);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        // Both sightings stop at the online, even with a label outstanding
        let first = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), false));
        assert_eq!(first, AddOutcome::Onlined(VdevState::Degraded));

        pending.insert(PHYS);
        let second = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), true));
        assert_eq!(second, AddOutcome::Onlined(VdevState::Degraded));

        assert!(manager.ops().iter().all(|op| matches!(
            op,
            PoolOp::Online { flags, .. } if *flags == OnlineFlags::CHECK_REMOVE | OnlineFlags::UNSPARE
        )));
        assert_eq!(manager.ops().len(), 2);
        assert_eq!(pending.phys_paths(), vec![PHYS]);
        let snap = metrics.snapshot();
        assert_eq!(snap.devices_onlined, 2);
        assert_eq!(snap.labels_requested, 0);
        assert_eq!(snap.force_faults, 0);
    }

    #[test]
    fn test_autoreplace_gate_force_faults() {
        let (_tmp, resolver) = by_path();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        let cases = [
            (leaf(), false, FaultReason::NoAutoreplace),
            (leaf().with_whole_disk(false), true, FaultReason::NotWholeDisk),
        ];
        for (vdev, autoreplace, reason) in cases {
            let manager = manager(vdev.clone(), autoreplace);
            let pool = manager.open("tank").unwrap();
            let outcome = Reconciler::new(&mut pending, &resolver, &metrics)
                .process_add(pool.as_ref(), &matched(vdev, false));
            assert_eq!(outcome, AddOutcome::ForceFaulted(reason));
            assert_matches!(
                manager.ops().last(),
                Some(PoolOp::Online { flags, .. }) if *flags == OnlineFlags::FORCE_FAULT
            );
        }

        // Matched by devid, but no physical path on record
        let mut no_phys = leaf();
        no_phys.phys_path = None;
        let manager = manager(no_phys.clone(), true);
        let pool = manager.open("tank").unwrap();
        let criteria = MatchCriteria::by_property(VdevProperty::Devid, "ata-OLD-part1", false);
        let m = criteria
            .match_tree(&Vdev::interior(VdevType::Root, 1, vec![no_phys]))
            .unwrap();
        let outcome = Reconciler::new(&mut pending, &resolver, &metrics).process_add(pool.as_ref(), &m);
        assert_eq!(outcome, AddOutcome::ForceFaulted(FaultReason::NoPhysPath));

        assert_eq!(metrics.snapshot().force_faults, 3);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_unresolvable_phys_path_force_faults() {
        let tmp = TempDir::new().unwrap();
        let resolver = ByPathResolver::new(tmp.path());
        let manager = manager(leaf(), true);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        let outcome = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), false));

        assert_eq!(outcome, AddOutcome::ForceFaulted(FaultReason::PathResolution));
        assert!(!manager.ops().iter().any(|op| matches!(op, PoolOp::Label { .. })));
    }

    #[test]
    fn test_label_then_replace() {
        let (_tmp, resolver) = by_path();
        let manager = manager(leaf(), true);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        let first = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), false));
        assert_eq!(first, AddOutcome::LabelPending { leaf: "sdq".into() });
        assert_eq!(pending.phys_paths(), vec![PHYS]);
        assert!(manager.ops().contains(&PoolOp::Label {
            pool: "tank".into(),
            leaf: "sdq".into()
        }));

        let second = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), true));
        assert_eq!(second, AddOutcome::Replaced { new_disk: "/dev/sdq1".into() });
        assert!(pending.is_empty());

        assert_matches!(
            manager.ops().last(),
            Some(PoolOp::Attach { target, new_disk, new_root, replace: true, .. }) => {
                assert_eq!(target, "42");
                assert_eq!(new_disk, "/dev/sdq1");
                let new_leaf = &new_root.children[0];
                assert_eq!(new_leaf.devid.as_deref(), Some("ata-NEW-part1"));
                assert_eq!(new_leaf.phys_path.as_deref(), Some(PHYS));
                assert!(new_leaf.whole_disk);
            }
        );
        assert_eq!(
            manager.leaf("tank", 42).unwrap().devid.as_deref(),
            Some("ata-NEW-part1")
        );
        let snap = metrics.snapshot();
        assert_eq!(snap.labels_requested, 1);
        assert_eq!(snap.replacements_succeeded, 1);
    }

    #[test]
    fn test_unexpected_partition_force_faults() {
        let (_tmp, resolver) = by_path();
        let manager = manager(leaf(), true);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();
        pending.insert("pci-some-other-slot");

        let outcome = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), true));

        assert_eq!(outcome, AddOutcome::ForceFaulted(FaultReason::UnexpectedPartition));
        assert_eq!(pending.phys_paths(), vec!["pci-some-other-slot"]);
    }

    #[test]
    fn test_labeled_without_identity_aborts() {
        let (_tmp, resolver) = by_path();
        let manager = manager(leaf(), true);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        pending.insert(PHYS);
        let mut m = matched(leaf(), true);
        m.replacement = None;
        let outcome = Reconciler::new(&mut pending, &resolver, &metrics).process_add(pool.as_ref(), &m);
        assert_eq!(outcome, AddOutcome::Aborted(AbortReason::MissingDevid));
        // The pending entry is consumed even though nothing was attached
        assert!(pending.is_empty());

        pending.insert(PHYS);
        let mut m = matched(leaf(), true);
        if let Some(identity) = m.replacement.as_mut() {
            identity.devname = None;
        }
        let outcome = Reconciler::new(&mut pending, &resolver, &metrics).process_add(pool.as_ref(), &m);
        assert_eq!(outcome, AddOutcome::Aborted(AbortReason::MissingDevname));
        assert!(!manager.ops().iter().any(|op| matches!(op, PoolOp::Attach { .. })));
    }

    #[test]
    fn test_replace_failure_reported() {
        let (_tmp, resolver) = by_path();
        let tree = Vdev::interior(VdevType::Root, 1, vec![leaf()]);
        let mut sim = SimulatedPool::new("tank", 9, tree).with_autoreplace(true);
        sim.fail_attach = true;
        let manager = MemoryPoolManager::new(vec![sim]);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();
        pending.insert(PHYS);

        let outcome = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), true));
        assert_matches!(outcome, AddOutcome::ReplaceFailed { .. });
        assert_eq!(metrics.snapshot().replacements_failed, 1);
    }

    #[test]
    fn test_label_failure_force_faults() {
        let (_tmp, resolver) = by_path();
        let tree = Vdev::interior(VdevType::Root, 1, vec![leaf()]);
        let mut sim = SimulatedPool::new("tank", 9, tree).with_autoreplace(true);
        sim.fail_label = true;
        let manager = MemoryPoolManager::new(vec![sim]);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        let outcome = Reconciler::new(&mut pending, &resolver, &metrics)
            .process_add(pool.as_ref(), &matched(leaf(), false));
        assert_eq!(outcome, AddOutcome::ForceFaulted(FaultReason::LabelFailed));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_guidless_whole_disk_targets_stripped_path() {
        let (_tmp, resolver) = by_path();
        let mut vdev = leaf().with_state(VdevState::Healthy);
        vdev.guid = 0;
        let manager = manager(vdev.clone(), true);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();
        let mut pending = PendingLabels::new();

        Reconciler::new(&mut pending, &resolver, &metrics).process_add(pool.as_ref(), &matched(vdev, false));
        assert_matches!(
            manager.ops().first(),
            Some(PoolOp::Online { target, .. }) if target == "/dev/sdc"
        );
    }

    #[test]
    fn test_expand_whole_disk() {
        let tree = Vdev::interior(VdevType::Root, 1, vec![leaf().with_state(VdevState::Healthy)]);
        let manager = MemoryPoolManager::new(vec![SimulatedPool::new("tank", 9, tree).with_autoexpand(true)]);
        let pool = manager.open("tank").unwrap();
        let metrics = AgentMetrics::new();

        let leaf = pool.find_vdev_by_phys_path(PHYS).unwrap();
        assert_eq!(expand(pool.as_ref(), &leaf, &metrics), ExpandOutcome::Onlined(VdevState::Healthy));
        assert_eq!(
            manager.ops(),
            vec![
                PoolOp::Reopen { pool: "tank".into() },
                PoolOp::Online {
                    pool: "tank".into(),
                    target: "/dev/sdc".into(),
                    flags: OnlineFlags::empty(),
                },
            ]
        );
        assert_eq!(metrics.snapshot().expansions, 1);
    }

    #[test]
    fn test_expand_respects_autoexpand_and_pool_state() {
        let metrics = AgentMetrics::new();

        let manager = manager(leaf().with_whole_disk(false), false);
        let pool = manager.open("tank").unwrap();
        let leaf_vdev = pool.find_vdev_by_phys_path(PHYS).unwrap();
        assert_eq!(expand(pool.as_ref(), &leaf_vdev, &metrics), ExpandOutcome::AutoexpandDisabled);
        assert!(manager.ops().is_empty());

        let tree = Vdev::interior(VdevType::Root, 1, vec![leaf()]).with_state(VdevState::Faulted);
        let manager = MemoryPoolManager::new(vec![SimulatedPool::new("tank", 9, tree).with_autoexpand(true)]);
        let pool = manager.open("tank").unwrap();
        let leaf_vdev = pool.find_vdev_by_phys_path(PHYS).unwrap();
        assert_eq!(expand(pool.as_ref(), &leaf_vdev, &metrics), ExpandOutcome::PoolUnavailable);
        assert_eq!(manager.ops(), vec![PoolOp::Reopen { pool: "tank".into() }]);
    }
}
