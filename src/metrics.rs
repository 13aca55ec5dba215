//! Agent Metrics
//!
//! Lock-free counters updated on the event path and read by the metrics
//! endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the hotplug agent
#[derive(Debug, Default)]
pub struct AgentMetrics {
    /// Events delivered to the agent
    pub events_received: AtomicU64,
    /// Events with an unrecognized class/subclass
    pub events_ignored: AtomicU64,
    /// Recognized events with an unusable payload
    pub events_malformed: AtomicU64,
    /// Devices brought back online with no replace needed
    pub devices_onlined: AtomicU64,
    /// Force-fault onlines issued
    pub force_faults: AtomicU64,
    /// Whole-disk label requests issued
    pub labels_requested: AtomicU64,
    /// Replaces that succeeded
    pub replacements_succeeded: AtomicU64,
    /// Replaces that failed
    pub replacements_failed: AtomicU64,
    /// Unavailable pools handed to a dataset-enable task
    pub pools_promoted: AtomicU64,
    /// Plain onlines issued after a device size change
    pub expansions: AtomicU64,
    /// Events currently inside the reconciliation critical section
    pub in_flight: AtomicU64,
    /// High-water mark of `in_flight`
    pub peak_in_flight: AtomicU64,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark entry into the critical section; the guard marks the exit
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
        InFlightGuard { metrics: self }
    }

    /// Create a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            events_malformed: self.events_malformed.load(Ordering::Relaxed),
            devices_onlined: self.devices_onlined.load(Ordering::Relaxed),
            force_faults: self.force_faults.load(Ordering::Relaxed),
            labels_requested: self.labels_requested.load(Ordering::Relaxed),
            replacements_succeeded: self.replacements_succeeded.load(Ordering::Relaxed),
            replacements_failed: self.replacements_failed.load(Ordering::Relaxed),
            pools_promoted: self.pools_promoted.load(Ordering::Relaxed),
            expansions: self.expansions.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
            peak_in_flight: self.peak_in_flight.load(Ordering::Acquire),
        }
    }
}

/// Decrements the in-flight gauge on drop
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    metrics: &'a AgentMetrics,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Snapshot of agent metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_ignored: u64,
    pub events_malformed: u64,
    pub devices_onlined: u64,
    pub force_faults: u64,
    pub labels_requested: u64,
    pub replacements_succeeded: u64,
    pub replacements_failed: u64,
    pub pools_promoted: u64,
    pub expansions: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
}

impl MetricsSnapshot {
    /// (name, help, value) triples for exposition
    pub fn counters(&self) -> Vec<(&'static str, &'static str, u64)> {
        vec![
            ("hotplug_events_received_total", "Events delivered to the agent", self.events_received),
            ("hotplug_events_ignored_total", "Events with an unrecognized class", self.events_ignored),
            ("hotplug_events_malformed_total", "Events with an unusable payload", self.events_malformed),
            ("hotplug_devices_onlined_total", "Devices onlined without replace", self.devices_onlined),
            ("hotplug_force_faults_total", "Force-fault onlines issued", self.force_faults),
            ("hotplug_labels_requested_total", "Whole-disk label requests", self.labels_requested),
            ("hotplug_replacements_succeeded_total", "Successful replaces", self.replacements_succeeded),
            ("hotplug_replacements_failed_total", "Failed replaces", self.replacements_failed),
            ("hotplug_pools_promoted_total", "Unavailable pools promoted", self.pools_promoted),
            ("hotplug_expansions_total", "Onlines after device expansion", self.expansions),
        ]
    }
}
