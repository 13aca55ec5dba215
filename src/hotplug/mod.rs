//! Hotplug Reconciliation
//!
//! Reacts to device-arrival and device-status events, works out which pool
//! and vdev a device belongs to, and drives the vdev through the
//! online/label/replace protocol.
//!
//! - [`normalize`]: partition suffix stripping
//! - [`matcher`]: depth-first leaf matching
//! - [`scanner`]: pool iteration and unavailable-pool promotion
//! - [`classifier`]: event class/subclass routing
//! - [`event`]: payloads and typed events
//! - [`reconciler`]: add-device state machine and re-expand
//! - [`pending`]: outstanding label requests
//! - [`unavailable`]: pools that were unavailable at startup
//! - [`tasks`]: supervised background threads
//! - [`agent`]: the serialized entry point

pub mod agent;
pub mod classifier;
pub mod event;
pub mod matcher;
pub mod normalize;
pub mod pending;
pub mod reconciler;
pub mod scanner;
pub mod tasks;
pub mod unavailable;

pub use agent::{AgentConfig, Delivery, HotplugAgent, Outcome, ShutdownSummary};
pub use classifier::{classify, EventKind};
pub use event::{DeviceAdded, DeviceLifecycle, EventPayload, EventRecord, PayloadValue, VdevCheck};
pub use matcher::{find_leaf, MatchCriteria, MatchKey, MatchedVdev, ReplacementIdentity};
pub use normalize::strip_partition;
pub use pending::{PendingLabel, PendingLabels};
pub use reconciler::{AbortReason, AddOutcome, ExpandOutcome, FaultReason, Reconciler};
pub use scanner::PoolScanner;
pub use tasks::TaskSet;
pub use unavailable::{RegistryShutdown, UnavailablePools};

/// Directory of stable symlinks keyed by physical path
pub const DEV_BYPATH_PATH: &str = "/dev/disk/by-path";
