//! Pool Hotplug Agent
//!
//! Reacts to device-arrival and device-status events for a storage pool
//! manager. Works out which pool and vdev a device belongs to and drives it
//! through online, fault, label and replace so pools recover on their own
//! when disks are reinserted, replaced or resized.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Event Transport (daemon)                    │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ deliver(class, subclass, payload)
//! ┌───────────────────────────────┴──────────────────────────────────┐
//! │                 HotplugAgent (serialized entry)                  │
//! │  ┌────────────┐  ┌────────────┐  ┌─────────────┐  ┌───────────┐  │
//! │  │ Classifier │─▶│  Scanner   │─▶│   Matcher   │─▶│ Reconciler│  │
//! │  └────────────┘  └─────┬──────┘  └─────────────┘  └─────┬─────┘  │
//! │                        │                                │        │
//! │          ┌─────────────┴──────────┐        ┌────────────┴─────┐  │
//! │          │ Unavailable Pools      │        │ Pending Labels   │  │
//! │          │ (enable-datasets tasks)│        │ (by phys path)   │  │
//! │          └────────────────────────┘        └──────────────────┘  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │          Ports: PoolManager / Pool / DeviceResolver              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`hotplug`]: Event handling, matching and reconciliation
//! - [`pool`]: Vdev configuration model and in-memory pool manager
//! - [`domain`]: Ports to the pool-management layer and the host
//! - [`metrics`]: Agent counters
//! - [`error`]: Error types and handling

pub mod domain;
pub mod error;
pub mod hotplug;
pub mod metrics;
pub mod pool;

// Re-export commonly used types
pub use domain::ports::{
    ByPathResolver, DeviceResolver, DeviceResolverRef, OnlineFlags, Pool, PoolHandle,
    PoolManager, PoolManagerRef,
};

pub use error::{Error, ErrorClass, Result};

pub use hotplug::{
    AddOutcome, AgentConfig, Delivery, EventKind, EventPayload, EventRecord, ExpandOutcome,
    HotplugAgent, Outcome, ShutdownSummary,
};

pub use metrics::{AgentMetrics, MetricsSnapshot};

pub use pool::{
    Inventory, MemoryPoolManager, PoolConfig, PoolOp, PoolProperty, PoolState, SimulatedPool,
    Vdev, VdevProperty, VdevState, VdevType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
