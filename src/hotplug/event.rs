//! Event Payloads
//!
//! Key/value records delivered with each event, and the typed events the
//! agent extracts from them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Payload Field Names
// =============================================================================

/// Device identifier of the announced device
pub const DEV_IDENTIFIER: &str = "devid";
/// Physical path of the announced device
pub const DEV_PHYS_PATH: &str = "phys_path";
/// Device node name (e.g., /dev/sdb1)
pub const DEV_NAME: &str = "dev_name";
/// Present when the announced device is a partition
pub const DEV_IS_PART: &str = "is_slice";
/// Pool GUID of a vdev-check event
pub const ZFS_EV_POOL_GUID: &str = "pool_guid";
/// Vdev GUID of a vdev-check event
pub const ZFS_EV_VDEV_GUID: &str = "vdev_guid";

// =============================================================================
// Payload
// =============================================================================

/// A single payload value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    U64(u64),
    String(String),
}

/// Structured key/value record attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload(BTreeMap<String, PayloadValue>);

impl EventPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<PayloadValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<PayloadValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// String field, if present and a string
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(PayloadValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Numeric field; decimal strings are accepted
    pub fn u64(&self, key: &'static str) -> Result<Option<u64>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(PayloadValue::U64(v)) => Ok(Some(*v)),
            Some(PayloadValue::String(s)) => s.parse().map(Some).map_err(|_| Error::InvalidField {
                field: key,
                reason: format!("'{}' is not a number", s),
            }),
            Some(PayloadValue::Bool(_)) => Err(Error::InvalidField {
                field: key,
                reason: "expected a number".into(),
            }),
        }
    }

    /// Flag field: set when present, unless explicitly `false`
    pub fn flag(&self, key: &str) -> bool {
        !matches!(self.0.get(key), None | Some(PayloadValue::Bool(false)))
    }
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        PayloadValue::Bool(v)
    }
}

impl From<u64> for PayloadValue {
    fn from(v: u64) -> Self {
        PayloadValue::U64(v)
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        PayloadValue::String(v.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        PayloadValue::String(v)
    }
}

/// An event as read from the transport (one JSON object per line)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub class: String,
    pub subclass: String,
    #[serde(default)]
    pub payload: EventPayload,
}

// =============================================================================
// Typed Events
// =============================================================================

/// A disk (or loop device) appeared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAdded {
    pub devid: String,
    pub phys_path: Option<String>,
    pub dev_name: Option<String>,
    /// The device is a partition, i.e. the second sighting after a label
    pub is_partition: bool,
    /// Announced as a loop device
    pub loopback: bool,
}

impl DeviceAdded {
    pub fn from_payload(payload: &EventPayload, loopback: bool) -> Result<Self> {
        let devid = payload
            .string(DEV_IDENTIFIER)
            .ok_or(Error::MissingField {
                field: DEV_IDENTIFIER,
            })?
            .to_string();

        Ok(Self {
            devid,
            phys_path: payload.string(DEV_PHYS_PATH).map(str::to_string),
            dev_name: payload.string(DEV_NAME).map(str::to_string),
            is_partition: payload.flag(DEV_IS_PART),
            loopback,
        })
    }
}

/// A vdev failed to open during pool load while autoreplace was set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VdevCheck {
    pub pool_guid: u64,
    pub vdev_guid: u64,
}

impl VdevCheck {
    pub fn from_payload(payload: &EventPayload) -> Result<Self> {
        let pool_guid = payload.u64(ZFS_EV_POOL_GUID)?.ok_or(Error::MissingField {
            field: ZFS_EV_POOL_GUID,
        })?;
        let vdev_guid = payload.u64(ZFS_EV_VDEV_GUID)?.ok_or(Error::MissingField {
            field: ZFS_EV_VDEV_GUID,
        })?;

        for (field, value) in [(ZFS_EV_POOL_GUID, pool_guid), (ZFS_EV_VDEV_GUID, vdev_guid)] {
            if value == 0 {
                return Err(Error::InvalidField {
                    field,
                    reason: "GUID must be non-zero".into(),
                });
            }
        }

        Ok(Self {
            pool_guid,
            vdev_guid,
        })
    }
}

/// A device changed size or otherwise went through a lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLifecycle {
    pub phys_path: String,
}

impl DeviceLifecycle {
    pub fn from_payload(payload: &EventPayload) -> Result<Self> {
        let phys_path = payload
            .string(DEV_PHYS_PATH)
            .ok_or(Error::MissingField {
                field: DEV_PHYS_PATH,
            })?
            .to_string();
        Ok(Self { phys_path })
    }
}
