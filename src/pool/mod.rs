//! Pool Module
//!
//! Vdev configuration model and the in-memory pool-management backend.

pub mod memory;
pub mod vdev;

pub use memory::*;
pub use vdev::*;
