//! Boundaries to collaborators the agent does not own
//!
//! The pool-management layer (listing, opening and mutating pools) and the
//! host device tree (physical path to device node) are reached only through
//! the traits in [`ports`].

pub mod ports;

pub use ports::{
    ByPathResolver, DeviceResolver, DeviceResolverRef, OnlineFlags, Pool, PoolHandle,
    PoolManager, PoolManagerRef,
};
