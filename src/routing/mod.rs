//! Routing module: command classification and scatter/gather execution.
//!
//! Three layers, consumed top to bottom by the proxy façade:
//!
//! - [`CommandTable`] classifies every store command by its key-touching
//!   behavior (policy + key positions). Built eagerly at proxy
//!   construction and read-only afterwards.
//! - the key-position resolver turns a policy's declared key shape into a
//!   validated list of argument indices, rejecting short argument lists
//!   before any shard is contacted.
//! - [`RoutingExecutor`] runs one of the scatter/gather strategies
//!   against the pool via the ring and merges per-shard replies into the
//!   single reply the caller sees.

mod executor;
mod keypos;
mod policy;

pub use executor::RoutingExecutor;
pub(crate) use executor::unsupported_reply;
pub use policy::{CommandPolicy, CommandTable, GroupMerge, RoutingStrategy};
