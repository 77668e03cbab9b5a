//! Test doubles for exercising the proxy without live backends.
//!
//! [`MemoryCluster`] stands up N in-process stores that speak the
//! [`ShardConnection`](crate::transport::ShardConnection) contract over a
//! hash map, with enough of the command surface (strings, multi-key,
//! counters, admin) to drive every routing strategy. Failure injection
//! mirrors what real backends do to the proxy:
//!
//! - [`MemoryCluster::refuse`]: endpoint unreachable at construction
//! - [`MemoryCluster::kill`]: connection dies, next send reports a
//!   transport failure
//! - [`MemoryStore::fail_next_with_error`]: backend answers one request
//!   with an error reply
//!
//! The module is compiled into the crate (not `#[cfg(test)]`) so that
//! downstream users can test their own code against a proxy with no real
//! store behind it, the same way this crate's integration tests do.

mod memory;
mod proxy_integration_tests;

pub use memory::{MemoryCluster, MemoryConnector, MemoryStore};
