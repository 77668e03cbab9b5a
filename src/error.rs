//! Error types for the sharding proxy.

use crate::types::ShardEndpoint;
use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sharding proxy.
///
/// Command-level failures (unsupported commands, wrong arity, errors
/// reported by a backend) are *not* represented here; those travel as
/// [`Reply::Error`](crate::types::Reply) values so that every call
/// returns exactly one reply. This enum covers the cases where no
/// meaningful reply can be produced at all.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open a connection to a backend shard.
    #[error("connect failed to {endpoint}: {reason}")]
    Connect {
        endpoint: ShardEndpoint,
        reason: String,
    },

    /// No backend shard could be reached at construction time.
    #[error("no backend shards reachable")]
    NoBackends,

    /// Every shard on the ring is marked failed.
    #[error("no live shard")]
    NoLiveShard,

    /// An endpoint string could not be parsed as `host:port`.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// I/O error from a transport implementation.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
