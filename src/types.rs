//! Core types used throughout the sharding proxy.

use crate::error::Error;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of one backend shard.
///
/// Endpoints are supplied at construction time and never change for the
/// lifetime of a proxy instance; the endpoint list also determines ring
/// point placement, so the same list always produces the same key
/// ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardEndpoint {
    /// Hostname or IP address of the backend.
    pub host: String,

    /// TCP port of the backend.
    pub port: u16,
}

impl ShardEndpoint {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ShardEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ShardEndpoint {
    type Err = Error;

    /// Parse `host:port`. The port is taken from the last colon, so
    /// bracketless IPv6 literals are not supported.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidEndpoint(s.to_string()))?;
        if host.is_empty() {
            return Err(Error::InvalidEndpoint(s.to_string()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| Error::InvalidEndpoint(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

/// One reply from a backend store, or a reply synthesized by the proxy.
///
/// Mirrors the reply model of Redis-like protocols. Merge strategies in
/// the routing executor consume the per-shard replies they do not forward
/// to the caller; ownership does the bookkeeping that a manual
/// release-per-reply discipline would otherwise require.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Simple status line, e.g. `OK` or `PONG`.
    Status(String),

    /// Error reported by a backend or synthesized by the proxy.
    Error(String),

    /// Signed 64-bit integer.
    Integer(i64),

    /// Binary-safe bulk string.
    Bulk(Bytes),

    /// Array of nested replies.
    Array(Vec<Reply>),

    /// Null reply (missing key, nil bulk).
    Nil,
}

impl Reply {
    /// The conventional `OK` status.
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// Build an error reply.
    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error(msg.into())
    }

    /// Whether this is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Whether this is a null reply.
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Integer value, if this is an integer reply.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Bulk payload, if this is a bulk reply.
    pub fn as_bulk(&self) -> Option<&Bytes> {
        match self {
            Reply::Bulk(b) => Some(b),
            _ => None,
        }
    }

    /// Array elements, if this is an array reply.
    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(elements) => Some(elements),
            _ => None,
        }
    }
}
