//! Transport seam between the proxy and a concrete store client.
//!
//! The proxy does not speak the wire protocol itself. A caller supplies a
//! [`Connector`] that knows how to open connections and exchange fully
//! tokenized commands with one backend; the proxy layers routing, fan-out
//! and reply merging on top. The [`MemoryBackend`](crate::testing) in the
//! testing module implements these traits over an in-process hash map.

use crate::error::Result;
use crate::types::{Reply, ShardEndpoint};
use async_trait::async_trait;
use bytes::Bytes;

/// A live connection to one backend shard.
///
/// Each connection is owned exclusively by the pool slot at its shard
/// index, so `send` can take `&mut self` without further synchronization.
#[async_trait]
pub trait ShardConnection: Send {
    /// Send a fully tokenized command and return the parsed reply.
    ///
    /// `None` signals a transport failure: closed socket, unreadable
    /// reply, protocol desync. The pool treats `None` as the shard going
    /// away and marks its slot failed; implementations should not retry
    /// internally.
    async fn send(&mut self, args: &[Bytes]) -> Option<Reply>;
}

/// Opens connections to backend shards.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open one connection to `endpoint`.
    async fn connect(&self, endpoint: &ShardEndpoint) -> Result<Box<dyn ShardConnection>>;
}
