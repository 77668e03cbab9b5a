//! Proxy façade: the single entry point for logical commands.

use crate::error::{Error, Result};
use crate::partitioning::HashRing;
use crate::pool::ShardPool;
use crate::routing::{unsupported_reply, CommandTable, RoutingExecutor};
use crate::transport::Connector;
use crate::types::{Reply, ShardEndpoint};
use bytes::Bytes;
use tracing::info;

/// Client-side sharding proxy over a set of independent backend shards.
///
/// A caller issues one logical command at a time; the proxy looks up the
/// command's routing policy, executes the matching scatter/gather
/// strategy, and returns one reply as a single-server client would see
/// it. Instances are not meant to serve overlapping commands from
/// multiple callers; run one proxy per worker or serialize externally.
pub struct ShardProxy {
    ring: HashRing,
    pool: ShardPool,
    commands: CommandTable,
}

impl ShardProxy {
    /// Connect to every endpoint and build the ring and command table.
    ///
    /// The ring covers *all* endpoints, reachable or not, so key
    /// ownership is stable regardless of which shards came up; an
    /// unreachable shard is simply routed around from the start. Fails
    /// with [`Error::NoBackends`] when zero endpoints connect.
    pub async fn connect(connector: &dyn Connector, endpoints: &[ShardEndpoint]) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::NoBackends);
        }
        let pool = ShardPool::connect(connector, endpoints).await?;
        let ring = HashRing::build(endpoints);
        let commands = CommandTable::new();
        info!(
            shards = endpoints.len(),
            live = pool.live_count(),
            ring_points = ring.len(),
            commands = commands.len(),
            "proxy constructed"
        );
        Ok(Self {
            ring,
            pool,
            commands,
        })
    }

    /// Execute one logical command.
    ///
    /// `args` is the fully tokenized, binary-safe argument list starting
    /// with the command name. Returns exactly one reply; command-level
    /// failures (unsupported or unknown commands, wrong arity, backend
    /// errors) come back as [`Reply::Error`] values, and only the loss of
    /// every shard surfaces as [`Error::NoLiveShard`].
    pub async fn command(&self, args: &[Bytes]) -> Result<Reply> {
        let Some(name) = args.first() else {
            return Ok(Reply::error("ERR empty command"));
        };
        match self.commands.lookup(name) {
            Some(policy) => {
                RoutingExecutor::new(&self.ring, &self.pool)
                    .execute(policy, args)
                    .await
            }
            // Unknown commands are rejected exactly like unsupported
            // ones; the proxy never guesses at routing.
            None => {
                let lowered = String::from_utf8_lossy(name).to_ascii_lowercase();
                Ok(unsupported_reply(&lowered))
            }
        }
    }

    /// Convenience wrapper over [`ShardProxy::command`] for string
    /// tokens.
    pub async fn command_str(&self, parts: &[&str]) -> Result<Reply> {
        let args: Vec<Bytes> = parts
            .iter()
            .map(|p| Bytes::copy_from_slice(p.as_bytes()))
            .collect();
        self.command(&args).await
    }

    /// Shard index currently owning `key`, after fault skip.
    pub fn shard_for_key(&self, key: &[u8]) -> Result<usize> {
        self.ring.locate(key, |shard| self.pool.is_live(shard))
    }

    /// Number of configured shards.
    pub fn shard_count(&self) -> usize {
        self.pool.len()
    }

    /// Number of currently live shards.
    pub fn live_shards(&self) -> usize {
        self.pool.live_count()
    }

    /// Tear down the proxy, releasing every backend connection.
    ///
    /// Consumes the instance, so no operation can follow.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
        info!("proxy shut down");
    }
}
