//! Client-side sharding proxy for Redis-like key-value stores.
//!
//! This crate lets a caller issue a single logical command against a
//! cluster of N independent, non-replicated backends. It provides:
//! - **Ketama consistent hashing** for stable key → shard placement
//! - **Per-command routing policies** classifying every store command
//! - **Four scatter/gather strategies** with well-defined partial-failure
//!   semantics and reply merging
//! - **Lazy fault detection**: a shard is routed around from the moment a
//!   send to it fails, with no background health checks
//!
//! # Example
//!
//! ```rust,no_run
//! use keyshard::{ShardEndpoint, ShardProxy};
//! # use keyshard::testing::MemoryCluster;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoints: Vec<ShardEndpoint> = vec![
//!         "127.0.0.1:7000".parse()?,
//!         "127.0.0.1:7001".parse()?,
//!         "127.0.0.1:7002".parse()?,
//!     ];
//!     # let cluster = MemoryCluster::new(3);
//!     # let connector = cluster.connector();
//!     // `connector` implements keyshard::Connector for your store client.
//!     let proxy = ShardProxy::connect(&connector, &endpoints).await?;
//!
//!     // Single-key commands go to the owning shard.
//!     proxy.command_str(&["SET", "user:123", "Alice"]).await?;
//!
//!     // Multi-key commands fan out and merge back in request order.
//!     let reply = proxy.command_str(&["MGET", "user:123", "user:456"]).await?;
//!     println!("{reply:?}");
//!
//!     proxy.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              ShardProxy (façade)            │
//! │        command(args) -> Result<Reply>       │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │     CommandTable: name → routing policy     │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │   RoutingExecutor: single-key / grouped /   │
//! │        aggregate-sum / broadcast-all        │
//! └─────────────────────────────────────────────┘
//!            │                       │
//!            ▼                       ▼
//! ┌────────────────────┐   ┌────────────────────┐
//! │  HashRing (ketama) │   │     ShardPool      │
//! │  key → shard index │   │ slots + liveness + │
//! │  + dead-shard skip │   │  lazy fault detect │
//! └────────────────────┘   └────────────────────┘
//!                                    │
//!                          Connector / ShardConnection
//!                            (your store client)
//! ```
//!
//! # Failure model
//!
//! - A backend that is unreachable at construction, or whose connection
//!   fails later, is marked dead and its key range is absorbed by the
//!   next live point on the ring. Dead shards are never retried.
//! - Unsupported and unknown commands are rejected with an error reply
//!   without contacting any shard.
//! - Multi-shard writes are fail-fast on the first error reply; partial
//!   writes already sent are not rolled back. No cross-shard atomicity
//!   is claimed.
//! - Only the loss of every shard turns into a hard error
//!   ([`Error::NoLiveShard`]).

pub mod error;
pub mod partitioning;
pub mod pool;
pub mod proxy;
pub mod routing;
pub mod testing;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use partitioning::{HashRing, RingPoint, POINTS_PER_SHARD};
pub use pool::ShardPool;
pub use proxy::ShardProxy;
pub use routing::{CommandPolicy, CommandTable, GroupMerge, RoutingExecutor, RoutingStrategy};
pub use transport::{Connector, ShardConnection};
pub use types::{Reply, ShardEndpoint};
