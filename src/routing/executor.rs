//! Scatter/gather execution strategies.
//!
//! One code path per strategy tag, so the merge and partial-failure
//! semantics live in a single auditable place. Every invocation is a
//! self-contained request/response cycle; no state is carried between
//! calls beyond the ring and the pool's liveness flags.
//!
//! Fan-out is performed in ascending shard order, which makes the
//! fail-fast rule deterministic: the lowest shard index whose reply is an
//! error wins.

use super::keypos::key_positions;
use super::policy::{CommandPolicy, GroupMerge, RoutingStrategy};
use crate::error::{Error, Result};
use crate::partitioning::HashRing;
use crate::pool::ShardPool;
use crate::types::Reply;
use bytes::Bytes;
use std::collections::BTreeMap;
use tracing::debug;

/// One per-shard request assembled by the grouped strategy, together with
/// the original key ordinals its keys came from.
struct Group {
    args: Vec<Bytes>,
    ordinals: Vec<usize>,
}

/// Executes a classified command against the shard pool via the ring.
pub struct RoutingExecutor<'a> {
    ring: &'a HashRing,
    pool: &'a ShardPool,
}

impl<'a> RoutingExecutor<'a> {
    /// Borrow the ring and pool for one command execution.
    pub fn new(ring: &'a HashRing, pool: &'a ShardPool) -> Self {
        Self { ring, pool }
    }

    /// Execute `args` under `policy` and merge the result into one reply.
    pub async fn execute(&self, policy: &CommandPolicy, args: &[Bytes]) -> Result<Reply> {
        match policy.strategy {
            RoutingStrategy::SingleKey => self.single_key(policy, args).await,
            RoutingStrategy::Grouped(merge) => self.grouped(policy, merge, args).await,
            RoutingStrategy::AggregateSum => self.aggregate_sum(policy, args).await,
            RoutingStrategy::BroadcastAll => self.broadcast_all(args).await,
            RoutingStrategy::Unsupported => Ok(unsupported_reply(policy.name)),
        }
    }

    fn locate(&self, key: &[u8]) -> Result<usize> {
        self.ring.locate(key, |shard| self.pool.is_live(shard))
    }

    /// Route to the key's owning shard and pass the reply through
    /// verbatim, error replies included.
    async fn single_key(&self, policy: &CommandPolicy, args: &[Bytes]) -> Result<Reply> {
        let Some(positions) = key_positions(policy, args.len()) else {
            return Ok(arity_error(policy.name));
        };
        let Some(&key_pos) = positions.first() else {
            return Ok(arity_error(policy.name));
        };
        let key = &args[key_pos];
        loop {
            let shard = self.locate(key)?;
            debug!(shard, command = policy.name, "single-key route");
            match self.pool.send(shard, args).await {
                Some(reply) => return Ok(reply),
                // The send marked `shard` failed, so the next locate
                // skips it and lands on the key's new owner. Terminates:
                // the live set only shrinks, and an empty one fails the
                // locate.
                None => continue,
            }
        }
    }

    /// Partition keys by owning shard, send one grouped request per
    /// involved shard, and merge per `merge`.
    async fn grouped(
        &self,
        policy: &CommandPolicy,
        merge: GroupMerge,
        args: &[Bytes],
    ) -> Result<Reply> {
        let Some(positions) = key_positions(policy, args.len()) else {
            return Ok(arity_error(policy.name));
        };
        if positions.is_empty() {
            return Ok(arity_error(policy.name));
        }

        // BTreeMap keeps fan-out in ascending shard order.
        let mut groups: BTreeMap<usize, Group> = BTreeMap::new();
        for (ordinal, &pos) in positions.iter().enumerate() {
            let shard = self.locate(&args[pos])?;
            let group = groups.entry(shard).or_insert_with(|| Group {
                args: vec![args[0].clone()],
                ordinals: Vec::new(),
            });
            // The key plus its companion arguments (the value, for
            // key/value strides).
            group.args.extend_from_slice(&args[pos..pos + policy.key_step]);
            group.ordinals.push(ordinal);
        }
        debug!(
            command = policy.name,
            keys = positions.len(),
            shards = groups.len(),
            "grouped fan-out"
        );

        match merge {
            GroupMerge::Gather => Ok(self.merge_gather(positions.len(), groups).await),
            GroupMerge::Write => self.merge_write(groups).await,
        }
    }

    /// Gather merge: write each shard's per-key replies back into the
    /// slots their keys came from, so the caller sees original argument
    /// order regardless of which shard served what. Keys on a shard
    /// whose request failed stay null rather than aborting the call.
    async fn merge_gather(&self, key_count: usize, groups: BTreeMap<usize, Group>) -> Reply {
        let mut elements = vec![Reply::Nil; key_count];
        for (shard, group) in groups {
            // Absent shard, or a reply shape we cannot slot per key (an
            // error reply, typically): its ordinals stay nil.
            if let Some(Reply::Array(replies)) = self.pool.send(shard, &group.args).await {
                for (&ordinal, reply) in group.ordinals.iter().zip(replies) {
                    elements[ordinal] = reply;
                }
            }
        }
        Reply::Array(elements)
    }

    /// Write merge: the first reply seeds the result; a later error reply
    /// replaces it and halts further sends. Fail-fast: grouped writes
    /// already sent are not rolled back, no cross-shard atomicity is
    /// claimed.
    async fn merge_write(&self, groups: BTreeMap<usize, Group>) -> Result<Reply> {
        let mut result: Option<Reply> = None;
        for (shard, group) in groups {
            match self.pool.send(shard, &group.args).await {
                // Transport failure: the slot is marked, the accumulated
                // result stands.
                None => continue,
                Some(reply) => {
                    if result.is_none() {
                        result = Some(reply);
                    } else if reply.is_error() {
                        result = Some(reply);
                        break;
                    }
                }
            }
        }
        result.ok_or(Error::NoLiveShard)
    }

    /// Send the identical request to every live shard and sum the integer
    /// replies. A shard lost mid-flight contributes zero; only a total
    /// loss of shards fails the call.
    async fn aggregate_sum(&self, policy: &CommandPolicy, args: &[Bytes]) -> Result<Reply> {
        // Key-bearing commands still validate their key slots up front;
        // a malformed request must not reach any shard.
        if policy.first_key > 0 && key_positions(policy, args.len()).is_none() {
            return Ok(arity_error(policy.name));
        }
        let mut sum: i64 = 0;
        let mut responded = 0usize;
        for shard in 0..self.pool.len() {
            if !self.pool.is_live(shard) {
                continue;
            }
            if let Some(reply) = self.pool.send(shard, args).await {
                responded += 1;
                sum += reply.as_integer().unwrap_or(0);
            }
        }
        if responded == 0 {
            return Err(Error::NoLiveShard);
        }
        Ok(Reply::Integer(sum))
    }

    /// Send the identical request to every live shard in shard order.
    /// The first reply is the representative result; a later error reply
    /// replaces it and halts further sending, same fail-fast rule as the
    /// write merge. Absent shards are skipped.
    async fn broadcast_all(&self, args: &[Bytes]) -> Result<Reply> {
        let mut result: Option<Reply> = None;
        for shard in 0..self.pool.len() {
            if !self.pool.is_live(shard) {
                continue;
            }
            match self.pool.send(shard, args).await {
                None => continue,
                Some(reply) => {
                    if result.is_none() {
                        result = Some(reply);
                    } else if reply.is_error() {
                        result = Some(reply);
                        break;
                    }
                }
            }
        }
        result.ok_or(Error::NoLiveShard)
    }
}

/// Error reply for a command the proxy refuses to route.
pub(crate) fn unsupported_reply(name: &str) -> Reply {
    Reply::Error(format!("ERR not support '{name}' command in proxy"))
}

fn arity_error(name: &str) -> Reply {
    Reply::Error(format!("ERR wrong number of arguments for '{name}' command"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::policy::CommandTable;
    use crate::testing::MemoryCluster;

    async fn fixture(shards: usize) -> (MemoryCluster, HashRing, ShardPool) {
        let cluster = MemoryCluster::new(shards);
        let ring = HashRing::build(cluster.endpoints());
        let pool = ShardPool::connect(&cluster.connector(), cluster.endpoints())
            .await
            .unwrap();
        (cluster, ring, pool)
    }

    fn args(parts: &[&str]) -> Vec<Bytes> {
        parts
            .iter()
            .map(|p| Bytes::copy_from_slice(p.as_bytes()))
            .collect()
    }

    #[tokio::test]
    async fn test_unsupported_names_the_command() {
        let (_cluster, ring, pool) = fixture(2).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        let policy = table.lookup(b"rename").unwrap();
        let reply = executor.execute(policy, &args(&["RENAME", "a", "b"])).await.unwrap();
        match reply {
            Reply::Error(msg) => assert!(msg.contains("rename"), "{msg}"),
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_contacts_no_shard() {
        let (cluster, ring, pool) = fixture(2).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        let policy = table.lookup(b"multi").unwrap();
        executor.execute(policy, &args(&["MULTI"])).await.unwrap();
        assert_eq!(cluster.request_count(0), 0);
        assert_eq!(cluster.request_count(1), 0);
    }

    #[tokio::test]
    async fn test_single_key_arity_rejected_before_routing() {
        let (cluster, ring, pool) = fixture(2).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        let policy = table.lookup(b"get").unwrap();
        let reply = executor.execute(policy, &args(&["GET"])).await.unwrap();
        assert!(reply.is_error());
        assert_eq!(cluster.request_count(0) + cluster.request_count(1), 0);
    }

    #[tokio::test]
    async fn test_grouped_write_arity_rejected() {
        let (_cluster, ring, pool) = fixture(2).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        let policy = table.lookup(b"mset").unwrap();
        // Dangling key without a value.
        let reply = executor
            .execute(policy, &args(&["MSET", "a", "1", "b"]))
            .await
            .unwrap();
        match reply {
            Reply::Error(msg) => assert!(msg.contains("wrong number"), "{msg}"),
            other => panic!("expected arity error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aggregate_sum_arity_rejected_before_fanout() {
        let (cluster, ring, pool) = fixture(2).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        let policy = table.lookup(b"del").unwrap();
        // DEL with no keys must fail arity validation, not sum to zero.
        let reply = executor.execute(policy, &args(&["DEL"])).await.unwrap();
        match reply {
            Reply::Error(msg) => assert!(msg.contains("wrong number"), "{msg}"),
            other => panic!("expected arity error, got {other:?}"),
        }
        assert_eq!(cluster.request_count(0) + cluster.request_count(1), 0);
    }

    #[tokio::test]
    async fn test_aggregate_sum_adds_across_shards() {
        let (cluster, ring, pool) = fixture(3).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        // Seed each backend directly; dbsize must report the total.
        cluster.store(0).seed(b"a", b"1");
        cluster.store(1).seed(b"b", b"1");
        cluster.store(1).seed(b"c", b"1");
        let policy = table.lookup(b"dbsize").unwrap();
        let reply = executor.execute(policy, &args(&["DBSIZE"])).await.unwrap();
        assert_eq!(reply, Reply::Integer(3));
    }

    #[tokio::test]
    async fn test_aggregate_sum_skips_absent_shard() {
        let (cluster, ring, pool) = fixture(3).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        cluster.store(0).seed(b"a", b"1");
        cluster.store(2).seed(b"b", b"1");
        cluster.kill(1);
        let policy = table.lookup(b"dbsize").unwrap();
        let reply = executor.execute(policy, &args(&["DBSIZE"])).await.unwrap();
        // The dead shard contributes zero instead of aborting the sum.
        assert_eq!(reply, Reply::Integer(2));
        assert!(!pool.is_live(1));
    }

    #[tokio::test]
    async fn test_aggregate_sum_all_dead_fails() {
        let (cluster, ring, pool) = fixture(2).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        cluster.kill(0);
        cluster.kill(1);
        let policy = table.lookup(b"dbsize").unwrap();
        let result = executor.execute(policy, &args(&["DBSIZE"])).await;
        assert!(matches!(result, Err(Error::NoLiveShard)));
    }

    #[tokio::test]
    async fn test_broadcast_returns_first_reply() {
        let (_cluster, ring, pool) = fixture(3).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        let policy = table.lookup(b"ping").unwrap();
        let reply = executor.execute(policy, &args(&["PING"])).await.unwrap();
        assert_eq!(reply, Reply::Status("PONG".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_error_halts_in_shard_order() {
        let (cluster, ring, pool) = fixture(3).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        cluster.store(1).fail_next_with_error("ERR broken shard");
        let policy = table.lookup(b"flushall").unwrap();
        let reply = executor.execute(policy, &args(&["FLUSHALL"])).await.unwrap();
        assert_eq!(reply, Reply::Error("ERR broken shard".to_string()));
        // Shard 2 comes after the failing shard and must not be reached.
        assert_eq!(cluster.request_count(2), 0);
    }

    #[tokio::test]
    async fn test_broadcast_skips_dead_shard() {
        let (cluster, ring, pool) = fixture(3).await;
        let executor = RoutingExecutor::new(&ring, &pool);
        let table = CommandTable::new();
        cluster.kill(0);
        let policy = table.lookup(b"ping").unwrap();
        let reply = executor.execute(policy, &args(&["PING"])).await.unwrap();
        assert_eq!(reply, Reply::Status("PONG".to_string()));
        assert_eq!(pool.live_count(), 2);
    }
}
