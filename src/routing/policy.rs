//! Static routing-policy table for store commands.
//!
//! One entry per supported command, tagged with the strategy the routing
//! executor dispatches on. Commands that cannot be meaningfully
//! partitioned across independent shards (transactions, pub/sub,
//! cross-shard set algebra, key renaming, the expiry family, keyspace
//! scans, admin) are present but marked unsupported, and a command
//! missing from the table entirely is rejected the same way rather than
//! guessed at.

use std::collections::HashMap;

/// How grouped multi-key replies are merged back into one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMerge {
    /// Re-assemble per-key replies into one array in original key order
    /// (multi-get style).
    Gather,

    /// Fold per-shard status replies into one, fail-fast on the first
    /// error reply (multi-set style).
    Write,
}

/// Routing strategy for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// One key, one shard, reply passed through verbatim.
    SingleKey,

    /// Keys partitioned by owning shard, one grouped request per shard.
    Grouped(GroupMerge),

    /// Identical request to every live shard, integer replies summed.
    AggregateSum,

    /// Identical request to every live shard, first reply representative,
    /// fail-fast on error.
    BroadcastAll,

    /// Rejected without contacting any shard.
    Unsupported,
}

/// Routing metadata for one command.
///
/// `first_key`/`last_key`/`key_step` describe where keys sit in the
/// argument list, Redis command-table style: `last_key` may be negative,
/// counting back from the end (-1 = last argument) for variadic commands.
/// Both are 0 for commands that touch no key.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    /// Lower-case command name.
    pub name: &'static str,

    /// Strategy the executor dispatches on.
    pub strategy: RoutingStrategy,

    /// Argument index of the first key.
    pub first_key: usize,

    /// Argument index of the last key; negative counts from the end.
    pub last_key: i32,

    /// Stride between consecutive keys (1 for key lists, 2 for
    /// key/value pairs).
    pub key_step: usize,
}

const fn one_key(name: &'static str) -> CommandPolicy {
    key_policy(name, RoutingStrategy::SingleKey, 1, 1, 1)
}

const fn grouped(name: &'static str, merge: GroupMerge, key_step: usize) -> CommandPolicy {
    key_policy(name, RoutingStrategy::Grouped(merge), 1, -1, key_step)
}

const fn keyless(name: &'static str, strategy: RoutingStrategy) -> CommandPolicy {
    CommandPolicy {
        name,
        strategy,
        first_key: 0,
        last_key: 0,
        key_step: 0,
    }
}

const fn key_policy(
    name: &'static str,
    strategy: RoutingStrategy,
    first_key: usize,
    last_key: i32,
    key_step: usize,
) -> CommandPolicy {
    CommandPolicy {
        name,
        strategy,
        first_key,
        last_key,
        key_step,
    }
}

const fn deny(name: &'static str) -> CommandPolicy {
    keyless(name, RoutingStrategy::Unsupported)
}

/// The full policy set. Key metadata on unsupported commands is kept for
/// documentation value only; the executor never reads it.
static POLICIES: &[CommandPolicy] = &[
    // Strings.
    one_key("get"),
    one_key("set"),
    one_key("setnx"),
    one_key("setex"),
    one_key("psetex"),
    one_key("append"),
    one_key("strlen"),
    one_key("exists"),
    one_key("getbit"),
    one_key("setbit"),
    one_key("setrange"),
    one_key("getrange"),
    one_key("substr"),
    one_key("incr"),
    one_key("decr"),
    one_key("incrby"),
    one_key("decrby"),
    one_key("incrbyfloat"),
    one_key("getset"),
    grouped("mget", GroupMerge::Gather, 1),
    grouped("mset", GroupMerge::Write, 2),
    key_policy("msetnx", RoutingStrategy::Unsupported, 1, -1, 2),
    key_policy("del", RoutingStrategy::AggregateSum, 1, -1, 1),
    // Lists.
    one_key("rpush"),
    one_key("lpush"),
    one_key("rpushx"),
    one_key("lpushx"),
    one_key("linsert"),
    one_key("rpop"),
    one_key("lpop"),
    one_key("brpop"),
    key_policy("brpoplpush", RoutingStrategy::Unsupported, 1, 2, 1),
    key_policy("blpop", RoutingStrategy::Unsupported, 1, -2, 1),
    one_key("llen"),
    one_key("lindex"),
    one_key("lset"),
    one_key("lrange"),
    one_key("ltrim"),
    one_key("lrem"),
    key_policy("rpoplpush", RoutingStrategy::Unsupported, 1, 2, 1),
    // Sets.
    one_key("sadd"),
    one_key("srem"),
    key_policy("smove", RoutingStrategy::SingleKey, 1, 2, 1),
    one_key("sismember"),
    one_key("scard"),
    one_key("spop"),
    one_key("srandmember"),
    one_key("smembers"),
    key_policy("sinter", RoutingStrategy::Unsupported, 1, -1, 1),
    key_policy("sinterstore", RoutingStrategy::Unsupported, 1, -1, 1),
    key_policy("sunion", RoutingStrategy::Unsupported, 1, -1, 1),
    key_policy("sunionstore", RoutingStrategy::Unsupported, 1, -1, 1),
    key_policy("sdiff", RoutingStrategy::Unsupported, 1, -1, 1),
    key_policy("sdiffstore", RoutingStrategy::Unsupported, 1, -1, 1),
    // Sorted sets.
    one_key("zadd"),
    one_key("zincrby"),
    one_key("zrem"),
    one_key("zremrangebyscore"),
    one_key("zremrangebyrank"),
    deny("zunionstore"),
    deny("zinterstore"),
    one_key("zrange"),
    one_key("zrangebyscore"),
    one_key("zrevrangebyscore"),
    one_key("zcount"),
    one_key("zrevrange"),
    one_key("zcard"),
    one_key("zscore"),
    one_key("zrank"),
    one_key("zrevrank"),
    // Hashes.
    one_key("hset"),
    one_key("hsetnx"),
    one_key("hget"),
    one_key("hmset"),
    one_key("hmget"),
    one_key("hincrby"),
    one_key("hincrbyfloat"),
    one_key("hdel"),
    one_key("hlen"),
    one_key("hkeys"),
    one_key("hvals"),
    one_key("hgetall"),
    one_key("hexists"),
    // Keyspace.
    deny("randomkey"),
    deny("select"),
    key_policy("move", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("rename", RoutingStrategy::Unsupported, 1, 2, 1),
    key_policy("renamenx", RoutingStrategy::Unsupported, 1, 2, 1),
    key_policy("expire", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("expireat", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("pexpire", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("pexpireat", RoutingStrategy::Unsupported, 1, 1, 1),
    deny("keys"),
    keyless("dbsize", RoutingStrategy::AggregateSum),
    one_key("ttl"),
    key_policy("pttl", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("persist", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("type", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("sort", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("dump", RoutingStrategy::Unsupported, 1, 1, 1),
    key_policy("object", RoutingStrategy::Unsupported, 2, 2, 2),
    // Connection and server administration.
    deny("auth"),
    keyless("ping", RoutingStrategy::BroadcastAll),
    deny("echo"),
    deny("save"),
    deny("bgsave"),
    deny("bgrewriteaof"),
    deny("shutdown"),
    deny("lastsave"),
    keyless("flushdb", RoutingStrategy::BroadcastAll),
    keyless("flushall", RoutingStrategy::BroadcastAll),
    deny("info"),
    deny("monitor"),
    deny("slaveof"),
    deny("debug"),
    deny("config"),
    deny("client"),
    deny("slowlog"),
    deny("time"),
    // Transactions.
    deny("multi"),
    deny("exec"),
    deny("discard"),
    key_policy("watch", RoutingStrategy::Unsupported, 1, -1, 1),
    deny("unwatch"),
    // Replication internals.
    deny("sync"),
    deny("replconf"),
    // Pub/sub.
    deny("subscribe"),
    deny("unsubscribe"),
    deny("psubscribe"),
    deny("punsubscribe"),
    deny("publish"),
    // Bit operations across keys.
    key_policy("bitop", RoutingStrategy::Unsupported, 2, -1, 1),
    key_policy("bitcount", RoutingStrategy::Unsupported, 1, 1, 1),
];

/// Case-insensitive command name → routing policy.
///
/// Built eagerly (no hidden first-use initialization) and treated as a
/// read-only value for the proxy's lifetime.
#[derive(Debug)]
pub struct CommandTable {
    commands: HashMap<&'static str, &'static CommandPolicy>,
}

impl CommandTable {
    /// Build the table from the static policy set.
    pub fn new() -> Self {
        let mut commands = HashMap::with_capacity(POLICIES.len());
        for policy in POLICIES {
            commands.insert(policy.name, policy);
        }
        Self { commands }
    }

    /// Look up the policy for a command name, case-insensitively.
    ///
    /// `None` means the command is unknown; callers must treat that
    /// identically to an unsupported command.
    pub fn lookup(&self, name: &[u8]) -> Option<&CommandPolicy> {
        let lowered = String::from_utf8_lossy(name).to_ascii_lowercase();
        self.commands.get(lowered.as_str()).copied()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the table is empty (it never is).
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}
