//! Partitioning module: mapping keys to the backend shards that own them.
//!
//! Implements ketama-style consistent hashing. Every shard contributes a
//! fixed number of placement points derived from its `host:port` label;
//! all points are merged into one sorted ring, and a key is owned by the
//! shard of the first point at or after the key's own hash position,
//! wrapping around the circle.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        HashRing                           │
//! │  ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐  │
//! │  │p₁:S0 │→│p₂:S2 │→│p₃:S1 │→│p₄:S0 │→│p₅:S1 │→│p₆:S2 │  │
//! │  └──────┘ └──────┘ └──────┘ └──────┘ └──────┘ └──────┘  │
//! │        160 points per shard, sorted by point value       │
//! │                                                           │
//! │  key "foo" → md5 → u32 point → successor point → shard   │
//! │  (dead shards are skipped forward along the circle)      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The ring is immutable after construction. Fault tolerance comes from
//! the lookup side: `locate` takes a liveness predicate and scans forward
//! past points whose shard is dead, so a failed shard's key range is
//! absorbed by its clockwise neighbors without rebuilding anything.

mod digest;
mod hashring;

pub use hashring::{HashRing, RingPoint, POINTS_PER_SHARD};
