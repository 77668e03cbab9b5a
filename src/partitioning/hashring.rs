//! Ketama-style consistent hash ring over backend shards.

use super::digest::{digest_points, key_point, POINTS_PER_RUN, RUNS_PER_SHARD};
use crate::error::{Error, Result};
use crate::types::ShardEndpoint;

/// Placement points each shard contributes to the ring.
pub const POINTS_PER_SHARD: usize = RUNS_PER_SHARD * POINTS_PER_RUN;

/// One weighted placement point on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingPoint {
    /// Position on the hash circle.
    pub point: u32,

    /// Index of the owning shard in the endpoint list.
    pub shard: usize,
}

/// Immutable, ascending-sorted ring of placement points.
///
/// Built once at proxy construction and shared read-only by every lookup;
/// no synchronization is needed. Shard failures never mutate the ring;
/// [`HashRing::locate`] routes around them via its liveness predicate.
#[derive(Debug, Clone)]
pub struct HashRing {
    points: Vec<RingPoint>,
}

impl HashRing {
    /// Build the ring for an ordered endpoint list.
    ///
    /// Each endpoint contributes [`POINTS_PER_SHARD`] points derived from
    /// `"{host}:{port}-{k}"` for k in 0..40, four points per digest. Ties
    /// between equal point values keep insertion order (stable sort), so
    /// collisions are benign rather than an error.
    pub fn build(endpoints: &[ShardEndpoint]) -> Self {
        let mut points = Vec::with_capacity(endpoints.len() * POINTS_PER_SHARD);
        for (shard, endpoint) in endpoints.iter().enumerate() {
            for k in 0..RUNS_PER_SHARD {
                let label = format!("{}:{}-{}", endpoint.host, endpoint.port, k);
                for point in digest_points(label.as_bytes()) {
                    points.push(RingPoint { point, shard });
                }
            }
        }
        points.sort_by_key(|p| p.point);
        Self { points }
    }

    /// Total number of points on the ring.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the ring has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points in ascending order.
    pub fn points(&self) -> &[RingPoint] {
        &self.points
    }

    /// Find the shard owning `key`, skipping shards `is_live` reports dead.
    ///
    /// Binary-searches for the smallest point at or after the key's hash
    /// position, wrapping to the ring's first point past the maximum
    /// (successor on the circle, O(log R)). If the located point belongs
    /// to a dead shard, the scan continues forward circularly until a
    /// live shard is found; when every shard is dead this fails with
    /// [`Error::NoLiveShard`].
    pub fn locate<F>(&self, key: &[u8], is_live: F) -> Result<usize>
    where
        F: Fn(usize) -> bool,
    {
        if self.points.is_empty() {
            return Err(Error::NoLiveShard);
        }
        let h = key_point(key);
        let start = self.points.partition_point(|p| p.point < h) % self.points.len();
        for offset in 0..self.points.len() {
            let rp = self.points[(start + offset) % self.points.len()];
            if is_live(rp.shard) {
                return Ok(rp.shard);
            }
        }
        Err(Error::NoLiveShard)
    }
}
